
pub const WORD_SIZE: u32 = 2; // Bytes

// 18-bit Unibus address space.
pub const IO_PAGE_START: u32 = 0o760000;
pub const MEM_END: u32 = IO_PAGE_START; // Exclusive
pub const BUS_END: u32 = 0o1000000; // Exclusive
pub const BUS_ADDR_MASK: u32 = BUS_END - 1;

// Trap vectors used by the modeled devices.
pub const VEC_TTY_IN: u16 = 0o60;
pub const VEC_TTY_OUT: u16 = 0o64;
pub const VEC_RK: u16 = 0o220;

pub const PRIO_TTY: u8 = 0o4;
pub const PRIO_RK: u8 = 0o5;
