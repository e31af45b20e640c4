
pub trait IsEven: Copy {
    #[allow(clippy::wrong_self_convention)]
    fn is_even(self) -> bool;
}

impl IsEven for u16 {
    fn is_even(self) -> bool {
        self & 0x1 != 1
    }
}

impl IsEven for u32 {
    fn is_even(self) -> bool {
        self & 0x1 != 1
    }
}

////////////////////////////////////////////////////////////////////////////////

// Set or clear the bits of `mask` in a device register.
pub trait SetBits: Copy {
    fn set_bits(&mut self, mask: Self, on: bool);
}

impl SetBits for u16 {
    fn set_bits(&mut self, mask: u16, on: bool) {
        if on {
            *self |= mask;
        } else {
            *self &= !mask;
        }
    }
}
