use std::sync::Arc;

use crate::script::{rig, rkda, Op, ScriptCpu, FN_READ, FN_WRITE};
use common::constants::VEC_RK;
use emu_lib::io::console::{Console, PipeTty};
use emu_lib::io::rk05::Rk05;
use emu_lib::{
    BusConfig, ConsoleConfig, EmuError, InterruptQueue, Machine, MachineConfig,
    Rk05Config, RkError, RkErrorPolicy, Unibus,
};

fn strict() -> MachineConfig {
    MachineConfig {
        rk05: Rk05Config{error_policy: RkErrorPolicy::Strict, ..Default::default()},
        ..Default::default()
    }
}

fn start(bus: &mut Unibus, func: u16, words: u16, bus_addr: u16, disk_addr: u16) {
    bus.write16(Rk05::RKWC, words.wrapping_neg()).unwrap();
    bus.write16(Rk05::RKBA, bus_addr).unwrap();
    bus.write16(Rk05::RKDA, disk_addr).unwrap();
    bus.write16(Rk05::RKCS, func | Rk05::CS_GO).unwrap();
}

#[test]
fn write_one_word() {
    let r = rig(MachineConfig::default());
    let x = 0o4000;
    let ops = [
        Op::Write(x, 0o107001),
        Op::Write(Rk05::RKWC, 0o177777),
        Op::Write(Rk05::RKBA, x as u16),
        Op::Write(Rk05::RKDA, rkda(0, 0, 0)),
        Op::Write(Rk05::RKCS, FN_WRITE | Rk05::CS_IDE | Rk05::CS_GO),
        Op::SpinUntilSet(Rk05::RKCS, Rk05::CS_RDY),
        Op::Read(Rk05::RKWC),
        Op::Read(Rk05::RKDS),
        Op::Halt,
    ];
    let mut machine = Machine::new(r.bus, ScriptCpu::new(&ops));
    machine.run().unwrap();

    assert_eq!(r.image.read_bytes(0, 2), 0o107001u16.to_le_bytes().to_vec());
    // Nothing else on the pack was touched.
    assert!(r.image.read_bytes(2, 510).iter().all(|b| *b == 0));

    let cpu = machine.cpu();
    assert_eq!(cpu.taken, vec![VEC_RK]);
    assert_eq!(cpu.reads[0], 0);
    assert_ne!(cpu.reads[1] & Rk05::DS_RDY, 0);
    assert!(!machine.bus().rk05().running());
}

#[test]
fn chunked_transfer() {
    let mut r = rig(MachineConfig::default());
    let mut irq = InterruptQueue::new();
    start(&mut r.bus, FN_READ | Rk05::CS_IDE, 600, 0, rkda(0, 0, 0));

    // ceil(600 / 256) steps.
    for _ in 0..2 {
        r.bus.service(&mut irq).unwrap();
        assert!(r.bus.rk05().running());
        assert!(irq.is_empty());
    }
    r.bus.service(&mut irq).unwrap();
    assert!(!r.bus.rk05().running());
    assert_eq!(r.bus.read16(Rk05::RKWC).unwrap(), 0);
    assert_eq!(r.bus.read16(Rk05::RKBA).unwrap(), 1200);
    assert_eq!(irq.len(), 1);

    // Further cycles are idle.
    r.bus.service(&mut irq).unwrap();
    assert_eq!(irq.len(), 1);
}

#[test]
fn smaller_chunks_take_more_cycles() {
    let config = MachineConfig {
        rk05: Rk05Config{chunk_words: 16, ..Default::default()},
        ..Default::default()
    };
    let mut r = rig(config);
    let mut irq = InterruptQueue::new();
    start(&mut r.bus, FN_READ, 64, 0, rkda(0, 0, 0));
    for _ in 0..3 {
        r.bus.service(&mut irq).unwrap();
    }
    assert!(r.bus.rk05().running());
    assert_eq!(r.bus.read16(Rk05::RKWC).unwrap(), (16u16).wrapping_neg());
    r.bus.service(&mut irq).unwrap();
    assert!(!r.bus.rk05().running());
}

#[test]
fn read_across_sectors() {
    let mut r = rig(MachineConfig::default());
    let mut irq = InterruptQueue::new();
    let base = 2 * Rk05::BYTES_PER_SECTOR as usize;
    let pattern: Vec<u8> = (0..1024u32).map(|i| (i * 7) as u8).collect();
    r.image.write_bytes(base, &pattern);

    start(&mut r.bus, FN_READ, 512, 0o10000, rkda(0, 0, 2));
    r.bus.service(&mut irq).unwrap();
    r.bus.service(&mut irq).unwrap();
    assert!(!r.bus.rk05().running());

    for i in 0..512u32 {
        let expected = u16::from_le_bytes([pattern[2 * i as usize], pattern[2 * i as usize + 1]]);
        assert_eq!(r.bus.read16(0o10000 + 2 * i).unwrap(), expected, "word {i}");
    }
    assert_eq!(r.bus.read16(Rk05::RKDA).unwrap(), rkda(0, 0, 4));
    assert_eq!(r.bus.read16(Rk05::RKBA).unwrap(), 0o10000 + 1024);
}

#[test]
fn write_then_read_partial_sector() {
    let mut r = rig(MachineConfig::default());
    let mut irq = InterruptQueue::new();
    for i in 0..300u32 {
        r.bus.write16(0o2000 + 2 * i, (i * 0o101) as u16).unwrap();
    }
    start(&mut r.bus, FN_WRITE, 300, 0o2000, rkda(1, 1, 5));
    while r.bus.rk05().running() {
        r.bus.service(&mut irq).unwrap();
    }
    // A partial last sector still moves the disk address past it.
    assert_eq!(r.bus.read16(Rk05::RKDA).unwrap(), rkda(1, 1, 7));

    start(&mut r.bus, FN_READ, 300, 0o20000, rkda(1, 1, 5));
    while r.bus.rk05().running() {
        r.bus.service(&mut irq).unwrap();
    }
    for i in 0..300u32 {
        assert_eq!(r.bus.read16(0o20000 + 2 * i).unwrap(), (i * 0o101) as u16);
    }
}

#[test]
fn extended_bus_address() {
    let mut r = rig(MachineConfig::default());
    let mut irq = InterruptQueue::new();
    r.image.write_bytes(0, &[0o21, 0o43]);

    // MEX = 01 puts the transfer at 0o200000 and up.
    start(&mut r.bus, FN_READ | 0o20, 1, 0o100, rkda(0, 0, 0));
    r.bus.service(&mut irq).unwrap();
    assert_eq!(r.bus.read16(0o200100).unwrap(), 0o21 | (0o43 << 8));
    assert_eq!(r.bus.read16(0o100).unwrap(), 0);
    assert_eq!(r.bus.read16(Rk05::RKBA).unwrap(), 0o102);
    assert_eq!(r.bus.read16(Rk05::RKCS).unwrap() & 0o60, 0o20);
}

#[test]
fn sector_rolls_to_next_surface() {
    let mut r = rig(MachineConfig::default());
    let mut irq = InterruptQueue::new();
    start(&mut r.bus, FN_READ, 256, 0, rkda(0, 0, 0o13));
    r.bus.service(&mut irq).unwrap();
    assert_eq!(r.bus.read16(Rk05::RKDA).unwrap(), rkda(0, 1, 0));
}

#[test]
fn surface_rolls_to_next_cylinder() {
    let mut r = rig(MachineConfig::default());
    let mut irq = InterruptQueue::new();
    start(&mut r.bus, FN_READ, 256, 0, rkda(5, 1, 0o13));
    r.bus.service(&mut irq).unwrap();
    assert_eq!(r.bus.read16(Rk05::RKDA).unwrap(), rkda(6, 0, 0));
}

#[test]
fn overrun_advisory() {
    let mut r = rig(MachineConfig::default());
    let mut irq = InterruptQueue::new();
    start(&mut r.bus, FN_READ | Rk05::CS_IDE, 512, 0, rkda(0o312, 1, 0o13));

    r.bus.service(&mut irq).unwrap();
    assert_eq!(r.bus.rk05().advisory_errors(), RkError::Overrun.mask());
    // Bug-compatible: the transfer carries on past the last cylinder and
    // RKER stays clear.
    assert!(r.bus.rk05().running());
    assert_eq!(r.bus.read16(Rk05::RKER).unwrap(), 0);
    assert_eq!(r.bus.read16(Rk05::RKDA).unwrap(), rkda(0o313, 0, 0));

    r.bus.service(&mut irq).unwrap();
    assert!(!r.bus.rk05().running());
    assert_eq!(
        r.bus.rk05().advisory_errors(),
        RkError::Overrun.mask() | RkError::NoSuchCylinder.mask()
    );
    assert_eq!(r.bus.read16(Rk05::RKCS).unwrap() & Rk05::CS_ERR, 0);
    assert_eq!(irq.take_above(0).map(|i| i.vector), Some(VEC_RK));
}

#[test]
fn overrun_strict() {
    let mut r = rig(strict());
    let mut irq = InterruptQueue::new();
    start(&mut r.bus, FN_READ | Rk05::CS_IDE, 512, 0, rkda(0o312, 1, 0o13));

    r.bus.service(&mut irq).unwrap();
    assert!(!r.bus.rk05().running());
    assert_eq!(r.bus.read16(Rk05::RKER).unwrap(), RkError::Overrun.mask());
    let rkcs = r.bus.read16(Rk05::RKCS).unwrap();
    assert_ne!(rkcs & Rk05::CS_ERR, 0);
    assert_ne!(rkcs & Rk05::CS_HE, 0);
    assert_ne!(rkcs & Rk05::CS_RDY, 0);
    assert_eq!(r.bus.read16(Rk05::RKWC).unwrap(), (256u16).wrapping_neg());
    assert_eq!(irq.take_above(0).map(|i| i.vector), Some(VEC_RK));
}

#[test]
fn no_such_cylinder_strict() {
    let mut r = rig(strict());
    let mut irq = InterruptQueue::new();
    start(&mut r.bus, FN_WRITE, 1, 0, rkda(0o313, 0, 0));
    r.bus.service(&mut irq).unwrap();
    assert!(!r.bus.rk05().running());
    assert_eq!(r.bus.read16(Rk05::RKER).unwrap(), RkError::NoSuchCylinder.mask());
    assert_eq!(r.bus.read16(Rk05::RKWC).unwrap(), 0o177777);
    // No interrupt enable, so no interrupt.
    assert!(irq.is_empty());
}

#[test]
fn reset_mid_transfer() {
    let mut r = rig(MachineConfig::default());
    let mut irq = InterruptQueue::new();
    start(&mut r.bus, FN_READ | Rk05::CS_IDE, 1000, 0o100, rkda(0, 0, 0));
    r.bus.service(&mut irq).unwrap();
    assert!(r.bus.rk05().running());

    r.bus.write16(Rk05::RKCS, Rk05::CS_GO).unwrap();
    assert!(!r.bus.rk05().running());
    assert_eq!(r.bus.read16(Rk05::RKDS).unwrap(), Rk05::DS_RK05 | Rk05::DS_DRY | Rk05::DS_RDY);
    assert_eq!(r.bus.read16(Rk05::RKER).unwrap(), 0);
    assert_eq!(r.bus.read16(Rk05::RKCS).unwrap(), Rk05::CS_RDY);
    assert_eq!(r.bus.read16(Rk05::RKWC).unwrap(), 0);
    assert_eq!(r.bus.read16(Rk05::RKBA).unwrap(), 0);

    r.bus.service(&mut irq).unwrap();
    assert!(irq.is_empty());
}

#[test]
fn unimplemented_function_halts() {
    let r = rig(MachineConfig::default());
    let ops = [Op::Write(Rk05::RKCS, (4 << 1) | Rk05::CS_GO), Op::Halt];
    let mut machine = Machine::new(r.bus, ScriptCpu::new(&ops));
    assert!(matches!(machine.run(), Err(EmuError::UnimplementedRkFunction(4))));
}

#[test]
fn file_backed_image() {
    let path = std::env::temp_dir().join(format!("rk05-test-{}.img", std::process::id()));
    std::fs::write(&path, vec![0u8; 2 * Rk05::BYTES_PER_SECTOR as usize]).unwrap();

    let tty = Arc::new(PipeTty::default());
    let console = Console::new(tty, ConsoleConfig::default());
    let rk05 = Rk05::open(&path, Rk05Config::default()).unwrap();
    let mut bus = Unibus::new(BusConfig::default(), console, rk05);
    let mut irq = InterruptQueue::new();

    bus.write16(0o500, 0o52525).unwrap();
    start(&mut bus, FN_WRITE, 1, 0o500, rkda(0, 0, 1));
    bus.service(&mut irq).unwrap();

    let contents = std::fs::read(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    let at = Rk05::BYTES_PER_SECTOR as usize;
    assert_eq!(&contents[at..at + 2], &0o52525u16.to_le_bytes());
}

#[test]
fn missing_image_is_fatal() {
    let path = std::env::temp_dir().join("rk05-test-does-not-exist.img");
    assert!(matches!(Rk05::open(&path, Rk05Config::default()), Err(EmuError::Open{..})));
}
