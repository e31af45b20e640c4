pub mod console;
pub mod disk_image;
pub mod rk05;

use crate::{InterruptSink, Memory, Result};

/// A Unibus peripheral: a register bank in the I/O page plus whatever work it
/// does once per main cycle.
pub trait Device {
    /// Bus addresses of the device's registers.
    fn addrs(&self) -> &[u32];

    fn reset(&mut self) {}

    fn tick(&mut self, _mem: &mut Memory, _irq: &mut dyn InterruptSink) -> Result<()> {
        Ok(())
    }

    fn read16(&mut self, addr: u32) -> Result<u16>;
    fn write16(&mut self, addr: u32, val: u16) -> Result<()>;
}
