use std::sync::Arc;

use crate::config::{BusConfig, MachineConfig};
use crate::io::Device;
use crate::io::console::{Console, Tty};
use crate::io::disk_image::DiskImage;
use crate::io::rk05::Rk05;
use crate::{EmuError, InterruptSink, Memory, Result};
use common::constants::{BUS_END, IO_PAGE_START};
use common::misc::IsEven;

use log::trace;

/// The I/O fabric between the CPU and everything else: main memory below the
/// I/O page, device registers inside it. Owns every device it routes to.
pub struct Unibus {
    mem: Memory,
    console: Console,
    rk05: Rk05,
}

impl Unibus {
    pub fn new(config: BusConfig, console: Console, rk05: Rk05) -> Self {
        let bus = Unibus {
            mem: Memory::new(config.memory_words),
            console,
            rk05,
        };
        debug_assert!(bus.overlapping_addr().is_none(), "Duplicate device for {:?}", bus.overlapping_addr());
        bus
    }

    /// Console on `tty`, RK05 on `image`, memory and devices per `config`.
    pub fn with_devices(config: &MachineConfig, tty: Arc<dyn Tty>, image: impl DiskImage + 'static) -> Self {
        let console = Console::new(tty, config.console);
        let rk05 = Rk05::new(image, config.rk05);
        Self::new(config.bus, console, rk05)
    }

    fn overlapping_addr(&self) -> Option<u32> {
        let console = self.console.addrs();
        self.rk05.addrs().iter().copied().find(|a| console.contains(a))
    }

    fn device(&mut self, addr: u32) -> Option<&mut dyn Device> {
        let devices: [&mut dyn Device; 2] = [&mut self.console, &mut self.rk05];
        devices.into_iter().find(|dev| dev.addrs().contains(&addr))
    }

    pub fn read16(&mut self, addr: u32) -> Result<u16> {
        if !addr.is_even() {
            return Err(EmuError::OddAddress(addr));
        }
        if addr < IO_PAGE_START {
            return self.mem.read_word(addr);
        }
        if addr >= BUS_END {
            return Err(EmuError::InvalidRead(addr));
        }
        let val = match self.device(addr) {
            Some(dev) => dev.read16(addr)?,
            None => return Err(EmuError::InvalidRead(addr)),
        };
        trace!("Unibus: read {val:#o} from 0o{addr:o}");
        Ok(val)
    }

    pub fn write16(&mut self, addr: u32, val: u16) -> Result<()> {
        if !addr.is_even() {
            return Err(EmuError::OddAddress(addr));
        }
        if addr < IO_PAGE_START {
            return self.mem.write_word(addr, val);
        }
        if addr >= BUS_END {
            return Err(EmuError::InvalidWrite{addr, val});
        }
        trace!("Unibus: writing {val:#o} to 0o{addr:o}");
        match self.device(addr) {
            Some(dev) => dev.write16(addr, val),
            None => Err(EmuError::InvalidWrite{addr, val}),
        }
    }

    /// One main cycle of device service, in fixed order: console, then disk.
    pub fn service(&mut self, irq: &mut dyn InterruptSink) -> Result<()> {
        self.console.tick(&mut self.mem, irq)?;
        self.rk05.tick(&mut self.mem, irq)
    }

    /// Bus INIT: every device back to its power-on state. Memory is kept.
    pub fn reset(&mut self) {
        self.console.reset();
        self.rk05.reset();
    }

    pub fn load_image(&mut self, data: &[u8], start: u32) -> Result<()> {
        self.mem.load_image(data, start)
    }

    pub fn mem(&self) -> &Memory {
        &self.mem
    }

    pub fn mem_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut Console {
        &mut self.console
    }

    pub fn rk05(&self) -> &Rk05 {
        &self.rk05
    }

    pub fn rk05_mut(&mut self) -> &mut Rk05 {
        &mut self.rk05
    }
}
