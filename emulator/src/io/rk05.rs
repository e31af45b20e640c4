use std::io::{Seek, SeekFrom};
use std::path::Path;

use crate::config::{Rk05Config, RkErrorPolicy};
use crate::io::Device;
use crate::io::disk_image::{open_image, DiskImage};
use crate::{EmuError, Interrupt, InterruptSink, Memory, Result, RkError};
use common::constants::{BUS_ADDR_MASK, PRIO_RK, VEC_RK};
use common::mem::{ReadU16, WriteU16};

use log::{debug, trace, warn};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum RkFunction {
    ControlReset = 0,
    Write = 1,
    Read = 2,
    WriteCheck = 3,
    Seek = 4,
    ReadCheck = 5,
    DriveReset = 6,
    WriteLock = 7,
}

/// RK11 controller with a single RK05 drive. Transfers are word-at-a-time DMA
/// against main memory, at most `chunk_words` per `step`.
pub struct Rk05 {
    image: Box<dyn DiskImage>,
    config: Rk05Config,

    rkds: u16,
    rker: u16,
    rkcs: u16,
    rkwc: u16,
    rkba: u32, // 18 bits; the top two live in RKCS MEX

    drive: u16,
    cylinder: u16,
    surface: u16,
    sector: u16,

    running: bool,
    // Words already moved into or out of the current sector.
    sector_words: usize,
    // Conditions seen under RkErrorPolicy::Advisory, in RKER bit layout.
    advisory: u16,
}

impl Rk05 {
    // Drive Status
    pub const RKDS: u32 = 0o777400;
    // Error
    pub const RKER: u32 = 0o777402;
    // Control/Status
    pub const RKCS: u32 = 0o777404;
    // Word Count
    pub const RKWC: u32 = 0o777406;
    // Bus Address
    pub const RKBA: u32 = 0o777410;
    // Disk Address
    pub const RKDA: u32 = 0o777412;

    pub const ADDRS: &[u32] = &[
        Self::RKDS, Self::RKER, Self::RKCS, Self::RKWC, Self::RKBA, Self::RKDA,
    ];

    pub const DS_RDY: u16 = 0x1 << 6;
    pub const DS_DRY: u16 = 0x1 << 7;
    pub const DS_RK05: u16 = 0x1 << 11;

    pub const CS_GO: u16 = 0x1;
    const CS_FUNC_MASK: u16 = 0o16;
    const CS_MEX_MASK: u16 = 0o60;
    const CS_MEX_SHIFT: u32 = 12;
    pub const CS_IDE: u16 = 0x1 << 6;
    pub const CS_RDY: u16 = 0x1 << 7;
    pub const CS_HE: u16 = 0x1 << 14;
    pub const CS_ERR: u16 = 0x1 << 15;
    const CS_WRITABLE: u16 = 0o17517;

    // RKDA cylinder field, 8 bits.
    const DA_CYL_MASK: u16 = 0o377;

    const BA_LOW_MASK: u32 = 0xffff;
    const BA_MEX_MASK: u32 = 0x30000;

    pub const MAX_CYLINDER: u16 = 0o312;
    pub const MAX_SURFACE: u16 = 1;
    pub const MAX_SECTOR: u16 = 0o13;
    pub const SECTORS_PER_TRACK: u64 = 12;
    pub const SURFACES: u64 = 2;
    pub const WORDS_PER_SECTOR: usize = 256;
    pub const BYTES_PER_SECTOR: u64 = 512;
    pub const IMAGE_BYTES: u64 = (Self::MAX_CYLINDER as u64 + 1)
        * Self::SURFACES * Self::SECTORS_PER_TRACK * Self::BYTES_PER_SECTOR;

    pub fn new(image: impl DiskImage + 'static, config: Rk05Config) -> Self {
        assert!(config.chunk_words > 0, "RK05 chunk must move at least one word");
        let mut rk = Rk05 {
            image: Box::new(image),
            config,
            rkds: 0,
            rker: 0,
            rkcs: 0,
            rkwc: 0,
            rkba: 0,
            drive: 0,
            cylinder: 0,
            surface: 0,
            sector: 0,
            running: false,
            sector_words: 0,
            advisory: 0,
        };
        rk.reset_controller();
        rk
    }

    pub fn open(path: impl AsRef<Path>, config: Rk05Config) -> Result<Self> {
        Ok(Self::new(open_image(path)?, config))
    }

    /// A transfer is in progress.
    pub fn running(&self) -> bool {
        self.running
    }

    /// Conditions ignored under the advisory policy since the last GO or reset.
    pub fn advisory_errors(&self) -> u16 {
        self.advisory
    }

    fn function_code(&self) -> u16 {
        (self.rkcs & Self::CS_FUNC_MASK) >> 1
    }

    fn reset_controller(&mut self) {
        self.rkds = Self::DS_RK05 | Self::DS_DRY | Self::DS_RDY;
        self.rker = 0;
        self.rkcs = Self::CS_RDY;
        self.rkwc = 0;
        self.rkba = 0;
        self.running = false;
        self.sector_words = 0;
        self.advisory = 0;
    }

    fn not_ready(&mut self) {
        self.rkds &= !Self::DS_RDY;
        self.rkcs &= !Self::CS_RDY;
    }

    fn ready(&mut self) {
        self.rkds |= Self::DS_RDY;
        self.rkcs |= Self::CS_RDY;
    }

    fn error(&mut self, err: RkError) {
        match self.config.error_policy {
            RkErrorPolicy::Advisory => {
                warn!("RK05: {err} at {}", self.geometry_str());
                self.advisory |= err.mask();
            }
            RkErrorPolicy::Strict => {
                warn!("RK05: {err} at {}, ending transfer", self.geometry_str());
                self.rker |= err.mask();
                self.rkcs |= Self::CS_ERR | Self::CS_HE;
            }
        }
    }

    fn failed(&self) -> bool {
        self.rkcs & Self::CS_ERR != 0
    }

    fn geometry_str(&self) -> String {
        format!("drive {} cylinder {:#o} surface {} sector {:#o}",
            self.drive, self.cylinder, self.surface, self.sector)
    }

    fn go(&mut self) -> Result<()> {
        let code = self.function_code();
        match RkFunction::from_u16(code) {
            Some(RkFunction::ControlReset) => {
                debug!("RK05: control reset");
                self.reset_controller();
            }
            Some(func @ (RkFunction::Write | RkFunction::Read)) => {
                debug!("RK05: {func:?} of {} words at {}, bus address {:#o}",
                    self.rkwc.wrapping_neg(), self.geometry_str(), self.rkba);
                self.rker = 0;
                self.rkcs &= !(Self::CS_ERR | Self::CS_HE);
                self.advisory = 0;
                self.sector_words = 0;
                self.running = true;
                self.not_ready();
            }
            _ => return Err(EmuError::UnimplementedRkFunction(code)),
        }
        Ok(())
    }

    fn rkcs_write(&mut self, val: u16) -> Result<()> {
        self.rkba = (self.rkba & Self::BA_LOW_MASK)
            | (((val & Self::CS_MEX_MASK) as u32) << Self::CS_MEX_SHIFT);
        let val = val & Self::CS_WRITABLE;
        self.rkcs &= !Self::CS_WRITABLE;
        self.rkcs |= val & !Self::CS_GO;
        if val & Self::CS_GO != 0 {
            self.go()?;
        }
        Ok(())
    }

    fn rkcs_read(&self) -> u16 {
        self.rkcs | ((self.rkba & Self::BA_MEX_MASK) >> Self::CS_MEX_SHIFT) as u16
    }

    fn rkda_write(&mut self, val: u16) {
        self.drive = val >> 13;
        self.cylinder = (val >> 5) & Self::DA_CYL_MASK;
        self.surface = (val >> 4) & 0x1;
        self.sector = val & 0o17;
    }

    fn rkda_read(&self) -> u16 {
        self.sector | (self.surface << 4) | ((self.cylinder & Self::DA_CYL_MASK) << 5) | (self.drive << 13)
    }

    // Byte offset of the next word to move.
    fn position(&self) -> u64 {
        let sector = self.cylinder as u64 * Self::SURFACES * Self::SECTORS_PER_TRACK
            + self.surface as u64 * Self::SECTORS_PER_TRACK
            + self.sector as u64;
        sector * Self::BYTES_PER_SECTOR + (self.sector_words * 2) as u64
    }

    fn next_sector(&mut self) {
        self.sector += 1;
        if self.sector > Self::MAX_SECTOR {
            self.sector = 0;
            self.surface += 1;
            if self.surface > Self::MAX_SURFACE {
                self.surface = 0;
                // Wraps within the RKDA field; wrapping to 0 is running off the pack too.
                self.cylinder = (self.cylinder + 1) & Self::DA_CYL_MASK;
                if self.cylinder > Self::MAX_CYLINDER || self.cylinder == 0 {
                    self.error(RkError::Overrun);
                }
            }
        }
    }

    fn finish(&mut self, irq: &mut dyn InterruptSink) {
        debug!("RK05: transfer done, RKER {:#o}", self.rker);
        self.running = false;
        self.ready();
        if self.rkcs & Self::CS_IDE != 0 {
            irq.raise(Interrupt{prio: PRIO_RK, vector: VEC_RK});
        }
    }

    /// Advance the transfer in progress, if any, by up to one chunk.
    pub fn step(&mut self, mem: &mut Memory, irq: &mut dyn InterruptSink) -> Result<()> {
        if !self.running {
            return Ok(());
        }

        let code = self.function_code();
        let write = match RkFunction::from_u16(code) {
            // Function rewritten to a reset without GO: nothing to do.
            Some(RkFunction::ControlReset) => return Ok(()),
            Some(RkFunction::Write) => true,
            Some(RkFunction::Read) => false,
            _ => return Err(EmuError::UnimplementedRkFunction(code)),
        };

        if self.drive != 0 {
            self.error(RkError::NoSuchDrive);
        }
        if self.cylinder > Self::MAX_CYLINDER {
            self.error(RkError::NoSuchCylinder);
        }
        if self.sector > Self::MAX_SECTOR {
            self.error(RkError::NoSuchSector);
        }
        if self.failed() {
            self.finish(irq);
            return Ok(());
        }

        let pos = self.position();
        self.image
            .seek(SeekFrom::Start(pos))
            .map_err(|source| EmuError::Seek{pos, source})?;

        let chunk = self.config.chunk_words.min(Self::WORDS_PER_SECTOR - self.sector_words);
        let mut moved = 0;
        // DMA goes to main memory directly, not through the Unibus.
        while moved < chunk && self.rkwc != 0 {
            if write {
                let val = mem.read_word(self.rkba)?;
                self.image.write_u16(val).map_err(EmuError::Storage)?;
                trace!("RK05: {val:#o} from {:#o} to byte {}", self.rkba, pos + 2 * moved as u64);
            } else {
                let val = self.image.read_u16().map_err(EmuError::Storage)?;
                mem.write_word(self.rkba, val)?;
                trace!("RK05: {val:#o} from byte {} to {:#o}", pos + 2 * moved as u64, self.rkba);
            }
            self.rkba = (self.rkba + 2) & BUS_ADDR_MASK;
            self.rkwc = self.rkwc.wrapping_add(1);
            moved += 1;
        }

        self.sector_words += moved;
        if self.sector_words == Self::WORDS_PER_SECTOR || self.rkwc == 0 {
            self.sector_words = 0;
            self.next_sector();
        }

        if self.rkwc == 0 || self.failed() {
            self.finish(irq);
        }
        Ok(())
    }
}

impl Device for Rk05 {
    fn addrs(&self) -> &[u32] {
        Self::ADDRS
    }

    fn reset(&mut self) {
        self.reset_controller();
    }

    fn tick(&mut self, mem: &mut Memory, irq: &mut dyn InterruptSink) -> Result<()> {
        self.step(mem, irq)
    }

    fn read16(&mut self, addr: u32) -> Result<u16> {
        match addr {
            Self::RKDS => Ok(self.rkds),
            Self::RKER => Ok(self.rker),
            Self::RKCS => Ok(self.rkcs_read()),
            Self::RKWC => Ok(self.rkwc),
            Self::RKBA => Ok((self.rkba & Self::BA_LOW_MASK) as u16),
            Self::RKDA => Ok(self.rkda_read()),
            _ => Err(EmuError::InvalidRead(addr)),
        }
    }

    fn write16(&mut self, addr: u32, val: u16) -> Result<()> {
        match addr {
            Self::RKDS | Self::RKER => (),
            Self::RKCS => self.rkcs_write(val)?,
            Self::RKWC => self.rkwc = val,
            Self::RKBA => self.rkba = (self.rkba & Self::BA_MEX_MASK) | val as u32,
            Self::RKDA => self.rkda_write(val),
            _ => return Err(EmuError::InvalidWrite{addr, val}),
        }
        Ok(())
    }
}
