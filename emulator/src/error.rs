use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmuError>;

/// Unrecoverable faults. Any of these halts emulation; they indicate a
/// guest-software or emulator bug, or a broken host environment.
#[derive(Debug, Error)]
pub enum EmuError {
    #[error("read from invalid address {0:#o}")]
    InvalidRead(u32),

    #[error("write of {val:#o} to invalid address {addr:#o}")]
    InvalidWrite { addr: u32, val: u16 },

    #[error("word access to odd address {0:#o}")]
    OddAddress(u32),

    #[error("access to non-existent memory at {0:#o}")]
    NonExistentMemory(u32),

    #[error("unimplemented RK05 operation {0:#o}")]
    UnimplementedRkFunction(u16),

    #[error("RK05 failed to seek to byte {pos}")]
    Seek {
        pos: u64,
        #[source]
        source: io::Error,
    },

    #[error("RK05 image I/O failed")]
    Storage(#[source] io::Error),

    #[error("could not open RK05 image {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("console transport failed")]
    Transport(#[source] io::Error),
}

/// Conditions an RK05 transfer can run into that real software expects to
/// see in RKER. What the controller does with them is set by
/// [`RkErrorPolicy`](crate::config::RkErrorPolicy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RkError {
    #[error("no such drive")]
    NoSuchDrive,

    #[error("no such cylinder")]
    NoSuchCylinder,

    #[error("no such sector")]
    NoSuchSector,

    #[error("overrun past the last cylinder")]
    Overrun,
}

impl RkError {
    /// The RKER bit for this condition.
    pub const fn mask(self) -> u16 {
        match self {
            RkError::NoSuchSector => 0x1 << 5,
            RkError::NoSuchCylinder => 0x1 << 6,
            RkError::NoSuchDrive => 0x1 << 7,
            RkError::Overrun => 0x1 << 14,
        }
    }
}
