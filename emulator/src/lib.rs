pub mod config;
pub mod error;
pub mod interrupt;
pub mod io;
pub mod machine;
pub mod memory;
pub mod unibus;

pub use config::{BusConfig, ConsoleConfig, MachineConfig, Rk05Config, RkErrorPolicy};
pub use error::{EmuError, Result, RkError};
pub use interrupt::{Interrupt, InterruptQueue, InterruptSink};
pub use io::Device;
pub use machine::{Cpu, ExecRet, Machine};
pub use memory::Memory;
pub use unibus::Unibus;
