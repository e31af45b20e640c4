use common::constants::{IO_PAGE_START, WORD_SIZE};

/// Console output throttling. The console counts calls to `poll` modulo
/// `period` and only drains the printer buffer while the count is above
/// `output_delay`, which stands in for the line's baud rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub output_delay: u32,
    pub period: u32,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            output_delay: 64,
            period: 256,
        }
    }
}

/// What the RK05 does with no-such-drive/cylinder/sector and overrun
/// conditions found during a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RkErrorPolicy {
    /// Log the condition and latch it in the controller's advisory mask, but
    /// leave RKER and the transfer alone.
    #[default]
    Advisory,

    /// Set the RKER bit along with RKCS ERR and HE, end the transfer, and
    /// raise the done interrupt if enabled.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rk05Config {
    /// Most words moved by a single `step`. A sector is 256 words, so the
    /// default moves one sector per main cycle.
    pub chunk_words: usize,
    pub error_policy: RkErrorPolicy,
}

impl Default for Rk05Config {
    fn default() -> Self {
        Rk05Config {
            chunk_words: 256,
            error_policy: RkErrorPolicy::Advisory,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    pub memory_words: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        // Everything below the I/O page.
        BusConfig {
            memory_words: (IO_PAGE_START / WORD_SIZE) as usize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MachineConfig {
    pub bus: BusConfig,
    pub console: ConsoleConfig,
    pub rk05: Rk05Config,
}
