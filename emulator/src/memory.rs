use crate::{EmuError, Result};
use common::constants::{MEM_END, WORD_SIZE};
use common::misc::IsEven;

use log::trace;

/// Main memory below the I/O page, stored as words. Only word accesses are
/// modeled, so odd addresses are a fault rather than a byte lane select.
pub struct Memory {
    words: Vec<u16>,
}

impl Memory {
    pub fn new(words: usize) -> Self {
        assert!(words as u32 <= MEM_END / WORD_SIZE, "Memory of {words} words overlaps the I/O page");
        Memory {
            words: vec![0; words],
        }
    }

    pub fn len_bytes(&self) -> u32 {
        self.words.len() as u32 * WORD_SIZE
    }

    fn index(&self, addr: u32) -> Result<usize> {
        if !addr.is_even() {
            return Err(EmuError::OddAddress(addr));
        }
        if addr >= self.len_bytes() {
            return Err(EmuError::NonExistentMemory(addr));
        }
        Ok((addr / WORD_SIZE) as usize)
    }

    pub fn read_word(&self, addr: u32) -> Result<u16> {
        let idx = self.index(addr)?;
        Ok(self.words[idx])
    }

    pub fn write_word(&mut self, addr: u32, val: u16) -> Result<()> {
        trace!("Mem: writing {val:#o} to 0o{addr:o}");
        let idx = self.index(addr)?;
        self.words[idx] = val;
        Ok(())
    }

    // Little-endian byte image, e.g. a boot loader. `start` must be even; an
    // odd trailing byte lands in the low half of the last word.
    pub fn load_image(&mut self, data: &[u8], start: u32) -> Result<()> {
        for (addr, chunk) in (start..).step_by(WORD_SIZE as usize).zip(data.chunks(2)) {
            let lower = chunk[0] as u16;
            let upper = chunk.get(1).copied().unwrap_or(0) as u16;
            self.write_word(addr, lower | (upper << u8::BITS))?;
        }
        Ok(())
    }
}
