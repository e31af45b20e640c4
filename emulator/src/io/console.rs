use std::collections::VecDeque;
use std::io::{self, stdout, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::ConsoleConfig;
use crate::io::Device;
use crate::{EmuError, Interrupt, InterruptSink, Memory, Result};
use common::constants::{PRIO_TTY, VEC_TTY_IN, VEC_TTY_OUT};
use common::misc::SetBits;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use log::{error, trace};

/// The byte-oriented duplex line the console talks to. Polled, never pushed.
pub trait Tty: Send + Sync {
    fn handle_output(&self, val: u8) -> io::Result<()>;

    fn input_available(&self) -> io::Result<bool>;
    fn poll_input(&self) -> Option<u8>;
}

////////////////////////////////////////////////////////////////////////////////

/// The host terminal, in raw mode for as long as this is alive.
pub struct StdIo {
    in_buf: Mutex<VecDeque<u8>>,
}

impl StdIo {
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(StdIo {
            in_buf: Mutex::default(),
        })
    }

    fn fill(&self) -> io::Result<()> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if let Some(ch) = key_to_ascii(key) {
                    self.lock_in().push_back(ch);
                }
            }
        }
        Ok(())
    }

    fn lock_in(&self) -> std::sync::MutexGuard<'_, VecDeque<u8>> {
        // A poisoned buffer of plain bytes is still usable.
        self.in_buf.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for StdIo {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            error!("StdIo: failed to leave raw mode: {e}");
        }
    }
}

impl Tty for StdIo {
    fn handle_output(&self, val: u8) -> io::Result<()> {
        let mut out = stdout().lock();
        out.write_all(&[val])?;
        out.flush()
    }

    fn input_available(&self) -> io::Result<bool> {
        self.fill()?;
        Ok(!self.lock_in().is_empty())
    }

    fn poll_input(&self) -> Option<u8> {
        self.lock_in().pop_front()
    }
}

fn key_to_ascii(key: KeyEvent) -> Option<u8> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char(c) if !c.is_ascii() => None,
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(c.to_ascii_uppercase() as u8 & 0o37)
        }
        KeyCode::Char(c) => Some(c as u8),
        KeyCode::Enter => Some(b'\r'),
        KeyCode::Backspace => Some(0o177),
        KeyCode::Tab => Some(b'\t'),
        KeyCode::Esc => Some(0o33),
        _ => None,
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Default)]
pub struct PipeTty {
    out_buf: Mutex<VecDeque<u8>>,
    in_buf: Mutex<VecDeque<u8>>,
}

impl PipeTty {
    fn lock_out(&self) -> std::sync::MutexGuard<'_, VecDeque<u8>> {
        self.out_buf.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_in(&self) -> std::sync::MutexGuard<'_, VecDeque<u8>> {
        self.in_buf.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn take_output(&self) -> VecDeque<u8> {
        std::mem::take(&mut *self.lock_out())
    }

    pub fn is_out_empty(&self) -> bool {
        self.lock_out().is_empty()
    }

    pub fn pop_output(&self) -> Option<u8> {
        self.lock_out().pop_front()
    }

    pub fn push_input(&self, val: u8) {
        self.lock_in().push_back(val);
    }

    pub fn write_input(&self, vals: &[u8]) {
        for val in vals.iter() {
            self.push_input(*val);
        }
    }
}

impl Tty for PipeTty {
    fn handle_output(&self, val: u8) -> io::Result<()> {
        self.lock_out().push_back(val);
        Ok(())
    }

    fn input_available(&self) -> io::Result<bool> {
        Ok(!self.lock_in().is_empty())
    }

    fn poll_input(&self) -> Option<u8> {
        self.lock_in().pop_front()
    }
}

////////////////////////////////////////////////////////////////////////////////

/// DL11-style console: keyboard and printer register pairs.
pub struct Console {
    device: Arc<dyn Tty>,
    config: ConsoleConfig,

    tks: u16,
    tkb: u16,
    tps: u16,
    tpb: u16,

    ticks: u32,
}

impl Console {
    // Keyboard Status
    pub const TKS: u32 = 0o777560;
    // Keyboard Buffer
    pub const TKB: u32 = 0o777562;
    // Printer Status
    pub const TPS: u32 = 0o777564;
    // Printer Buffer
    pub const TPB: u32 = 0o777566;

    pub const ADDRS: &[u32] = &[Self::TKS, Self::TKB, Self::TPS, Self::TPB];

    // Paper tape reader enable; never set here, but a TKB read clears it.
    const RDR_ENB_MASK: u16 = 0x1 << 0;
    pub const INT_ENB_MASK: u16 = 0x1 << 6;
    // DONE in TKS, READY in TPS.
    pub const READY_MASK: u16 = 0x1 << 7;

    pub fn new(device: Arc<dyn Tty>, config: ConsoleConfig) -> Self {
        assert!(config.period > config.output_delay, "Console period must exceed output delay");
        let mut cons = Console {
            device,
            config,
            tks: 0,
            tkb: 0,
            tps: 0,
            tpb: 0,
            ticks: 0,
        };
        cons.clear();
        cons
    }

    pub fn new_to_stdio(config: ConsoleConfig) -> Result<Self> {
        let tty = StdIo::new().map_err(EmuError::Transport)?;
        Ok(Self::new(Arc::new(tty), config))
    }

    fn clear(&mut self) {
        self.tks = 0;
        self.tkb = 0;
        self.tps = Self::READY_MASK;
        self.tpb = 0;
    }

    /// Take one character from the line into the keyboard buffer. A character
    /// not yet read is overwritten.
    pub fn add_char(&mut self, ch: u8, irq: &mut dyn InterruptSink) {
        let translated = match ch {
            // '*' and ^S
            42 => 4,
            19 => 0o34,
            _ => ch,
        };
        self.tkb = translated as u16;
        self.tks |= Self::READY_MASK;
        trace!("Console: received {ch:#o}, TKB now {:#o}", self.tkb);
        if self.tks & Self::INT_ENB_MASK != 0 {
            irq.raise(Interrupt{prio: PRIO_TTY, vector: VEC_TTY_IN});
        }
    }

    /// One main cycle of console service: take at most one inbound character,
    /// then, once the output delay has elapsed in this period, print the
    /// buffered character.
    pub fn poll(&mut self, irq: &mut dyn InterruptSink) -> Result<()> {
        if self.device.input_available().map_err(EmuError::Transport)? {
            if let Some(ch) = self.device.poll_input() {
                self.add_char(ch, irq);
            }
        }

        self.ticks = (self.ticks + 1) % self.config.period;
        if self.ticks > self.config.output_delay && self.tps & Self::READY_MASK == 0 {
            self.device
                .handle_output((self.tpb & 0o177) as u8)
                .map_err(EmuError::Transport)?;
            self.tps |= Self::READY_MASK;
            if self.tps & Self::INT_ENB_MASK != 0 {
                irq.raise(Interrupt{prio: PRIO_TTY, vector: VEC_TTY_OUT});
            }
        }
        Ok(())
    }

    fn tkb_read(&mut self) -> u16 {
        if self.tks & Self::READY_MASK != 0 {
            self.tks &= !(Self::READY_MASK | Self::RDR_ENB_MASK);
            return self.tkb;
        }
        0
    }
}

impl Device for Console {
    fn addrs(&self) -> &[u32] {
        Self::ADDRS
    }

    fn reset(&mut self) {
        self.clear();
    }

    fn tick(&mut self, _mem: &mut Memory, irq: &mut dyn InterruptSink) -> Result<()> {
        self.poll(irq)
    }

    fn read16(&mut self, addr: u32) -> Result<u16> {
        match addr {
            Self::TKS => Ok(self.tks),
            Self::TKB => Ok(self.tkb_read()),
            Self::TPS => Ok(self.tps),
            // Write-only.
            Self::TPB => Ok(0),
            _ => Err(EmuError::InvalidRead(addr)),
        }
    }

    fn write16(&mut self, addr: u32, val: u16) -> Result<()> {
        // The status registers only take the interrupt enable; DONE and READY
        // belong to the hardware.
        match addr {
            Self::TKS => self.tks.set_bits(Self::INT_ENB_MASK, val & Self::INT_ENB_MASK != 0),
            Self::TPS => self.tps.set_bits(Self::INT_ENB_MASK, val & Self::INT_ENB_MASK != 0),
            Self::TPB => {
                self.tpb = val & 0xff;
                self.tps &= !Self::READY_MASK;
            }
            _ => return Err(EmuError::InvalidWrite{addr, val}),
        }
        Ok(())
    }
}
