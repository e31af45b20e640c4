use crate::{InterruptQueue, Result, Unibus};

use log::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecRet {
    Ok,
    Halt,
    Wait,
}

/// The processor, as seen from the bus side. Instruction execution and trap
/// handling live behind this.
pub trait Cpu {
    /// Execute one instruction.
    fn exec(&mut self, bus: &mut Unibus) -> Result<ExecRet>;

    /// Current processor priority, 0o0 through 0o7.
    fn priority(&self) -> u8;

    /// Take the interrupt through `vector`.
    fn interrupt(&mut self, bus: &mut Unibus, vector: u16) -> Result<()>;
}

pub struct Machine<C: Cpu> {
    bus: Unibus,
    cpu: C,
    pending: InterruptQueue,
    waiting: bool,
}

impl<C: Cpu> Machine<C> {
    pub fn new(bus: Unibus, cpu: C) -> Self {
        Machine {
            bus,
            cpu,
            pending: InterruptQueue::new(),
            waiting: false,
        }
    }

    /// Run until a halt. A fatal error stops everything and is handed back.
    pub fn run(&mut self) -> Result<()> {
        loop {
            match self.run_cycle() {
                Ok(ExecRet::Halt) => return Ok(()),
                Ok(_) => (),
                Err(e) => {
                    error!("Emulation halted: {e}");
                    return Err(e);
                }
            }
        }
    }

    /// One main cycle: let each device get its time slice, deliver the most
    /// urgent interrupt the processor will accept, then run an instruction
    /// unless the processor is waiting.
    pub fn run_cycle(&mut self) -> Result<ExecRet> {
        self.bus.service(&mut self.pending)?;

        if let Some(inter) = self.pending.take_above(self.cpu.priority()) {
            debug!("Delivering interrupt: vector {:#o}, prio {}", inter.vector, inter.prio);
            self.waiting = false;
            self.cpu.interrupt(&mut self.bus, inter.vector)?;
        }

        if self.waiting {
            return Ok(ExecRet::Wait);
        }

        let ret = self.cpu.exec(&mut self.bus)?;
        if ret == ExecRet::Wait {
            self.waiting = true;
        }
        Ok(ret)
    }

    /// Bus INIT from the processor (e.g. the RESET instruction). Requests
    /// not yet delivered are dropped along with the device state.
    pub fn reset_bus(&mut self) {
        self.bus.reset();
        self.pending.clear();
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    pub fn bus(&self) -> &Unibus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Unibus {
        &mut self.bus
    }

    pub fn cpu(&self) -> &C {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut C {
        &mut self.cpu
    }

    pub fn pending(&self) -> &InterruptQueue {
        &self.pending
    }

    /// Run for at most `cycles` main cycles. Returns whether the processor
    /// halted within them.
    pub fn run_for(&mut self, cycles: usize) -> Result<bool> {
        for _ in 0..cycles {
            if self.run_cycle()? == ExecRet::Halt {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
