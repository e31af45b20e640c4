use std::collections::VecDeque;

use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupt {
    pub prio: u8, // 0o0 through 0o7
    pub vector: u16,
}

/// Where devices send interrupt requests. Fire-and-forget: the device never
/// learns whether or when the request was serviced.
pub trait InterruptSink {
    fn raise(&mut self, inter: Interrupt);
}

/// Pending requests, highest priority first and in arrival order within a
/// priority. A vector is pending at most once.
#[derive(Debug, Default)]
pub struct InterruptQueue {
    pending: VecDeque<Interrupt>,
}

impl InterruptQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn peek(&self) -> Option<&Interrupt> {
        self.pending.front()
    }

    /// Remove and return the highest pending request, if it is strictly above
    /// the processor's current priority.
    pub fn take_above(&mut self, prio: u8) -> Option<Interrupt> {
        match self.pending.front() {
            Some(inter) if inter.prio > prio => self.pending.pop_front(),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl InterruptSink for InterruptQueue {
    fn raise(&mut self, inter: Interrupt) {
        if self.pending.iter().any(|p| p.vector == inter.vector) {
            return;
        }
        debug!("Interrupt requested: vector {:#o}, prio {}", inter.vector, inter.prio);
        let pos = self.pending.iter()
            .position(|p| p.prio < inter.prio)
            .unwrap_or(self.pending.len());
        self.pending.insert(pos, inter);
    }
}
