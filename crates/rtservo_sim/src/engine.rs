//! The servo engine as seen from the register interface.
//!
//! Only the handshake is modeled: the interface drives `start` from the
//! config register and reads back `done`. What the engine computes between
//! the two is outside this crate.

/// Handshake side of the servo engine.
pub trait Engine {
    /// The engine's `done` flag in the current cycle.
    fn done(&self) -> bool;

    /// Applies a bus clock edge with the current `start` level.
    fn clock(&mut self, start: bool);

    /// Returns the engine to its reset state.
    fn reset(&mut self);

    /// Sets `done` directly. Returns false if the engine drives `done`
    /// itself and ignored the request.
    fn force_done(&mut self, _done: bool) -> bool {
        false
    }
}

/// An engine whose `done` flag is driven from outside.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ManualEngine {
    done: bool,
}

impl ManualEngine {
    /// Creates an engine with `done` low.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Engine for ManualEngine {
    fn done(&self) -> bool {
        self.done
    }

    fn clock(&mut self, _start: bool) {}

    fn reset(&mut self) {
        self.done = false;
    }

    fn force_done(&mut self, done: bool) -> bool {
        self.done = done;
        true
    }
}

/// An engine that completes one iteration every `period` cycles while
/// `start` is high, pulsing `done` for one cycle at the end of each.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeriodicEngine {
    period: u32,
    count: u32,
    done: bool,
}

impl PeriodicEngine {
    /// Creates an engine with the given iteration length. A period of 0 is
    /// treated as 1.
    pub fn new(period: u32) -> Self {
        Self {
            period: period.max(1),
            count: 0,
            done: false,
        }
    }

    /// Iteration length in bus cycles.
    pub fn period(&self) -> u32 {
        self.period
    }
}

impl Engine for PeriodicEngine {
    fn done(&self) -> bool {
        self.done
    }

    fn clock(&mut self, start: bool) {
        if !start {
            self.count = 0;
            self.done = false;
            return;
        }
        self.count += 1;
        if self.count >= self.period {
            self.count = 0;
            self.done = true;
        } else {
            self.done = false;
        }
    }

    fn reset(&mut self) {
        self.count = 0;
        self.done = false;
    }
}
