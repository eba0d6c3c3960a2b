//! The config register and its crossing from the bus clock domain.
//!
//! A config write is accepted on a bus edge into a hand-off register and only
//! becomes the config value on the next edge of the config clock. Nothing
//! here synchronizes the two clocks; the surrounding system is expected to
//! clock the config domain slowly enough, or in a fixed relation to the bus,
//! for a single-bit hand-off to be safe.

/// Single-bit config register updated from a second clock domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfigRegister {
    /// Written on the bus edge, consumed on the config edge.
    handoff: Option<bool>,
    value: bool,
}

impl ConfigRegister {
    /// A cleared register with nothing in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus domain: latches a new value for the config domain. A later
    /// request before the next config edge replaces it.
    pub fn request(&mut self, bit: bool) {
        self.handoff = Some(bit);
    }

    /// Config domain edge. Returns true if the visible value changed.
    pub fn clock(&mut self) -> bool {
        match self.handoff.take() {
            Some(bit) => {
                let changed = bit != self.value;
                self.value = bit;
                changed
            }
            None => false,
        }
    }

    /// Current config bit; drives the engine `start`.
    pub fn value(&self) -> bool {
        self.value
    }

    /// Value waiting for the next config edge, if any.
    pub fn in_flight(&self) -> Option<bool> {
        self.handoff
    }

    /// Clears the register and drops any in-flight value.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
