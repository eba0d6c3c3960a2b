//! Address decoding for the servo memory bus.
//!
//! The bit below `state_sel` means `high_coeff` when the coefficient memory
//! is selected and `config_sel` when the state side is selected. Decoding
//! into [`Target`] resolves that aliasing once, so downstream logic matches
//! on a variant instead of re-reading a bit whose meaning depends on another.

use rtservo_config::BusLayout;
use serde::{Deserialize, Serialize};

/// Direction of a bus request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// `we = 0`.
    Read,
    /// `we = 1`.
    Write,
}

/// One half-word slot of a coefficient storage word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Half {
    /// Bits `[0, coeff)`.
    Low,
    /// Bits `[coeff, 2 * coeff)`.
    High,
}

impl Half {
    /// True for [`Half::High`].
    pub fn is_high(self) -> bool {
        self == Half::High
    }

    /// Index of the half-write-enable driven for this half.
    pub fn index(self) -> usize {
        match self {
            Half::Low => 0,
            Half::High => 1,
        }
    }
}

/// What a bus address selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum Target {
    /// `state_sel = 0`: one half of a coefficient word.
    Coeff {
        /// Coefficient memory address.
        addr: u32,
        /// `high_coeff`.
        half: Half,
    },
    /// `state_sel = 1, config_sel = 0`: exposed bits of a state word.
    State {
        /// State memory address.
        addr: u32,
    },
    /// `state_sel = 1, config_sel = 1`: config on write, status on read.
    ConfigStatus,
}

/// A fully decoded bus request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Request {
    /// Read or write.
    pub access: Access,
    /// Selected memory slot or register.
    pub target: Target,
}

impl Request {
    /// Creates a read request.
    pub fn read(target: Target) -> Self {
        Self {
            access: Access::Read,
            target,
        }
    }

    /// Creates a write request.
    pub fn write(target: Target) -> Self {
        Self {
            access: Access::Write,
            target,
        }
    }

    /// Decodes a raw bus address.
    ///
    /// Bits above the address width and the unused gap below the select
    /// bits are ignored.
    pub fn decode(layout: &BusLayout, address: u64) -> Self {
        let access = if layout.we_field().is_set(address) {
            Access::Write
        } else {
            Access::Read
        };
        let shared = layout.shared_sel_field().is_set(address);
        let target = if layout.state_sel_field().is_set(address) {
            if shared {
                Target::ConfigStatus
            } else {
                Target::State {
                    addr: layout.state_addr_field().extract(address) as u32,
                }
            }
        } else {
            Target::Coeff {
                addr: layout.coeff_addr_field().extract(address) as u32,
                half: if shared { Half::High } else { Half::Low },
            }
        };
        Self { access, target }
    }

    /// Encodes the request as a bus address. Memory addresses are truncated
    /// to their field widths.
    pub fn encode(&self, layout: &BusLayout) -> u64 {
        let mut address = 0;
        if self.access == Access::Write {
            address = layout.we_field().insert(address, 1);
        }
        match self.target {
            Target::Coeff { addr, half } => {
                address = layout.coeff_addr_field().insert(address, u64::from(addr));
                if half.is_high() {
                    address = layout.shared_sel_field().insert(address, 1);
                }
            }
            Target::State { addr } => {
                address = layout.state_sel_field().insert(address, 1);
                address = layout.state_addr_field().insert(address, u64::from(addr));
            }
            Target::ConfigStatus => {
                address = layout.state_sel_field().insert(address, 1);
                address = layout.shared_sel_field().insert(address, 1);
            }
        }
        address
    }
}
