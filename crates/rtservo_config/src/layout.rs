//! Resolved bus geometry: field positions on the address bus and inside the
//! memory words.
//!
//! A [`BusLayout`] can only be obtained through [`BusLayout::resolve`], which
//! performs every design-time width check. Holding one is proof that the
//! parameter set elaborates.
//!
//! Address bus fields, MSB first, for an address of width `W`:
//!
//! | bit      | field                                           |
//! |----------|-------------------------------------------------|
//! | `W-1`    | `we`                                            |
//! | `W-2`    | `state_sel`                                     |
//! | `W-3`    | `high_coeff` (coefficient) / `config_sel` (state)|
//! | `[0, A)` | memory address, `A = max(coeff_addr, state_addr)`|
//!
//! Bits between `A` and `W-3` exist only when an explicit wider address is
//! configured; they are ignored by the decoder.

use rtservo_common::BitField;
use serde::Serialize;

use crate::error::ConfigError;
use crate::types::Widths;

/// Largest supported coefficient half-width; two halves fill a `u64`.
pub const MAX_COEFF_WIDTH: u32 = 32;
/// Largest supported state word width.
pub const MAX_STATE_WIDTH: u32 = 64;
/// Largest supported memory address width.
pub const MAX_MEM_ADDR_WIDTH: u32 = 20;
/// Largest supported profile index width.
pub const MAX_PROFILE_WIDTH: u32 = 30;
/// Number of select bits above the memory address: `we`, `state_sel` and the
/// shared `high_coeff`/`config_sel` bit.
pub const SELECT_BITS: u32 = 3;
/// Width of the status register.
pub const STATUS_WIDTH: u32 = 2;

/// Validated field geometry of one servo memory bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusLayout {
    coeff: u32,
    state: u32,
    coeff_addr: u32,
    state_addr: u32,
    profile: u32,
    address: u32,
}

impl BusLayout {
    /// Checks every design-time width constraint and resolves the layout.
    pub fn resolve(widths: &Widths) -> Result<Self, ConfigError> {
        for (name, width) in [
            ("coeff", widths.coeff),
            ("state", widths.state),
            ("word", widths.word),
            ("coeff_addr", widths.coeff_addr),
            ("state_addr", widths.state_addr),
            ("profile", widths.profile),
        ] {
            if width == 0 {
                return Err(ConfigError::ZeroWidth(name));
            }
        }
        for (name, width, max) in [
            ("coeff", widths.coeff, MAX_COEFF_WIDTH),
            ("state", widths.state, MAX_STATE_WIDTH),
            ("coeff_addr", widths.coeff_addr, MAX_MEM_ADDR_WIDTH),
            ("state_addr", widths.state_addr, MAX_MEM_ADDR_WIDTH),
            ("profile", widths.profile, MAX_PROFILE_WIDTH),
        ] {
            if width > max {
                return Err(ConfigError::WidthTooLarge {
                    field: name,
                    width,
                    max,
                });
            }
        }

        if widths.state < widths.coeff {
            return Err(ConfigError::StateNarrowerThanCoeff {
                state: widths.state,
                coeff: widths.coeff,
            });
        }
        if let Some(storage) = widths.coeff_storage {
            if storage != 2 * widths.coeff {
                return Err(ConfigError::CoeffStorageMismatch {
                    storage,
                    coeff: widths.coeff,
                });
            }
        }
        if widths.coeff < widths.word {
            return Err(ConfigError::WordDoesNotFit {
                word: widths.word,
                coeff: widths.coeff,
            });
        }

        let required = SELECT_BITS + widths.coeff_addr.max(widths.state_addr);
        let address = widths.address.unwrap_or(required);
        if address < required {
            return Err(ConfigError::AddressTooNarrow {
                width: address,
                required,
            });
        }
        if address > 64 {
            return Err(ConfigError::WidthTooLarge {
                field: "address",
                width: address,
                max: 64,
            });
        }

        Ok(Self {
            coeff: widths.coeff,
            state: widths.state,
            coeff_addr: widths.coeff_addr,
            state_addr: widths.state_addr,
            profile: widths.profile,
            address,
        })
    }

    /// Bus data width, equal to the coefficient half-width.
    pub fn data_width(&self) -> u32 {
        self.coeff
    }

    /// Coefficient half-width.
    pub fn coeff_width(&self) -> u32 {
        self.coeff
    }

    /// Coefficient storage word width (two halves).
    pub fn coeff_storage_width(&self) -> u32 {
        2 * self.coeff
    }

    /// State memory word width.
    pub fn state_width(&self) -> u32 {
        self.state
    }

    /// Coefficient memory address width.
    pub fn coeff_addr_width(&self) -> u32 {
        self.coeff_addr
    }

    /// State memory address width.
    pub fn state_addr_width(&self) -> u32 {
        self.state_addr
    }

    /// Width of the memory address field on the bus.
    pub fn mem_addr_width(&self) -> u32 {
        self.coeff_addr.max(self.state_addr)
    }

    /// Total bus address width.
    pub fn address_width(&self) -> u32 {
        self.address
    }

    /// Profile index width of the channel control word.
    pub fn profile_width(&self) -> u32 {
        self.profile
    }

    /// Channel control word width: profile plus the two enable bits.
    pub fn ctrl_width(&self) -> u32 {
        self.profile + 2
    }

    /// Write/read select bit.
    pub fn we_field(&self) -> BitField {
        BitField::bit(self.address - 1)
    }

    /// State/coefficient select bit.
    pub fn state_sel_field(&self) -> BitField {
        BitField::bit(self.address - 2)
    }

    /// The shared `high_coeff`/`config_sel` bit. Its meaning depends on
    /// `state_sel`.
    pub fn shared_sel_field(&self) -> BitField {
        BitField::bit(self.address - 3)
    }

    /// Memory address field on the bus.
    pub fn mem_addr_field(&self) -> BitField {
        BitField::new(0, self.mem_addr_width())
    }

    /// Coefficient memory address taken from the bus address.
    pub fn coeff_addr_field(&self) -> BitField {
        BitField::new(0, self.coeff_addr)
    }

    /// State memory address taken from the bus address.
    pub fn state_addr_field(&self) -> BitField {
        BitField::new(0, self.state_addr)
    }

    /// Position of one coefficient half inside the storage word.
    pub fn coeff_half_field(&self, high: bool) -> BitField {
        BitField::new(if high { self.coeff } else { 0 }, self.coeff)
    }

    /// The externally visible top bits of a state word.
    pub fn state_exposed_field(&self) -> BitField {
        BitField::new(self.state - self.coeff, self.coeff)
    }

    /// Named address bus fields, MSB first.
    pub fn address_fields(&self) -> Vec<(&'static str, BitField)> {
        vec![
            ("we", self.we_field()),
            ("state_sel", self.state_sel_field()),
            ("high_coeff/config_sel", self.shared_sel_field()),
            ("coeff_addr", self.coeff_addr_field()),
            ("state_addr", self.state_addr_field()),
        ]
    }
}
