//! Per-channel control register.
//!
//! A write-only register on its own narrow bus. The control word packs
//! `{profile, en_out, en_iir}` LSB first; a write loads it at the bus clock
//! edge and raises a combinational strobe toward the channel in the same
//! cycle.

use rtservo_common::{mask, BitField};
use rtservo_config::BusLayout;
use serde::{Deserialize, Serialize};

/// Decoded control word of one channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCtrl {
    /// Selected coefficient profile.
    pub profile: u32,
    /// Output enable.
    pub en_out: bool,
    /// IIR update enable.
    pub en_iir: bool,
}

impl ChannelCtrl {
    /// Packs the fields into a control word for `layout`.
    ///
    /// The profile is truncated to its field.
    pub fn pack(&self, layout: &BusLayout) -> u64 {
        let profile_width = layout.profile_width();
        let mut word = BitField::new(0, profile_width).insert(0, u64::from(self.profile));
        word = BitField::bit(profile_width).insert(word, u64::from(self.en_out));
        BitField::bit(profile_width + 1).insert(word, u64::from(self.en_iir))
    }

    /// Unpacks a control word. Bits above the word are ignored.
    pub fn unpack(word: u64, layout: &BusLayout) -> Self {
        let profile_width = layout.profile_width();
        Self {
            profile: BitField::new(0, profile_width).extract(word) as u32,
            en_out: BitField::bit(profile_width).is_set(word),
            en_iir: BitField::bit(profile_width + 1).is_set(word),
        }
    }
}

/// One cycle of the control bus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CtrlInput {
    /// Packed control word.
    pub data: u64,
    /// Write strobe.
    pub stb: bool,
}

impl CtrlInput {
    /// A cycle with no write.
    pub fn idle() -> Self {
        Self::default()
    }

    /// A write of `ctrl` packed for `layout`.
    pub fn write(ctrl: ChannelCtrl, layout: &BusLayout) -> Self {
        Self {
            data: ctrl.pack(layout),
            stb: true,
        }
    }
}

/// The control word register of one channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelControlRegister {
    layout: BusLayout,
    word: u64,
}

impl ChannelControlRegister {
    /// Creates a register with all fields cleared.
    ///
    /// The profile width comes from a resolved layout, so the packed word
    /// always fits.
    pub fn new(layout: &BusLayout) -> Self {
        Self {
            layout: *layout,
            word: 0,
        }
    }

    /// Width of the packed control word.
    pub fn width(&self) -> u32 {
        self.layout.ctrl_width()
    }

    /// Strobe toward the channel; follows the write strobe combinationally.
    pub fn strobe(&self, input: &CtrlInput) -> bool {
        input.stb
    }

    /// Applies a bus clock edge.
    pub fn clock(&mut self, input: &CtrlInput) {
        if input.stb {
            self.word = input.data & mask(self.width());
        }
    }

    /// The current control fields.
    pub fn ctrl(&self) -> ChannelCtrl {
        ChannelCtrl::unpack(self.word, &self.layout)
    }

    /// The current packed word.
    pub fn word(&self) -> u64 {
        self.word
    }

    /// Returns the register to its reset value.
    pub fn reset(&mut self) {
        self.word = 0;
    }
}
