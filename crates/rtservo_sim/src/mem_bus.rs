//! The servo memory bus: one write channel and one read channel in front of
//! the coefficient memory, the state memory, the config register and the
//! status register.
//!
//! Each bus cycle is evaluated in two phases, as synchronous logic would be:
//!
//! 1. Combinational: [`ServoMemoryBus::drive`] computes the memory port
//!    signals for the current input, [`ServoMemoryBus::output`] computes the
//!    read channel from the read captured on the previous edge.
//! 2. Edge: [`ServoMemoryBus::clock`] commits writes, samples the memory read
//!    ports and re-arms or clears the pending read.
//!
//! The config register is clocked separately by
//! [`ServoMemoryBus::clock_config`].

use rtservo_common::mask;
use rtservo_config::{BusLayout, ConfigError, Widths};
use serde::{Deserialize, Serialize};

use crate::address::{Access, Half, Request, Target};
use crate::cdc::ConfigRegister;
use crate::memory::MemoryPort;

/// One cycle of the write channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusInput {
    /// Raw bus address.
    pub address: u64,
    /// Write data, `coeff` bits.
    pub data: u64,
    /// Request strobe.
    pub stb: bool,
}

impl BusInput {
    /// A cycle with no request.
    pub fn idle() -> Self {
        Self::default()
    }

    /// A strobed cycle carrying `request`.
    pub fn request(layout: &BusLayout, request: Request, data: u64) -> Self {
        Self {
            address: request.encode(layout),
            data,
            stb: true,
        }
    }
}

/// One cycle of the read channel plus the write channel's flow control.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusOutput {
    /// Read response strobe.
    pub stb: bool,
    /// Read response data, `coeff` bits. Zero when `stb` is low.
    pub data: u64,
    /// Write channel backpressure; never asserted.
    pub busy: bool,
}

/// The engine handshake flags as exposed on the status register.
///
/// Bit 0 is `start`, bit 1 is `done`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Engine start, mirrored from the config register.
    pub start: bool,
    /// Engine done.
    pub done: bool,
}

impl Status {
    /// Status bit carrying `start`.
    pub const START_BIT: u32 = 0;
    /// Status bit carrying `done`.
    pub const DONE_BIT: u32 = 1;

    /// Packs the flags into the 2-bit status value.
    pub fn bits(&self) -> u64 {
        (u64::from(self.start) << Self::START_BIT) | (u64::from(self.done) << Self::DONE_BIT)
    }

    /// Unpacks a status value read from the bus.
    pub fn from_bits(bits: u64) -> Self {
        Self {
            start: (bits >> Self::START_BIT) & 1 != 0,
            done: (bits >> Self::DONE_BIT) & 1 != 0,
        }
    }
}

/// Signals driven onto the coefficient memory port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CoeffDrive {
    /// Memory address.
    pub addr: u32,
    /// Write data: the bus data replicated into both halves.
    pub dat_w: u64,
    /// Half write-enables, `[low, high]`.
    pub we: [bool; 2],
}

impl CoeffDrive {
    /// Bit mask of the storage word selected by the asserted enables.
    pub fn bit_mask(&self, layout: &BusLayout) -> u64 {
        let mut m = 0;
        if self.we[0] {
            m |= layout.coeff_half_field(false).mask();
        }
        if self.we[1] {
            m |= layout.coeff_half_field(true).mask();
        }
        m
    }
}

/// Signals driven onto the state memory port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StateDrive {
    /// Memory address.
    pub addr: u32,
    /// Write data, bus data in the top `coeff` bits.
    pub dat_w: u64,
    /// Write enable.
    pub we: bool,
    /// Bits of the state word this interface may write.
    pub bit_mask: u64,
}

/// Everything the write path drives in one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PortDrive {
    /// Coefficient memory port.
    pub coeff: CoeffDrive,
    /// State memory port.
    pub state: StateDrive,
    /// Config bit handed to the config domain, if this is a config write.
    pub config: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReadSelect {
    Coeff(Half),
    State,
    Status,
}

/// Read accepted on the last edge, answered in the current cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingRead {
    select: ReadSelect,
    /// Memory read port word sampled on the request edge.
    word: u64,
}

/// Address-decoded bridge between the bus and the servo memories.
#[derive(Clone, Debug)]
pub struct ServoMemoryBus {
    layout: BusLayout,
    pending: Option<PendingRead>,
    config: ConfigRegister,
}

impl ServoMemoryBus {
    /// Creates a bus in its reset state.
    pub fn new(layout: BusLayout) -> Self {
        Self {
            layout,
            pending: None,
            config: ConfigRegister::new(),
        }
    }

    /// Resolves `widths` and creates a bus. Fails for widths that do not
    /// elaborate.
    pub fn from_widths(widths: &Widths) -> Result<Self, ConfigError> {
        Ok(Self::new(BusLayout::resolve(widths)?))
    }

    /// The bus geometry.
    pub fn layout(&self) -> &BusLayout {
        &self.layout
    }

    /// Write-path signals for `input`. Pure; nothing is committed.
    pub fn drive(&self, input: &BusInput) -> PortDrive {
        let layout = &self.layout;
        let data = input.data & mask(layout.data_width());
        let exposed = layout.state_exposed_field();

        let mut drive = PortDrive {
            coeff: CoeffDrive {
                addr: layout.coeff_addr_field().extract(input.address) as u32,
                dat_w: layout
                    .coeff_half_field(true)
                    .insert(layout.coeff_half_field(false).insert(0, data), data),
                we: [false; 2],
            },
            state: StateDrive {
                addr: layout.state_addr_field().extract(input.address) as u32,
                dat_w: exposed.insert(0, data),
                we: false,
                bit_mask: exposed.mask(),
            },
            config: None,
        };

        if !input.stb {
            return drive;
        }
        let request = Request::decode(layout, input.address);
        if request.access == Access::Write {
            match request.target {
                Target::Coeff { half, .. } => drive.coeff.we[half.index()] = true,
                Target::State { .. } => drive.state.we = true,
                Target::ConfigStatus => drive.config = Some(data & 1 != 0),
            }
        }
        drive
    }

    /// Read channel for the current cycle.
    ///
    /// `status` is the live engine handshake; it is only consulted when the
    /// pending read targets the status register.
    pub fn output(&self, status: Status) -> BusOutput {
        let Some(pending) = self.pending else {
            return BusOutput::default();
        };
        let layout = &self.layout;
        let data = match pending.select {
            ReadSelect::Coeff(half) => layout.coeff_half_field(half.is_high()).extract(pending.word),
            ReadSelect::State => layout.state_exposed_field().extract(pending.word),
            ReadSelect::Status => status.bits(),
        };
        BusOutput {
            stb: true,
            data,
            busy: false,
        }
    }

    /// Engine `start`, driven by the config register.
    pub fn start(&self) -> bool {
        self.config.value()
    }

    /// The status value for the given engine `done`.
    pub fn status(&self, done: bool) -> Status {
        Status {
            start: self.start(),
            done,
        }
    }

    /// True if a read was accepted on the last edge and answers this cycle.
    pub fn read_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The config register, including any value still crossing domains.
    pub fn config_register(&self) -> &ConfigRegister {
        &self.config
    }

    /// Applies a bus clock edge.
    pub fn clock<C, S>(&mut self, input: &BusInput, coeff: &mut C, state: &mut S)
    where
        C: MemoryPort + ?Sized,
        S: MemoryPort + ?Sized,
    {
        let drive = self.drive(input);

        self.pending = if input.stb {
            let request = Request::decode(&self.layout, input.address);
            match (request.access, request.target) {
                (Access::Read, Target::Coeff { addr, half }) => Some(PendingRead {
                    select: ReadSelect::Coeff(half),
                    word: coeff.read(addr),
                }),
                (Access::Read, Target::State { addr }) => Some(PendingRead {
                    select: ReadSelect::State,
                    word: state.read(addr),
                }),
                (Access::Read, Target::ConfigStatus) => Some(PendingRead {
                    select: ReadSelect::Status,
                    word: 0,
                }),
                (Access::Write, _) => None,
            }
        } else {
            None
        };

        if drive.coeff.we.iter().any(|&we| we) {
            coeff.write(
                drive.coeff.addr,
                drive.coeff.dat_w,
                drive.coeff.bit_mask(&self.layout),
            );
        }
        if drive.state.we {
            state.write(drive.state.addr, drive.state.dat_w, drive.state.bit_mask);
        }
        if let Some(bit) = drive.config {
            self.config.request(bit);
        }
    }

    /// Applies a config clock edge. Returns true if `start` changed.
    pub fn clock_config(&mut self) -> bool {
        self.config.clock()
    }

    /// Returns every register to its reset value.
    pub fn reset(&mut self) {
        self.pending = None;
        self.config.reset();
    }
}
