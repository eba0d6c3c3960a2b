//! Simulation time and the two clock domains of the servo interface.
//!
//! [`SimTime`] is an absolute instant in femtoseconds. [`ClockDomain`]
//! describes a periodic rising edge, and [`EdgeSchedule`] merges the bus
//! domain and the config domain into one time-ordered edge stream.

use rtservo_common::Frequency;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Femtoseconds per picosecond.
pub const FS_PER_PS: u64 = 1_000;
/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u64 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u64 = 1_000_000_000;

/// An absolute simulation instant with femtosecond resolution.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SimTime {
    /// Time in femtoseconds since the first edge of the schedule.
    pub fs: u64,
}

impl SimTime {
    /// Time zero.
    pub fn zero() -> Self {
        Self { fs: 0 }
    }

    /// Creates a time from femtoseconds.
    pub fn from_fs(fs: u64) -> Self {
        Self { fs }
    }

    /// Creates a time from nanoseconds.
    pub fn from_ns(ns: u64) -> Self {
        Self { fs: ns * FS_PER_NS }
    }

    /// Converts to nanoseconds (truncated).
    pub fn to_ns(&self) -> u64 {
        self.fs / FS_PER_NS
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fs = self.fs;
        if fs == 0 {
            write!(f, "0 fs")
        } else if fs >= FS_PER_US && fs % FS_PER_US == 0 {
            write!(f, "{} us", fs / FS_PER_US)
        } else if fs >= FS_PER_NS && fs % FS_PER_NS == 0 {
            write!(f, "{} ns", fs / FS_PER_NS)
        } else if fs >= FS_PER_PS && fs % FS_PER_PS == 0 {
            write!(f, "{} ps", fs / FS_PER_PS)
        } else {
            write!(f, "{fs} fs")
        }
    }
}

/// Which clock an edge belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// The bus clock: read/write pipeline, memories, control registers.
    Bus,
    /// The config register clock.
    Config,
}

/// A periodic rising-edge clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockDomain {
    /// Edge spacing in femtoseconds, always nonzero.
    period_fs: u64,
    /// Time of edge 0.
    phase_fs: u64,
}

impl ClockDomain {
    /// Creates a clock from a period and the time of its first edge.
    ///
    /// Returns `None` for a zero period.
    pub fn new(period_fs: u64, phase_fs: u64) -> Option<Self> {
        (period_fs > 0).then_some(Self {
            period_fs,
            phase_fs,
        })
    }

    /// Creates a clock from a frequency. Returns `None` for 0 Hz.
    pub fn from_frequency(freq: Frequency, phase_fs: u64) -> Option<Self> {
        Self::new(freq.period_fs()?, phase_fs)
    }

    /// Edge spacing in femtoseconds.
    pub fn period_fs(&self) -> u64 {
        self.period_fs
    }

    /// Time of the `n`th edge.
    pub fn edge(&self, n: u64) -> SimTime {
        SimTime::from_fs(self.phase_fs + n * self.period_fs)
    }
}

/// One clock edge in the merged schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    /// When the edge occurs.
    pub time: SimTime,
    /// Which domain is clocked.
    pub domain: Domain,
    /// Edge count within its own domain, starting at 0.
    pub index: u64,
}

/// Merges the bus and config clocks into a time-ordered, unbounded stream.
///
/// Coincident edges yield the config edge first: the config domain samples
/// the cross-domain register as it stood before the simultaneous bus edge.
#[derive(Clone, Debug)]
pub struct EdgeSchedule {
    bus: ClockDomain,
    config: ClockDomain,
    next_bus: u64,
    next_config: u64,
}

impl EdgeSchedule {
    /// Creates a schedule starting at edge 0 of both domains.
    pub fn new(bus: ClockDomain, config: ClockDomain) -> Self {
        Self {
            bus,
            config,
            next_bus: 0,
            next_config: 0,
        }
    }

    /// Returns the bus clock.
    pub fn bus(&self) -> &ClockDomain {
        &self.bus
    }

    /// Returns the config clock.
    pub fn config(&self) -> &ClockDomain {
        &self.config
    }
}

impl EdgeSchedule {
    /// The next edge, without consuming it.
    pub fn peek(&self) -> Edge {
        let bus_time = self.bus.edge(self.next_bus);
        let config_time = self.config.edge(self.next_config);
        if config_time <= bus_time {
            Edge {
                time: config_time,
                domain: Domain::Config,
                index: self.next_config,
            }
        } else {
            Edge {
                time: bus_time,
                domain: Domain::Bus,
                index: self.next_bus,
            }
        }
    }

    /// Consumes and returns the next edge.
    pub fn advance(&mut self) -> Edge {
        let edge = self.peek();
        match edge.domain {
            Domain::Config => self.next_config += 1,
            Domain::Bus => self.next_bus += 1,
        }
        edge
    }
}

impl Iterator for EdgeSchedule {
    type Item = Edge;

    fn next(&mut self) -> Option<Edge> {
        Some(self.advance())
    }
}
