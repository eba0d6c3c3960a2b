//! Stimulus-driven runs of the servo interface on its two clocks.
//!
//! A [`Testbench`] walks the merged edge schedule, applying config edges
//! as they come and one stimulus cycle per bus edge. Read responses are
//! matched to their requests and checked against optional expectations.

use std::fmt;

use rtservo_config::{ConfigError, ServoConfig};
use serde::{Deserialize, Serialize};

use crate::address::{Half, Request, Target};
use crate::ctrl::{ChannelCtrl, CtrlInput};
use crate::error::SimError;
use crate::mem_bus::{BusInput, Status};
use crate::phy::{CycleOutput, PhyInput, ServoPhy};
use crate::time::{ClockDomain, Domain, EdgeSchedule, SimTime, FS_PER_NS};
use crate::waveform::{TraceId, WaveformRecorder};

/// Which slot a stimulus addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// Coefficient memory.
    Coeff,
    /// Exposed bits of the state memory.
    State,
    /// Config register on write, status register on read.
    Config,
}

impl Slot {
    /// Builds the bus target. `addr` and `half` are ignored where the slot
    /// has no use for them.
    pub fn target(self, addr: u32, half: Half) -> Target {
        match self {
            Slot::Coeff => Target::Coeff { addr, half },
            Slot::State => Target::State { addr },
            Slot::Config => Target::ConfigStatus,
        }
    }
}

fn low() -> Half {
    Half::Low
}

/// One testbench step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Stimulus {
    /// A one-cycle bus write.
    Write {
        /// Addressed slot.
        target: Slot,
        /// Memory address.
        #[serde(default)]
        addr: u32,
        /// Coefficient half.
        #[serde(default = "low")]
        half: Half,
        /// Write data.
        data: u64,
    },
    /// A one-cycle bus read, optionally checked on response.
    Read {
        /// Addressed slot.
        target: Slot,
        /// Memory address.
        #[serde(default)]
        addr: u32,
        /// Coefficient half.
        #[serde(default = "low")]
        half: Half,
        /// Expected response data.
        #[serde(default)]
        expect: Option<u64>,
    },
    /// A one-cycle control write to one channel.
    Ctrl {
        /// Channel index.
        channel: u32,
        /// Profile field.
        #[serde(default)]
        profile: u32,
        /// Output enable.
        #[serde(default)]
        en_out: bool,
        /// IIR enable.
        #[serde(default)]
        en_iir: bool,
    },
    /// Idle bus cycles.
    Idle {
        /// Number of cycles.
        cycles: u32,
    },
    /// Drives the engine `done` flag; consumes no cycle.
    SetDone {
        /// New `done` value.
        done: bool,
    },
    /// Idles the bus until the next config edge has been applied.
    SyncConfig,
}

/// A read response as observed on the read channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ReadResponse {
    /// Index of the stimulus that issued the read.
    pub step: usize,
    /// Bus cycle of the response.
    pub cycle: u64,
    /// Time of the bus edge closing the response cycle.
    pub time: SimTime,
    /// What was read.
    pub target: Target,
    /// Response data.
    pub data: u64,
}

/// A read whose response differed from its expectation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    /// Index of the stimulus that issued the read.
    pub step: usize,
    /// Bus cycle of the response.
    pub cycle: u64,
    /// What was read.
    pub target: Target,
    /// Expected data.
    pub expected: u64,
    /// Observed data.
    pub actual: u64,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step {} (cycle {}): read {} returned {:#x}, expected {:#x}",
            self.step,
            self.cycle,
            describe(&self.target),
            self.actual,
            self.expected
        )
    }
}

fn describe(target: &Target) -> String {
    match target {
        Target::Coeff { addr, half } => match half {
            Half::Low => format!("coeff[{addr}].low"),
            Half::High => format!("coeff[{addr}].high"),
        },
        Target::State { addr } => format!("state[{addr}]"),
        Target::ConfigStatus => "status".to_string(),
    }
}

/// Outcome of a testbench run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SimResult {
    /// Read responses in the order they arrived.
    pub responses: Vec<ReadResponse>,
    /// Failed expectations.
    pub failures: Vec<Mismatch>,
    /// Bus cycles executed.
    pub cycles: u64,
    /// Config edges applied.
    pub config_edges: u64,
    /// Time of the last applied edge.
    pub final_time: SimTime,
    /// Status register after the last cycle.
    pub status: Status,
    /// Final control word of every channel.
    pub channels: Vec<ChannelCtrl>,
}

impl SimResult {
    /// True if every expectation held.
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

struct InFlight {
    step: usize,
    target: Target,
    expect: Option<u64>,
}

struct TraceIds {
    address: TraceId,
    data: TraceId,
    stb: TraceId,
    busy: TraceId,
    rd_stb: TraceId,
    rd_data: TraceId,
    coeff_we: [TraceId; 2],
    state_we: TraceId,
    config: TraceId,
    status: TraceId,
    ctrl_stb: Vec<TraceId>,
}

impl TraceIds {
    fn register(recorder: &mut dyn WaveformRecorder, phy: &ServoPhy) -> Result<Self, SimError> {
        let layout = *phy.layout();
        let mut next = 0;
        recorder.begin_scope("servo")?;
        let ids = Self {
            address: add_signal(recorder, &mut next, "address", layout.address_width())?,
            data: add_signal(recorder, &mut next, "data", layout.data_width())?,
            stb: add_signal(recorder, &mut next, "stb", 1)?,
            busy: add_signal(recorder, &mut next, "busy", 1)?,
            rd_stb: add_signal(recorder, &mut next, "rd_stb", 1)?,
            rd_data: add_signal(recorder, &mut next, "rd_data", layout.data_width())?,
            coeff_we: [
                add_signal(recorder, &mut next, "coeff_we_low", 1)?,
                add_signal(recorder, &mut next, "coeff_we_high", 1)?,
            ],
            state_we: add_signal(recorder, &mut next, "state_we", 1)?,
            config: add_signal(recorder, &mut next, "config", 1)?,
            status: add_signal(recorder, &mut next, "status", 2)?,
            ctrl_stb: {
                let mut ids = Vec::new();
                for ch in 0..phy.channel_count() {
                    ids.push(add_signal(recorder, &mut next, &format!("ctrl{ch}_stb"), 1)?);
                }
                ids
            },
        };
        recorder.end_scope()?;
        Ok(ids)
    }
}

fn add_signal(
    recorder: &mut dyn WaveformRecorder,
    next: &mut u32,
    name: &str,
    width: u32,
) -> Result<TraceId, SimError> {
    let id = TraceId::from_raw(*next);
    *next += 1;
    recorder.register_signal(id, name, width)?;
    Ok(id)
}

/// Drives a [`ServoPhy`] from a stimulus list on a two-clock schedule.
pub struct Testbench {
    phy: ServoPhy,
    schedule: EdgeSchedule,
    recorder: Option<(Box<dyn WaveformRecorder>, TraceIds)>,
    in_flight: Option<InFlight>,
    responses: Vec<ReadResponse>,
    failures: Vec<Mismatch>,
    config_edges: u64,
    now: SimTime,
}

impl Testbench {
    /// Creates a testbench around `phy`.
    pub fn new(phy: ServoPhy, schedule: EdgeSchedule) -> Self {
        Self {
            phy,
            schedule,
            recorder: None,
            in_flight: None,
            responses: Vec::new(),
            failures: Vec::new(),
            config_edges: 0,
            now: SimTime::zero(),
        }
    }

    /// Builds the interface and its clocks from a configuration.
    pub fn from_config(config: &ServoConfig) -> Result<Self, SimError> {
        let phy = ServoPhy::from_config(config)?;
        let schedule = schedule_for(config)?;
        Ok(Self::new(phy, schedule))
    }

    /// Attaches a waveform recorder and registers the traced signals.
    pub fn set_recorder(
        &mut self,
        mut recorder: Box<dyn WaveformRecorder>,
    ) -> Result<(), SimError> {
        let ids = TraceIds::register(recorder.as_mut(), &self.phy)?;
        self.recorder = Some((recorder, ids));
        Ok(())
    }

    /// The interface under test.
    pub fn phy(&self) -> &ServoPhy {
        &self.phy
    }

    /// Mutable access to the interface, e.g. to preload memories.
    pub fn phy_mut(&mut self) -> &mut ServoPhy {
        &mut self.phy
    }

    /// Runs every stimulus in order, then one extra idle cycle if a read
    /// response is still outstanding.
    pub fn run(&mut self, stimuli: &[Stimulus]) -> Result<SimResult, SimError> {
        for (step, stimulus) in stimuli.iter().enumerate() {
            self.apply(step, stimulus)?;
        }
        if self.in_flight.is_some() {
            self.bus_cycle(&PhyInput::idle())?;
        }
        if let Some((recorder, _)) = self.recorder.as_mut() {
            recorder.finalize()?;
        }

        Ok(SimResult {
            responses: std::mem::take(&mut self.responses),
            failures: std::mem::take(&mut self.failures),
            cycles: self.phy.cycles(),
            config_edges: self.config_edges,
            final_time: self.now,
            status: self.phy.status(),
            channels: (0..self.phy.channel_count())
                .map(|ch| self.phy.channel(ch))
                .collect::<Result<_, _>>()?,
        })
    }

    fn apply(&mut self, step: usize, stimulus: &Stimulus) -> Result<(), SimError> {
        let layout = *self.phy.layout();
        match *stimulus {
            Stimulus::Write {
                target,
                addr,
                half,
                data,
            } => {
                let request = Request::write(target.target(addr, half));
                self.bus_cycle(&PhyInput::bus(BusInput::request(&layout, request, data)))
            }
            Stimulus::Read {
                target,
                addr,
                half,
                expect,
            } => {
                let target = target.target(addr, half);
                let input = PhyInput::bus(BusInput::request(&layout, Request::read(target), 0));
                self.bus_cycle(&input)?;
                self.in_flight = Some(InFlight {
                    step,
                    target,
                    expect,
                });
                Ok(())
            }
            Stimulus::Ctrl {
                channel,
                profile,
                en_out,
                en_iir,
            } => {
                let count = self.phy.channel_count();
                if channel >= count {
                    return Err(SimError::ChannelOutOfRange { channel, count });
                }
                let mut ctrl = vec![CtrlInput::idle(); channel as usize + 1];
                ctrl[channel as usize] = CtrlInput::write(
                    ChannelCtrl {
                        profile,
                        en_out,
                        en_iir,
                    },
                    &layout,
                );
                self.bus_cycle(&PhyInput {
                    bus: BusInput::idle(),
                    ctrl,
                })
            }
            Stimulus::Idle { cycles } => {
                for _ in 0..cycles {
                    self.bus_cycle(&PhyInput::idle())?;
                }
                Ok(())
            }
            Stimulus::SetDone { done } => self.phy.set_done(done),
            Stimulus::SyncConfig => {
                while self.schedule.peek().domain == Domain::Bus {
                    self.bus_cycle(&PhyInput::idle())?;
                }
                self.config_edge()
            }
        }
    }

    fn config_edge(&mut self) -> Result<(), SimError> {
        let edge = self.schedule.advance();
        self.now = edge.time;
        self.phy.config_edge();
        self.config_edges += 1;
        let start = self.phy.status().start;
        if let Some((recorder, ids)) = self.recorder.as_mut() {
            recorder.record(edge.time, ids.config, u64::from(start))?;
        }
        Ok(())
    }

    /// Applies pending config edges, then one bus cycle closed by the next
    /// bus edge.
    fn bus_cycle(&mut self, input: &PhyInput) -> Result<(), SimError> {
        while self.schedule.peek().domain == Domain::Config {
            self.config_edge()?;
        }
        let edge = self.schedule.advance();
        self.now = edge.time;
        let cycle = self.phy.cycles();
        let out = self.phy.cycle(input);

        if out.bus.stb {
            if let Some(read) = self.in_flight.take() {
                self.responses.push(ReadResponse {
                    step: read.step,
                    cycle,
                    time: edge.time,
                    target: read.target,
                    data: out.bus.data,
                });
                if let Some(expected) = read.expect.filter(|e| *e != out.bus.data) {
                    self.failures.push(Mismatch {
                        step: read.step,
                        cycle,
                        target: read.target,
                        expected,
                        actual: out.bus.data,
                    });
                }
            }
        }
        self.in_flight = None;

        self.trace(edge.time, input, &out)
    }

    fn trace(&mut self, time: SimTime, input: &PhyInput, out: &CycleOutput) -> Result<(), SimError> {
        let Some((recorder, ids)) = self.recorder.as_mut() else {
            return Ok(());
        };
        let values = [
            (ids.address, input.bus.address),
            (ids.data, input.bus.data),
            (ids.stb, u64::from(input.bus.stb)),
            (ids.busy, u64::from(out.bus.busy)),
            (ids.rd_stb, u64::from(out.bus.stb)),
            (ids.rd_data, out.bus.data),
            (ids.coeff_we[0], u64::from(out.drive.coeff.we[0])),
            (ids.coeff_we[1], u64::from(out.drive.coeff.we[1])),
            (ids.state_we, u64::from(out.drive.state.we)),
            (ids.status, out.status.bits()),
        ];
        for (id, value) in values {
            recorder.record(time, id, value)?;
        }
        for (id, stb) in ids.ctrl_stb.iter().zip(&out.ctrl_stb) {
            recorder.record(time, *id, u64::from(*stb))?;
        }
        Ok(())
    }
}

/// Builds the two-clock schedule for a configuration.
pub fn schedule_for(config: &ServoConfig) -> Result<EdgeSchedule, SimError> {
    let clocks = &config.clocks;
    let phase = clocks.config_phase_ns.saturating_mul(FS_PER_NS);
    let bus = ClockDomain::from_frequency(clocks.bus_frequency()?, 0).ok_or_else(|| {
        ConfigError::InvalidFrequency {
            field: "clocks.bus",
            value: clocks.bus.clone(),
        }
    })?;
    let cfg = ClockDomain::from_frequency(clocks.config_frequency()?, phase).ok_or_else(|| {
        ConfigError::InvalidFrequency {
            field: "clocks.config",
            value: clocks.config.clone(),
        }
    })?;
    Ok(EdgeSchedule::new(bus, cfg))
}
