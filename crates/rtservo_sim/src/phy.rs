//! The complete servo register interface: memory bus, backing memories,
//! engine handshake and the per-channel control registers.

use rtservo_config::{validate_config, BusLayout, ServoConfig};

use crate::ctrl::{ChannelControlRegister, ChannelCtrl, CtrlInput};
use crate::engine::{Engine, ManualEngine, PeriodicEngine};
use crate::error::SimError;
use crate::mem_bus::{BusInput, BusOutput, PortDrive, ServoMemoryBus, Status};
use crate::memory::BlockRam;

/// Inputs for one bus clock cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PhyInput {
    /// Memory bus write channel.
    pub bus: BusInput,
    /// Control bus of each channel, indexed by channel. Missing entries are
    /// idle.
    pub ctrl: Vec<CtrlInput>,
}

impl PhyInput {
    /// A cycle with no activity on any bus.
    pub fn idle() -> Self {
        Self::default()
    }

    /// A cycle carrying only a memory bus request.
    pub fn bus(bus: BusInput) -> Self {
        Self {
            bus,
            ctrl: Vec::new(),
        }
    }
}

/// Combinational outputs observed during one bus clock cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleOutput {
    /// Read channel and busy.
    pub bus: BusOutput,
    /// Memory port and config hand-off signals.
    pub drive: PortDrive,
    /// Per-channel control strobes.
    pub ctrl_stb: Vec<bool>,
    /// Status value during the cycle.
    pub status: Status,
}

/// The servo interface with its memories and engine.
pub struct ServoPhy {
    bus: ServoMemoryBus,
    coeff: BlockRam,
    state: BlockRam,
    engine: Box<dyn Engine>,
    channels: Vec<ChannelControlRegister>,
    cycles: u64,
}

impl ServoPhy {
    /// Creates an interface with `channels` control registers.
    pub fn new(layout: BusLayout, channels: u32, engine: Box<dyn Engine>) -> Self {
        Self {
            bus: ServoMemoryBus::new(layout),
            coeff: BlockRam::new(layout.coeff_storage_width(), layout.coeff_addr_width()),
            state: BlockRam::new(layout.state_width(), layout.state_addr_width()),
            engine,
            channels: (0..channels)
                .map(|_| ChannelControlRegister::new(&layout))
                .collect(),
            cycles: 0,
        }
    }

    /// Builds an interface from a loaded configuration.
    ///
    /// An engine period of 0 attaches a [`ManualEngine`], anything else a
    /// [`PeriodicEngine`].
    pub fn from_config(config: &ServoConfig) -> Result<Self, SimError> {
        validate_config(config)?;
        let layout = BusLayout::resolve(&config.widths)?;
        let engine: Box<dyn Engine> = match config.engine.period {
            0 => Box::new(ManualEngine::new()),
            period => Box::new(PeriodicEngine::new(period)),
        };
        Ok(Self::new(layout, config.channels, engine))
    }

    /// The bus geometry.
    pub fn layout(&self) -> &BusLayout {
        self.bus.layout()
    }

    /// The memory bus.
    pub fn bus(&self) -> &ServoMemoryBus {
        &self.bus
    }

    /// The coefficient memory.
    pub fn coeff(&self) -> &BlockRam {
        &self.coeff
    }

    /// Engine-side access to the coefficient memory.
    pub fn coeff_mut(&mut self) -> &mut BlockRam {
        &mut self.coeff
    }

    /// The state memory.
    pub fn state(&self) -> &BlockRam {
        &self.state
    }

    /// Engine-side access to the state memory.
    pub fn state_mut(&mut self) -> &mut BlockRam {
        &mut self.state
    }

    /// Drives the engine `done` flag from outside.
    pub fn set_done(&mut self, done: bool) -> Result<(), SimError> {
        if self.engine.force_done(done) {
            Ok(())
        } else {
            Err(SimError::EngineNotManual)
        }
    }

    /// Current status value.
    pub fn status(&self) -> Status {
        self.bus.status(self.engine.done())
    }

    /// Number of control channels.
    pub fn channel_count(&self) -> u32 {
        self.channels.len() as u32
    }

    /// Current control word of `channel`.
    pub fn channel(&self, channel: u32) -> Result<ChannelCtrl, SimError> {
        self.channels
            .get(channel as usize)
            .map(ChannelControlRegister::ctrl)
            .ok_or(SimError::ChannelOutOfRange {
                channel,
                count: self.channel_count(),
            })
    }

    /// Bus clock cycles executed since reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Evaluates one bus clock cycle and applies its closing edge.
    pub fn cycle(&mut self, input: &PhyInput) -> CycleOutput {
        let status = self.status();
        let ctrl_input = |i: usize| input.ctrl.get(i).copied().unwrap_or_default();

        let output = CycleOutput {
            bus: self.bus.output(status),
            drive: self.bus.drive(&input.bus),
            ctrl_stb: self
                .channels
                .iter()
                .enumerate()
                .map(|(i, reg)| reg.strobe(&ctrl_input(i)))
                .collect(),
            status,
        };

        self.bus
            .clock(&input.bus, &mut self.coeff, &mut self.state);
        for (i, reg) in self.channels.iter_mut().enumerate() {
            reg.clock(&ctrl_input(i));
        }
        self.engine.clock(status.start);
        self.cycles += 1;
        output
    }

    /// Applies a config clock edge. Returns true if `start` changed.
    pub fn config_edge(&mut self) -> bool {
        self.bus.clock_config()
    }

    /// Returns registers and engine to their reset state.
    ///
    /// Block RAM is not part of the reset domain and keeps its contents;
    /// use [`BlockRam::clear`] through `coeff_mut`/`state_mut` to wipe it.
    pub fn reset(&mut self) {
        self.bus.reset();
        self.engine.reset();
        for reg in &mut self.channels {
            reg.reset();
        }
        self.cycles = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Half, Request, Target};
    use crate::memory::MemoryPort;

    fn phy(period: u32) -> ServoPhy {
        let mut config = ServoConfig::default();
        config.channels = 2;
        config.engine.period = period;
        ServoPhy::from_config(&config).unwrap()
    }

    fn bus_req(phy: &ServoPhy, request: Request, data: u64) -> PhyInput {
        PhyInput::bus(BusInput::request(phy.layout(), request, data))
    }

    #[test]
    fn memories_sized_from_layout() {
        let p = phy(0);
        assert_eq!(p.coeff().width(), 36);
        assert_eq!(p.coeff().depth(), 1 << 10);
        assert_eq!(p.state().width(), 25);
        assert_eq!(p.state().depth(), 1 << 9);
        assert_eq!(p.channel_count(), 2);
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = ServoConfig::default();
        config.widths.state = 10;
        assert!(matches!(
            ServoPhy::from_config(&config),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn huge_channel_count_rejected_before_allocation() {
        let mut config = ServoConfig::default();
        config.channels = u32::MAX;
        assert!(matches!(
            ServoPhy::from_config(&config),
            Err(SimError::Config(
                rtservo_config::ConfigError::TooManyChannels { .. }
            ))
        ));
    }

    #[test]
    fn ctrl_write_strobes_and_loads_one_channel() {
        let mut p = phy(0);
        let ctrl = ChannelCtrl {
            profile: 9,
            en_out: true,
            en_iir: true,
        };
        let input = PhyInput {
            bus: BusInput::idle(),
            ctrl: vec![CtrlInput::idle(), CtrlInput::write(ctrl, p.layout())],
        };
        let out = p.cycle(&input);
        assert_eq!(out.ctrl_stb, vec![false, true]);
        assert_eq!(p.channel(1).unwrap(), ctrl);
        assert_eq!(p.channel(0).unwrap(), ChannelCtrl::default());
    }

    #[test]
    fn unknown_channel_errors() {
        let p = phy(0);
        assert!(matches!(
            p.channel(5),
            Err(SimError::ChannelOutOfRange {
                channel: 5,
                count: 2
            })
        ));
    }

    #[test]
    fn manual_done_appears_in_status() {
        let mut p = phy(0);
        p.set_done(true).unwrap();
        assert!(p.status().done);
        assert!(!p.status().start);
    }

    #[test]
    fn periodic_engine_refuses_manual_done() {
        let mut p = phy(4);
        assert!(matches!(p.set_done(true), Err(SimError::EngineNotManual)));
    }

    #[test]
    fn start_runs_periodic_engine() {
        let mut p = phy(2);
        let input = bus_req(&p, Request::write(Target::ConfigStatus), 1);
        p.cycle(&input);
        p.config_edge();
        assert!(p.status().start);
        let done: Vec<_> = (0..4)
            .map(|_| {
                p.cycle(&PhyInput::idle());
                p.status().done
            })
            .collect();
        assert_eq!(done, vec![false, true, false, true]);
    }

    #[test]
    fn engine_writes_do_not_disturb_pipeline() {
        let mut p = phy(0);
        let write = bus_req(
            &p,
            Request::write(Target::Coeff {
                addr: 7,
                half: Half::High,
            }),
            0x1234,
        );
        p.cycle(&write);
        p.state_mut().poke(1, 0x155);
        let read = bus_req(
            &p,
            Request::read(Target::Coeff {
                addr: 7,
                half: Half::High,
            }),
            0,
        );
        p.cycle(&read);
        let out = p.cycle(&PhyInput::idle());
        assert!(out.bus.stb);
        assert_eq!(out.bus.data, 0x1234);
        assert_eq!(p.state().read(1), 0x155);
    }

    #[test]
    fn reset_clears_registers_keeps_memories() {
        let mut p = phy(0);
        let input = bus_req(
            &p,
            Request::write(Target::Coeff {
                addr: 1,
                half: Half::Low,
            }),
            3,
        );
        p.cycle(&input);
        let input = bus_req(&p, Request::write(Target::State { addr: 2 }), 0x155);
        p.cycle(&input);
        let input = bus_req(&p, Request::write(Target::ConfigStatus), 1);
        p.cycle(&input);
        p.config_edge();
        let ctrl = ChannelCtrl {
            profile: 2,
            en_out: true,
            en_iir: false,
        };
        p.cycle(&PhyInput {
            bus: BusInput::idle(),
            ctrl: vec![CtrlInput::write(ctrl, p.layout())],
        });
        p.set_done(true).unwrap();
        assert!(p.status().start);
        let state_before = p.state().words().to_vec();
        assert_ne!(state_before[2], 0);

        p.reset();
        assert_eq!(p.cycles(), 0);
        assert!(!p.status().done);
        assert!(!p.status().start);
        assert_eq!(p.channel(0).unwrap(), ChannelCtrl::default());
        assert_eq!(p.coeff().read(1), 3);
        assert_eq!(p.state().words(), &state_before[..]);

        p.coeff_mut().clear();
        assert_eq!(p.coeff().read(1), 0);
    }
}
