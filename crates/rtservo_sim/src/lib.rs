//! Cycle-accurate model of the servo RTIO register interface.
//!
//! The interface sits between a real-time I/O bus and a servo engine. It
//! exposes a coefficient memory, a state memory, a one-bit config register
//! clocked from a second domain and a status register through one address
//! space with single-cycle writes and reads answered exactly one cycle
//! later. Each servo channel additionally has a write-only control register.
//!
//! # Architecture
//!
//! Every clocked block splits into a combinational half (outputs computed
//! from current inputs and registers) and an edge half (`clock`). A
//! [`ServoPhy`] composes the memory bus, two [`BlockRam`]s, an [`Engine`]
//! and the control registers. The [`Testbench`] drives it from a
//! [`Stimulus`] list on the merged bus/config [`EdgeSchedule`].
//!
//! # Usage
//!
//! ```ignore
//! use rtservo_sim::{simulate, Stimulus};
//!
//! let result = simulate(&config, &stimuli, None)?;
//! println!("{} cycles, {} failures", result.cycles, result.failures.len());
//! ```
//!
//! # Modules
//!
//! - `address`: bus address decode into tagged targets
//! - `cdc`: config register hand-off between clock domains
//! - `ctrl`: per-channel control register
//! - `engine`: engine handshake models
//! - `mem_bus`: the servo memory bus
//! - `memory`: memory port capability and block RAM
//! - `phy`: the complete interface
//! - `testbench`: stimulus runner
//! - `time`: femtosecond time and the two-clock schedule
//! - `waveform`: waveform recording (VCD format)

#![warn(missing_docs)]

pub mod address;
pub mod cdc;
pub mod ctrl;
pub mod engine;
pub mod error;
pub mod mem_bus;
pub mod memory;
pub mod phy;
pub mod testbench;
pub mod time;
pub mod waveform;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use rtservo_config::ServoConfig;

pub use address::{Access, Half, Request, Target};
pub use cdc::ConfigRegister;
pub use ctrl::{ChannelControlRegister, ChannelCtrl, CtrlInput};
pub use engine::{Engine, ManualEngine, PeriodicEngine};
pub use error::SimError;
pub use mem_bus::{BusInput, BusOutput, PortDrive, ServoMemoryBus, Status};
pub use memory::{BlockRam, MemoryPort};
pub use phy::{CycleOutput, PhyInput, ServoPhy};
pub use testbench::{Mismatch, ReadResponse, SimResult, Slot, Stimulus, Testbench};
pub use time::{ClockDomain, Domain, Edge, EdgeSchedule, SimTime};
pub use waveform::{TraceId, VcdRecorder, WaveformRecorder};

/// Runs `stimuli` against an interface built from `config`.
///
/// If `waveform_path` is given, a VCD of the bus and port signals is written
/// there.
pub fn simulate(
    config: &ServoConfig,
    stimuli: &[Stimulus],
    waveform_path: Option<&Path>,
) -> Result<SimResult, SimError> {
    let mut bench = Testbench::from_config(config)?;
    if let Some(path) = waveform_path {
        let writer = BufWriter::new(File::create(path)?);
        bench.set_recorder(Box::new(VcdRecorder::new(writer)))?;
    }
    bench.run(stimuli)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stimuli() -> Vec<Stimulus> {
        vec![
            Stimulus::Write {
                target: Slot::State,
                addr: 4,
                half: Half::Low,
                data: 0x2AAAA,
            },
            Stimulus::Read {
                target: Slot::State,
                addr: 4,
                half: Half::Low,
                expect: Some(0x2AAAA),
            },
        ]
    }

    #[test]
    fn simulate_without_waveform() {
        let result = simulate(&ServoConfig::default(), &stimuli(), None).unwrap();
        assert!(result.passed());
        assert_eq!(result.channels.len(), 8);
    }

    #[test]
    fn simulate_writes_vcd() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servo.vcd");
        let result = simulate(&ServoConfig::default(), &stimuli(), Some(&path)).unwrap();
        assert!(result.passed());
        let vcd = std::fs::read_to_string(&path).unwrap();
        assert!(vcd.contains("$enddefinitions $end"));
        assert!(vcd.contains("rd_data"));
    }

    #[test]
    fn simulate_rejects_bad_config() {
        let mut config = ServoConfig::default();
        config.channels = 0;
        assert!(matches!(
            simulate(&config, &stimuli(), None),
            Err(SimError::Config(_))
        ));
    }
}
