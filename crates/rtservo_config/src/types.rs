//! Configuration types deserialized from `rtservo.toml`.

use rtservo_common::Frequency;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The top-level configuration parsed from `rtservo.toml`.
///
/// Every section is optional; omitted sections take the values of the
/// eight-channel, 32-profile servo the interface was sized for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServoConfig {
    /// Number of per-channel control registers.
    #[serde(default = "default_channels")]
    pub channels: u32,
    /// Signal and memory widths.
    #[serde(default)]
    pub widths: Widths,
    /// Clock domain frequencies.
    #[serde(default)]
    pub clocks: ClockConfig,
    /// Engine handshake model.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            channels: default_channels(),
            widths: Widths::default(),
            clocks: ClockConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

fn default_channels() -> u32 {
    8
}

/// Bit widths of the bus, the two memories and the control word.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Widths {
    /// Coefficient half-word width; also the bus data width.
    pub coeff: u32,
    /// State memory word width.
    pub state: u32,
    /// Narrowest data word that must fit into a coefficient half.
    pub word: u32,
    /// Coefficient memory address width.
    pub coeff_addr: u32,
    /// State memory address width.
    pub state_addr: u32,
    /// Profile index width in the channel control word.
    pub profile: u32,
    /// Explicit bus address width. Derived when omitted.
    pub address: Option<u32>,
    /// Explicit coefficient storage word width. Derived when omitted.
    pub coeff_storage: Option<u32>,
}

impl Default for Widths {
    fn default() -> Self {
        Self {
            coeff: 18,
            state: 25,
            word: 16,
            coeff_addr: 10,
            state_addr: 9,
            profile: 5,
            address: None,
            coeff_storage: None,
        }
    }
}

/// Frequencies of the bus clock and the config register clock.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Bus clock driving the read/write pipeline (e.g. "125MHz").
    pub bus: String,
    /// Clock of the config register domain.
    pub config: String,
    /// Offset of the first config edge relative to the first bus edge.
    pub config_phase_ns: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            bus: "125MHz".to_string(),
            config: "62.5MHz".to_string(),
            config_phase_ns: 0,
        }
    }
}

impl ClockConfig {
    /// Parses the bus clock frequency.
    pub fn bus_frequency(&self) -> Result<Frequency, ConfigError> {
        parse_clock("clocks.bus", &self.bus)
    }

    /// Parses the config domain clock frequency.
    pub fn config_frequency(&self) -> Result<Frequency, ConfigError> {
        parse_clock("clocks.config", &self.config)
    }
}

fn parse_clock(field: &'static str, value: &str) -> Result<Frequency, ConfigError> {
    let freq: Frequency = value
        .parse()
        .map_err(|_| ConfigError::InvalidFrequency {
            field,
            value: value.to_string(),
        })?;
    if freq.hz() == 0 {
        return Err(ConfigError::InvalidFrequency {
            field,
            value: value.to_string(),
        });
    }
    Ok(freq)
}

/// Settings for the engine handshake model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bus cycles per engine iteration while started. 0 means `done` is
    /// driven manually by the stimulus.
    pub period: u32,
}
