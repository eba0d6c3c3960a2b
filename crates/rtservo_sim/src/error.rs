//! Error types for building and driving the servo interface model.
//!
//! The bus protocol itself has no failure modes. These errors come from the
//! surroundings: configuration that does not elaborate, waveform output, and
//! stimulus that names hardware the model does not have.

use std::io;

use rtservo_config::ConfigError;

/// Errors that can occur during model construction or a testbench run.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The configuration could not be resolved into a bus.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error occurred while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),

    /// A value change was recorded for a signal that was never registered.
    #[error("invalid trace signal: {reason}")]
    InvalidSignalRef {
        /// Description of why the signal reference is invalid.
        reason: String,
    },

    /// A control write addressed a channel that does not exist.
    #[error("channel {channel} out of range ({count} channels)")]
    ChannelOutOfRange {
        /// The requested channel index.
        channel: u32,
        /// Number of channels in the model.
        count: u32,
    },

    /// A stimulus needs a manually driven engine but a free-running one is
    /// attached.
    #[error("engine 'done' cannot be set: the engine is free-running")]
    EngineNotManual,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_display() {
        let e = SimError::Config(ConfigError::NoChannels);
        assert_eq!(
            e.to_string(),
            "configuration error: at least one channel is required"
        );
    }

    #[test]
    fn waveform_io_display() {
        let e = SimError::WaveformIo(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(e.to_string().contains("waveform I/O error"));
    }

    #[test]
    fn invalid_signal_ref_display() {
        let e = SimError::InvalidSignalRef {
            reason: "unregistered VCD signal 9".into(),
        };
        assert_eq!(
            e.to_string(),
            "invalid trace signal: unregistered VCD signal 9"
        );
    }

    #[test]
    fn channel_out_of_range_display() {
        let e = SimError::ChannelOutOfRange {
            channel: 9,
            count: 8,
        };
        assert_eq!(e.to_string(), "channel 9 out of range (8 channels)");
    }

    #[test]
    fn engine_not_manual_display() {
        assert_eq!(
            SimError::EngineNotManual.to_string(),
            "engine 'done' cannot be set: the engine is free-running"
        );
    }
}
