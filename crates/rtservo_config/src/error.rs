//! Error types for configuration loading and design-time validation.

/// Errors that can occur when loading an `rtservo.toml` or resolving a
/// [`BusLayout`](crate::BusLayout) from it.
///
/// The width variants are static configuration defects: a parameter set that
/// produces one of them cannot be built into a bus at all.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A clock frequency string could not be parsed or was zero.
    #[error("invalid frequency for {field}: '{value}'")]
    InvalidFrequency {
        /// The configuration key holding the frequency.
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A width that must be nonzero was zero.
    #[error("width '{0}' must be nonzero")]
    ZeroWidth(&'static str),

    /// A width exceeds what the model can represent.
    #[error("width '{field}' is {width} bits, maximum is {max}")]
    WidthTooLarge {
        /// The offending width name.
        field: &'static str,
        /// The configured width.
        width: u32,
        /// The largest supported width.
        max: u32,
    },

    /// The state word cannot expose a full coefficient half-word.
    #[error("state width {state} is narrower than coefficient width {coeff}")]
    StateNarrowerThanCoeff {
        /// Configured state width.
        state: u32,
        /// Configured coefficient half-width.
        coeff: u32,
    },

    /// The coefficient storage word is not exactly two halves.
    #[error("coefficient storage width {storage} must be twice the coefficient width {coeff}")]
    CoeffStorageMismatch {
        /// Configured storage width.
        storage: u32,
        /// Configured coefficient half-width.
        coeff: u32,
    },

    /// The narrowest data word does not fit a coefficient half.
    #[error("data word width {word} does not fit coefficient width {coeff}")]
    WordDoesNotFit {
        /// Configured data word width.
        word: u32,
        /// Configured coefficient half-width.
        coeff: u32,
    },

    /// The bus address cannot encode the select bits plus a memory address.
    #[error("address width {width} is too narrow, at least {required} bits are required")]
    AddressTooNarrow {
        /// Configured address width.
        width: u32,
        /// Minimum width for the configured memories.
        required: u32,
    },

    /// The configuration must declare at least one channel.
    #[error("at least one channel is required")]
    NoChannels,

    /// More channels than the model allocates control registers for.
    #[error("{channels} channels configured, maximum is {max}")]
    TooManyChannels {
        /// Configured channel count.
        channels: u32,
        /// Largest supported channel count.
        max: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_parse_error() {
        let err = ConfigError::ParseError("expected '=' at line 3".to_string());
        assert_eq!(
            err.to_string(),
            "failed to parse configuration: expected '=' at line 3"
        );
    }

    #[test]
    fn display_state_narrower() {
        let err = ConfigError::StateNarrowerThanCoeff {
            state: 16,
            coeff: 18,
        };
        assert_eq!(
            err.to_string(),
            "state width 16 is narrower than coefficient width 18"
        );
    }

    #[test]
    fn display_storage_mismatch() {
        let err = ConfigError::CoeffStorageMismatch {
            storage: 32,
            coeff: 18,
        };
        assert_eq!(
            err.to_string(),
            "coefficient storage width 32 must be twice the coefficient width 18"
        );
    }

    #[test]
    fn display_address_too_narrow() {
        let err = ConfigError::AddressTooNarrow {
            width: 8,
            required: 13,
        };
        assert_eq!(
            err.to_string(),
            "address width 8 is too narrow, at least 13 bits are required"
        );
    }

    #[test]
    fn display_width_too_large() {
        let err = ConfigError::WidthTooLarge {
            field: "coeff",
            width: 40,
            max: 32,
        };
        assert_eq!(err.to_string(), "width 'coeff' is 40 bits, maximum is 32");
    }

    #[test]
    fn display_too_many_channels() {
        let err = ConfigError::TooManyChannels {
            channels: 70000,
            max: 65536,
        };
        assert_eq!(err.to_string(), "70000 channels configured, maximum is 65536");
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::IoError(io_err);
        assert!(err.to_string().starts_with("failed to read configuration:"));
    }
}
