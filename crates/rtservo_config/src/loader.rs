//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::layout::BusLayout;
use crate::types::ServoConfig;
use std::path::Path;

/// File name looked up inside a project directory.
pub const CONFIG_FILE_NAME: &str = "rtservo.toml";

/// Largest supported channel count.
pub const MAX_CHANNELS: u32 = 1 << 16;

/// Loads and validates `<dir>/rtservo.toml`.
pub fn load_config(dir: &Path) -> Result<ServoConfig, ConfigError> {
    load_config_file(&dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates a configuration from an explicit file path.
pub fn load_config_file(path: &Path) -> Result<ServoConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ServoConfig, ConfigError> {
    let config: ServoConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Rejects configurations that cannot be elaborated.
pub fn validate_config(config: &ServoConfig) -> Result<(), ConfigError> {
    if config.channels == 0 {
        return Err(ConfigError::NoChannels);
    }
    if config.channels > MAX_CHANNELS {
        return Err(ConfigError::TooManyChannels {
            channels: config.channels,
            max: MAX_CHANNELS,
        });
    }
    BusLayout::resolve(&config.widths)?;
    config.clocks.bus_frequency()?;
    config.clocks.config_frequency()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, ServoConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
channels = 4

[widths]
coeff = 18
state = 18
word = 16
coeff_addr = 4
state_addr = 4
profile = 5
address = 7

[clocks]
bus = "100MHz"
config = "25MHz"
config_phase_ns = 3

[engine]
period = 16
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.channels, 4);
        assert_eq!(config.widths.state, 18);
        assert_eq!(config.widths.address, Some(7));
        assert_eq!(config.clocks.bus, "100MHz");
        assert_eq!(config.clocks.config_phase_ns, 3);
        assert_eq!(config.engine.period, 16);
    }

    #[test]
    fn invalid_widths_rejected_at_load() {
        let toml = r#"
[widths]
coeff = 18
state = 12
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::StateNarrowerThanCoeff { .. }));
    }

    #[test]
    fn zero_channels_rejected() {
        let err = load_config_from_str("channels = 0").unwrap_err();
        assert!(matches!(err, ConfigError::NoChannels));
    }

    #[test]
    fn channel_count_bounded() {
        let err = load_config_from_str("channels = 4294967295\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TooManyChannels {
                channels: 4294967295,
                max: MAX_CHANNELS
            }
        ));
        let config = load_config_from_str("channels = 65536\n").unwrap();
        assert_eq!(config.channels, MAX_CHANNELS);
        assert!(load_config_from_str("channels = 65537\n").is_err());
    }

    #[test]
    fn bad_clock_rejected_at_load() {
        let toml = r#"
[clocks]
config = "slow"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFrequency { .. }));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn unknown_type_errors() {
        let err = load_config_from_str("channels = \"eight\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        writeln!(file, "channels = 2").unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.channels, 2);
    }

    #[test]
    fn load_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\nperiod = 5").unwrap();
        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.engine.period, 5);
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
