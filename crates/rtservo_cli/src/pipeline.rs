//! Shared helpers for CLI commands.
//!
//! Config discovery and loading, stimulus file parsing and the stderr
//! status line used by every subcommand.

use std::path::{Path, PathBuf};

use rtservo_config::{ServoConfig, CONFIG_FILE_NAME};
use rtservo_sim::Stimulus;
use serde::Deserialize;

use crate::GlobalArgs;

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Loaded from this file.
    File(PathBuf),
    /// No file found; built-in defaults.
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

/// Walks up from `start` looking for the nearest `rtservo.toml`.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Resolves which configuration file to use.
///
/// `--config` may name a file or a directory holding `rtservo.toml`; a named
/// path that does not exist is an error. Without `--config` the current
/// directory and its parents are searched, falling back to defaults.
pub fn resolve_config_source(
    global: &GlobalArgs,
    cwd: &Path,
) -> Result<ConfigSource, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            Ok(ConfigSource::File(p))
        } else if p.is_dir() {
            Ok(ConfigSource::File(p.join(CONFIG_FILE_NAME)))
        } else {
            Err(format!("config path not found: {}", p.display()).into())
        }
    } else {
        Ok(find_config_file(cwd).map_or(ConfigSource::Defaults, ConfigSource::File))
    }
}

/// Loads and validates the active configuration.
pub fn load_servo_config(
    global: &GlobalArgs,
) -> Result<(ServoConfig, ConfigSource), Box<dyn std::error::Error>> {
    let source = resolve_config_source(global, &std::env::current_dir()?)?;
    let config = match source {
        ConfigSource::File(ref path) => rtservo_config::load_config_file(path)?,
        ConfigSource::Defaults => {
            let config = ServoConfig::default();
            rtservo_config::validate_config(&config)?;
            config
        }
    };
    if global.verbose && !global.quiet {
        eprintln!("      Config {source}");
    }
    Ok((config, source))
}

/// A stimulus file: an ordered list of `[[step]]` tables.
#[derive(Debug, Deserialize)]
pub struct VectorFile {
    /// Steps in execution order.
    #[serde(default)]
    pub step: Vec<Stimulus>,
}

/// Parses stimulus file contents.
pub fn parse_vectors(content: &str) -> Result<Vec<Stimulus>, Box<dyn std::error::Error>> {
    let file: VectorFile =
        toml::from_str(content).map_err(|e| format!("invalid stimulus file: {e}"))?;
    Ok(file.step)
}

/// Reads and parses a stimulus file.
pub fn load_vectors(path: &Path) -> Result<Vec<Stimulus>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    parse_vectors(&content)
}

/// Prints a right-aligned status line to stderr unless `--quiet`.
pub fn status(global: &GlobalArgs, verb: &str, message: impl std::fmt::Display) {
    if !global.quiet {
        eprintln!("{verb:>12} {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtservo_sim::{Half, Slot};
    use std::fs;

    fn global(config: Option<String>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            config,
        }
    }

    #[test]
    fn find_config_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "").unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(
            find_config_file(&nested),
            Some(dir.path().join(CONFIG_FILE_NAME))
        );
    }

    #[test]
    fn no_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        // tempdirs may live under a directory holding an rtservo.toml; only
        // assert the fallback when the walk really finds nothing
        if find_config_file(dir.path()).is_none() {
            assert_eq!(
                resolve_config_source(&global(None), dir.path()).unwrap(),
                ConfigSource::Defaults
            );
        }
    }

    #[test]
    fn explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servo.toml");
        fs::write(&path, "channels = 2\n").unwrap();
        let source =
            resolve_config_source(&global(Some(path.display().to_string())), dir.path()).unwrap();
        assert_eq!(source, ConfigSource::File(path));
    }

    #[test]
    fn explicit_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source = resolve_config_source(
            &global(Some(dir.path().display().to_string())),
            Path::new("/"),
        )
        .unwrap();
        assert_eq!(source, ConfigSource::File(dir.path().join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn missing_explicit_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(
            resolve_config_source(&global(Some(missing.display().to_string())), dir.path())
                .is_err()
        );
    }

    #[test]
    fn load_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "channels = 3\n[engine]\nperiod = 4\n").unwrap();
        let (config, source) =
            load_servo_config(&global(Some(dir.path().display().to_string()))).unwrap();
        assert_eq!(config.channels, 3);
        assert_eq!(config.engine.period, 4);
        assert_eq!(source, ConfigSource::File(path));
    }

    #[test]
    fn parse_vector_steps() {
        let steps = parse_vectors(
            r#"
            [[step]]
            op = "write"
            target = "state"
            addr = 3
            data = 17

            [[step]]
            op = "set_done"
            done = true
            "#,
        )
        .unwrap();
        assert_eq!(
            steps,
            vec![
                Stimulus::Write {
                    target: Slot::State,
                    addr: 3,
                    half: Half::Low,
                    data: 17
                },
                Stimulus::SetDone { done: true },
            ]
        );
    }

    #[test]
    fn empty_vector_file() {
        assert!(parse_vectors("").unwrap().is_empty());
    }

    #[test]
    fn bad_vector_op_rejected() {
        let err = parse_vectors("[[step]]\nop = \"erase\"\n").unwrap_err();
        assert!(err.to_string().contains("invalid stimulus file"));
    }

    #[test]
    fn config_source_display() {
        assert_eq!(ConfigSource::Defaults.to_string(), "built-in defaults");
    }
}
