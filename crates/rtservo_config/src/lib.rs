//! Parsing and validation of `rtservo.toml` configuration files.
//!
//! This crate reads the servo interface configuration and resolves it into a
//! [`BusLayout`]: the validated field geometry every bus model is built from.
//! Width combinations that could not elaborate as hardware are rejected here,
//! before any simulation state exists.

#![warn(missing_docs)]

pub mod error;
pub mod layout;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use layout::BusLayout;
pub use loader::{
    load_config, load_config_file, load_config_from_str, validate_config, CONFIG_FILE_NAME,
    MAX_CHANNELS,
};
pub use types::*;
