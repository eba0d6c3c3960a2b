//! `rtservo check`: validate the configuration.
//!
//! Loads `rtservo.toml`, resolves the bus geometry and prints a summary of
//! the elaborated interface.

use rtservo_config::{BusLayout, ServoConfig};

use crate::pipeline::{load_servo_config, status};
use crate::GlobalArgs;

/// Runs the `rtservo check` command. Any configuration error is returned
/// and reported by `main` with exit code 1.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (config, source) = load_servo_config(global)?;
    let layout = BusLayout::resolve(&config.widths)?;

    status(global, "Checked", &source);
    for line in summary(&config, &layout)? {
        println!("{line}");
    }
    Ok(0)
}

/// Human-readable description of the resolved interface.
pub fn summary(
    config: &ServoConfig,
    layout: &BusLayout,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let engine = match config.engine.period {
        0 => "manual done".to_string(),
        n => format!("done every {n} cycles"),
    };
    Ok(vec![
        format!("channels        {}", config.channels),
        format!(
            "address         {} bits ({} memory address bits)",
            layout.address_width(),
            layout.mem_addr_width()
        ),
        format!("data            {} bits", layout.data_width()),
        format!(
            "coeff memory    {} x {} bits",
            1u64 << layout.coeff_addr_width(),
            layout.coeff_storage_width()
        ),
        format!(
            "state memory    {} x {} bits ({} exposed)",
            1u64 << layout.state_addr_width(),
            layout.state_width(),
            layout.data_width()
        ),
        format!(
            "control word    {} bits ({} profile bits)",
            layout.ctrl_width(),
            layout.profile_width()
        ),
        format!(
            "clocks          bus {}, config {}",
            config.clocks.bus_frequency()?,
            config.clocks.config_frequency()?
        ),
        format!("engine          {engine}"),
    ])
}
