//! `rtservo run`: drive a stimulus file through the interface.
//!
//! Loads the configuration and the `[[step]]` list, runs the testbench,
//! prints read responses to stdout and expectation failures to stderr, and
//! optionally records a VCD waveform.

use std::path::{Path, PathBuf};

use rtservo_sim::{ReadResponse, SimResult, Target};

use crate::pipeline::{load_servo_config, load_vectors, status};
use crate::{GlobalArgs, ReportFormat, RunArgs};

/// Runs the `rtservo run` command.
///
/// Returns exit code 0 if every expectation held, 1 otherwise.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (config, _) = load_servo_config(global)?;
    let vectors = PathBuf::from(&args.vectors);
    let stimuli = load_vectors(&vectors)?;

    status(
        global,
        "Running",
        format!("{} ({} steps)", vectors.display(), stimuli.len()),
    );

    let vcd = args.vcd.as_ref().map(PathBuf::from);
    if let Some(parent) = vcd.as_deref().and_then(Path::parent) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let result = rtservo_sim::simulate(&config, &stimuli, vcd.as_deref())?;

    match args.format {
        ReportFormat::Text => {
            for response in &result.responses {
                println!("{}", format_response(response));
            }
        }
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    for failure in &result.failures {
        eprintln!("MISMATCH: {failure}");
    }

    if let Some(ref path) = vcd {
        status(global, "Waveform", path.display());
    }
    if global.verbose && !global.quiet {
        eprintln!(
            "      Status start={} done={}",
            u8::from(result.status.start),
            u8::from(result.status.done)
        );
    }
    status(global, "Finished", summary(&result));

    Ok(if result.passed() { 0 } else { 1 })
}

fn format_target(target: &Target) -> String {
    match target {
        Target::Coeff { addr, half } => format!("coeff {addr} {half:?}").to_lowercase(),
        Target::State { addr } => format!("state {addr}"),
        Target::ConfigStatus => "status".to_string(),
    }
}

fn format_response(response: &ReadResponse) -> String {
    format!(
        "{:>6}  {:<16} {:#x}",
        response.cycle,
        format_target(&response.target),
        response.data
    )
}

fn summary(result: &SimResult) -> String {
    let verdict = if result.passed() {
        "ok".to_string()
    } else {
        format!("{} mismatches", result.failures.len())
    };
    format!(
        "{} cycles, {} reads, {verdict} at {}",
        result.cycles,
        result.responses.len(),
        result.final_time
    )
}
