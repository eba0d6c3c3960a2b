//! rtservo CLI: inspect and exercise the servo RTIO register interface.
//!
//! Provides `rtservo check` to validate a configuration, `rtservo layout` to
//! print the bus address map, and `rtservo run` to drive a stimulus file
//! through the cycle model.

#![warn(missing_docs)]

mod check;
mod layout;
mod pipeline;
mod run;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// rtservo: servo register interface model.
#[derive(Parser, Debug)]
#[command(name = "rtservo", version, about = "Servo RTIO register interface model")]
pub struct Cli {
    /// Suppress all output except errors and requested data.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to an `rtservo.toml` file or a directory containing one.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the configuration and print the resolved geometry.
    Check,
    /// Print the bus address field map.
    Layout(LayoutArgs),
    /// Run a stimulus file through the interface.
    Run(RunArgs),
}

/// Arguments for the `rtservo layout` subcommand.
#[derive(Parser, Debug)]
pub struct LayoutArgs {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `rtservo run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Stimulus file (TOML, one `[[step]]` table per step).
    pub vectors: String,

    /// Write a VCD waveform to this path.
    #[arg(long)]
    pub vcd: Option<String>,

    /// Output format for the run report.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error status output.
    pub quiet: bool,
    /// Whether to print extra detail.
    pub verbose: bool,
    /// Optional path to a config file or directory.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Check => check::run(&global),
        Command::Layout(ref args) => layout::run(args, &global),
        Command::Run(ref args) => run::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
