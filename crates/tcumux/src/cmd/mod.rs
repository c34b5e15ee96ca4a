use clap::{Args, Subcommand};
use std::path::PathBuf;

use tcumux_transport::SUPPORTED_BAUD_RATE;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod reset;
pub mod run;
pub mod tags;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Demultiplex a combined UART until interrupted.
    Run(RunArgs),
    /// Ask the remote side to resynchronize and exit.
    Reset(ResetArgs),
    /// Show the console tag assignment.
    Tags(TagsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Reset(args) => reset::run(args),
        Command::Tags(args) => tags::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Serial device carrying the combined UART.
    #[arg(env = "TCUMUX_DEVICE")]
    pub device: PathBuf,
    /// Line speed.
    #[arg(long, env = "TCUMUX_BAUD", default_value_t = SUPPORTED_BAUD_RATE)]
    pub baud: u32,
    /// Pause before retrying a refused link write (e.g. 1s, 1.5s, 250ms; at most 30s).
    #[arg(long, default_value = "1s")]
    pub retry_delay: String,
    /// Request a reset from the remote side once the consoles are up.
    #[arg(long)]
    pub reset: bool,
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Serial device carrying the combined UART.
    #[arg(env = "TCUMUX_DEVICE")]
    pub device: PathBuf,
    /// Line speed.
    #[arg(long, env = "TCUMUX_BAUD", default_value_t = SUPPORTED_BAUD_RATE)]
    pub baud: u32,
}

#[derive(Args, Debug, Default)]
pub struct TagsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
