//! cvsync CLI - CVS checkout and change polling for CI builds.
//!
//! Wires the cvsync libraries to the `cvs` executable, a JSON job file and
//! a file-backed baseline store.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod context;
mod output;

use clap::Parser;
use commands::{Cli, Commands};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 if cli.quiet => Level::ERROR,
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    if matches!(cli.format, commands::OutputFormat::Json) {
        output::enable_json();
    }
    output::set_quiet(cli.quiet);

    match run_command(&cli) {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn run_command(cli: &Cli) -> anyhow::Result<ExitCode> {
    match &cli.command {
        Commands::Checkout(args) => commands::checkout::run(cli, args),
        Commands::Poll(args) => commands::poll::run(cli, args),
        Commands::Upgrade(args) => {
            commands::upgrade::run(args)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate(args) => commands::validate::run(args),
        Commands::Tags(args) => {
            commands::tags::run(cli, args)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
