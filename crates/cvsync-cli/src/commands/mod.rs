//! CLI commands for cvsync.

pub mod checkout;
pub mod poll;
pub mod tags;
pub mod upgrade;
pub mod validate;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cvsync_core::ParameterContext;
use std::path::PathBuf;

/// cvsync - CVS checkout and change polling for CI builds
#[derive(Parser, Debug)]
#[command(name = "cvsync")]
#[command(author = "cvsync Contributors")]
#[command(version)]
#[command(about = "CVS checkout and change polling for CI builds", long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Only print errors
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Increase the verbosity of messages: -v for info, -vv for debug, -vvv for trace
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Global settings file (defaults to $CVSYNC_HOME/settings.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Machine-readable JSON
    Json,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check out or update every module of a job into a workspace
    #[command(visible_alias = "co")]
    Checkout(checkout::CheckoutArgs),

    /// Ask the server whether a job's modules changed since the last build
    Poll(poll::PollArgs),

    /// Rewrite a legacy job file in the current format
    Upgrade(upgrade::UpgradeArgs),

    /// Validate a job file
    Validate(validate::ValidateArgs),

    /// List the tags and branches of a module
    Tags(tags::TagsArgs),
}

/// Build parameters shared by `checkout` and `poll`.
#[derive(Args, Debug, Clone, Default)]
pub struct ParameterArgs {
    /// Build parameter used to expand `${NAME}` in roots and revision names
    #[arg(short = 'p', long = "param", value_name = "NAME=VALUE")]
    pub params: Vec<String>,

    /// Ignore the process environment when expanding names
    #[arg(long)]
    pub no_env: bool,
}

impl ParameterArgs {
    /// Parameter context for the build.
    pub fn context(&self) -> Result<ParameterContext> {
        let mut context = if self.no_env {
            ParameterContext::new()
        } else {
            ParameterContext::from_process_env()
        };
        for param in &self.params {
            let Some((name, value)) = param.split_once('=') else {
                bail!("invalid parameter '{param}': expected NAME=VALUE");
            };
            if name.is_empty() {
                bail!("invalid parameter '{param}': empty name");
            }
            context = context.with_parameter(name, value);
        }
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_parameters() {
        let args = ParameterArgs {
            params: vec!["cvsTag=fooTag".into(), "empty=".into()],
            no_env: true,
        };
        let context = args.context().unwrap();
        assert_eq!(context.lookup("cvsTag"), Some("fooTag"));
        assert_eq!(context.lookup("empty"), Some(""));
    }

    #[test]
    fn rejects_parameter_without_value() {
        let args = ParameterArgs {
            params: vec!["cvsTag".into()],
            no_env: true,
        };
        assert!(args.context().is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
