//! Poll command implementation.

use crate::commands::{Cli, ParameterArgs};
use crate::context::Context;
use crate::output;
use anyhow::{Context as _, Result};
use clap::Args;
use cvsync_scm::{ChangeDetector, FileBaselineStore};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

/// Arguments for the poll command.
#[derive(Args, Debug, Clone)]
pub struct PollArgs {
    /// Job configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: PathBuf,

    /// Baseline store (defaults to $CVSYNC_HOME/baselines.json)
    #[arg(long, value_name = "FILE")]
    pub baselines: Option<PathBuf>,

    /// Do not advance the stored baselines
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with status 1 when changes were found
    #[arg(long)]
    pub exit_code: bool,

    #[command(flatten)]
    pub params: ParameterArgs,
}

#[derive(Serialize)]
struct PollReport {
    has_changes: bool,
    modules: Vec<ModuleReport>,
}

#[derive(Serialize)]
struct ModuleReport {
    module: String,
    files: Vec<String>,
}

/// Run the poll command.
pub fn run(cli: &Cli, args: &PollArgs) -> Result<ExitCode> {
    info!(config = %args.config.display(), "running poll command");

    let ctx = Context::new(cli.settings.as_deref())?;
    let config = ctx
        .loader
        .load(&args.config)
        .with_context(|| format!("failed to load job {}", args.config.display()))?
        .config;
    let parameters = args.params.context()?;
    let store = FileBaselineStore::new(ctx.baselines_path(args.baselines.as_deref()));

    output::header("Polling for changes...");

    let result = ChangeDetector::new(Arc::new(ctx.transport()))
        .poll(&config.repositories, &store, &parameters)?;

    if args.dry_run {
        info!("dry run, baselines left unchanged");
    } else {
        result
            .commit(&store)
            .with_context(|| format!("failed to record baselines in {}", store.path().display()))?;
    }

    if output::is_json() {
        output::print_json(&PollReport {
            has_changes: result.has_changes,
            modules: result
                .changes
                .iter()
                .map(|m| ModuleReport {
                    module: m.key.to_string(),
                    files: m.entries.iter().map(|e| e.path.clone()).collect(),
                })
                .collect(),
        })?;
    } else if result.has_changes {
        for module in &result.changes {
            output::info(&format!("{}: {} change(s)", module.key, module.entries.len()));
            for entry in &module.entries {
                output::info(&format!(
                    "  {} {} {} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.revision,
                    entry.author,
                    entry.path
                ));
            }
        }
        output::success("Changes detected");
    } else {
        output::success("No changes");
    }

    if args.exit_code && result.has_changes {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}
