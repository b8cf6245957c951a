//! Checkout command implementation.

use crate::commands::{Cli, ParameterArgs};
use crate::context::Context;
use crate::output;
use anyhow::{Context as _, Result};
use clap::Args;
use cvsync_core::{BuildEnvironmentDelta, CheckoutOutcome};
use cvsync_scm::{
    BaselineStore, CHANGELOG_FILE, CheckoutCoordinator, CheckoutMode, FileBaselineStore,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

/// Arguments for the checkout command.
#[derive(Args, Debug, Clone)]
pub struct CheckoutArgs {
    /// Job configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: PathBuf,

    /// Workspace directory
    #[arg(short = 'w', long, value_name = "DIR", default_value = ".")]
    pub workspace: PathBuf,

    /// Update existing working copies instead of checking out fresh
    #[arg(long)]
    pub update: bool,

    /// Baseline store (defaults to $CVSYNC_HOME/baselines.json)
    #[arg(long, value_name = "FILE")]
    pub baselines: Option<PathBuf>,

    /// Where to write the change summary (defaults to the workspace)
    #[arg(long, value_name = "FILE")]
    pub changelog: Option<PathBuf>,

    #[command(flatten)]
    pub params: ParameterArgs,
}

#[derive(Serialize)]
struct CheckoutReport<'a> {
    success: bool,
    outcomes: &'a [CheckoutOutcome],
    environment: Option<&'a BuildEnvironmentDelta>,
}

/// Run the checkout command.
pub fn run(cli: &Cli, args: &CheckoutArgs) -> Result<ExitCode> {
    info!(config = %args.config.display(), workspace = %args.workspace.display(), "running checkout command");

    let ctx = Context::new(cli.settings.as_deref())?;
    let loaded = ctx
        .loader
        .load(&args.config)
        .with_context(|| format!("failed to load job {}", args.config.display()))?;
    if loaded.was_upgraded() {
        output::warning("job file uses the legacy format; run `cvsync upgrade` to rewrite it");
    }
    let config = loaded.config;
    let parameters = args.params.context()?;

    output::header("Checking out...");

    let mode = if args.update {
        CheckoutMode::Update
    } else {
        CheckoutMode::Fresh
    };
    let coordinator = CheckoutCoordinator::new(Arc::new(ctx.transport()), ctx.settings.clone());

    let result = match coordinator.checkout(&config, &parameters, &args.workspace, mode) {
        Ok(result) => result,
        Err(failure) => {
            if output::is_json() {
                output::print_json(&CheckoutReport {
                    success: false,
                    outcomes: &failure.outcomes,
                    environment: None,
                })?;
            } else {
                print_outcomes(&failure.outcomes);
            }
            return Err(failure.into());
        }
    };

    let store = FileBaselineStore::new(ctx.baselines_path(args.baselines.as_deref()));
    store
        .put_all(&result.baselines)
        .with_context(|| format!("failed to record baselines in {}", store.path().display()))?;

    if let Some(summary) = &result.summary {
        let path = args
            .changelog
            .clone()
            .unwrap_or_else(|| args.workspace.join(CHANGELOG_FILE));
        summary
            .write_json(&path)
            .with_context(|| format!("failed to write change summary {}", path.display()))?;
    }

    if output::is_json() {
        output::print_json(&CheckoutReport {
            success: true,
            outcomes: &result.outcomes,
            environment: Some(&result.environment),
        })?;
        return Ok(ExitCode::SUCCESS);
    }

    print_outcomes(&result.outcomes);
    match result.environment.get(cvsync_core::CVS_BRANCH) {
        Some(branch) => output::info(&format!("{}={branch}", cvsync_core::CVS_BRANCH)),
        None => output::info(&format!("{} unset", cvsync_core::CVS_BRANCH)),
    }
    let files = result.summary.as_ref().map_or(0, cvsync_scm::ChangeSummary::file_count);
    output::success(&format!(
        "Checked out {} module(s), {files} file(s) touched",
        result.outcomes.len()
    ));
    Ok(ExitCode::SUCCESS)
}

fn print_outcomes(outcomes: &[CheckoutOutcome]) {
    for outcome in outcomes {
        let status = match (outcome.success, outcome.fell_back_to_head) {
            (true, false) => "ok",
            (true, true) => "ok (HEAD fallback)",
            (false, _) => "failed",
        };
        output::info(&format!(
            "{} [{}] -> {} {status}",
            outcome.key,
            outcome.effective_location,
            outcome.directory.display()
        ));
        if let Some(reason) = &outcome.failure_reason {
            output::warning(reason);
        }
    }
}
