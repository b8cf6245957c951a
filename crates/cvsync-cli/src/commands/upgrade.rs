//! Upgrade command implementation.

use crate::output;
use anyhow::{Context as _, Result, bail};
use clap::Args;
use cvsync_config::{ConfigLoader, EnvConfig};
use std::path::PathBuf;
use tracing::info;

/// Arguments for the upgrade command.
#[derive(Args, Debug, Clone)]
pub struct UpgradeArgs {
    /// Job configuration file
    pub file: PathBuf,

    /// Write the result here instead of printing it
    #[arg(short = 'o', long, value_name = "FILE", conflicts_with = "in_place")]
    pub output: Option<PathBuf>,

    /// Rewrite the input file
    #[arg(short = 'i', long)]
    pub in_place: bool,
}

/// Run the upgrade command.
pub fn run(args: &UpgradeArgs) -> Result<()> {
    info!(file = %args.file.display(), "running upgrade command");

    let loaded = ConfigLoader::with_env(EnvConfig::default())
        .load(&args.file)
        .with_context(|| format!("failed to load job {}", args.file.display()))?;
    if !loaded.was_upgraded() {
        output::warning(&format!("{} is already in the current format", args.file.display()));
    }

    let target = if args.in_place {
        Some(args.file.clone())
    } else {
        args.output.clone()
    };

    match target {
        Some(path) => {
            if path.is_dir() {
                bail!("{} is a directory", path.display());
            }
            ConfigLoader::save(&loaded.config, &path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            output::success(&format!(
                "Wrote {} repositor{} to {}",
                loaded.config.repositories.len(),
                if loaded.config.repositories.len() == 1 { "y" } else { "ies" },
                path.display()
            ));
        }
        None => output::print_json(&loaded.config)?,
    }
    Ok(())
}
