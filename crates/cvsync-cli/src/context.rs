//! Settings and transport shared by the commands.

use anyhow::{Context as _, Result};
use cvsync_config::{ConfigLoader, GlobalSettings, SETTINGS_FILE};
use cvsync_vcs::CvsCli;
use std::path::{Path, PathBuf};

/// Default baseline store file inside the settings directory.
pub const BASELINES_FILE: &str = "baselines.json";

/// Resolved installation state for one invocation.
#[derive(Debug)]
pub struct Context {
    /// Loader carrying environment overrides.
    pub loader: ConfigLoader,
    /// Directory holding settings and baselines.
    pub home: PathBuf,
    /// Global settings with overrides applied.
    pub settings: GlobalSettings,
}

impl Context {
    /// Load settings from `settings`, or from the settings directory.
    pub fn new(settings: Option<&Path>) -> Result<Self> {
        let loader = ConfigLoader::new().context("failed to read environment overrides")?;
        let home = loader.settings_dir(Path::new(".cvsync"));
        let path = settings.map_or_else(|| home.join(SETTINGS_FILE), Path::to_path_buf);
        let settings = loader
            .load_settings(&path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?;
        tracing::debug!(home = %home.display(), settings = %path.display(), "resolved context");
        Ok(Self {
            loader,
            home,
            settings,
        })
    }

    /// Transport driving the configured `cvs` executable.
    pub fn transport(&self) -> CvsCli {
        CvsCli::new()
            .with_executable(&self.settings.cvs_executable)
            .with_timeout(self.settings.command_timeout())
            .with_rsh(self.loader.env().cvs_rsh.clone())
    }

    /// Baseline store path, `explicit` if given.
    pub fn baselines_path(&self, explicit: Option<&Path>) -> PathBuf {
        explicit.map_or_else(|| self.home.join(BASELINES_FILE), Path::to_path_buf)
    }
}
