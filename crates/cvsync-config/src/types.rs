//! Persisted configuration documents.

use cvsync_core::Repository;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Current job document version.
pub const CONFIG_VERSION: u32 = 2;

const fn current_version() -> u32 {
    CONFIG_VERSION
}

/// Per-job CVS configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScmConfig {
    /// Document version.
    #[serde(default = "current_version")]
    pub version: u32,
    /// Repositories in checkout order.
    pub repositories: Vec<Repository>,
    /// Update an existing checkout instead of checking out afresh.
    #[serde(default)]
    pub can_use_update: bool,
    /// Always check out single modules into a directory named after them.
    #[serde(default)]
    pub legacy: bool,
    /// Do not write a change summary.
    #[serde(default)]
    pub skip_changelog: bool,
    /// Remove empty directories after checkout (`-P`).
    #[serde(default)]
    pub prune_empty_directories: bool,
    /// Run cvs without `-q`.
    #[serde(default)]
    pub disable_cvs_quiet: bool,
    /// Check out independent repositories concurrently.
    #[serde(default)]
    pub parallel_repositories: bool,
}

impl Default for ScmConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            repositories: Vec::new(),
            can_use_update: false,
            legacy: false,
            skip_changelog: false,
            prune_empty_directories: false,
            disable_cvs_quiet: false,
            parallel_repositories: false,
        }
    }
}

impl ScmConfig {
    /// A configuration with the given repositories and default options.
    #[must_use]
    pub fn new(repositories: Vec<Repository>) -> Self {
        Self {
            repositories,
            ..Self::default()
        }
    }

    /// Whether the single module is checked out straight into the workspace.
    ///
    /// True when legacy mode is off and there is exactly one repository
    /// with exactly one module that has no local name.
    #[must_use]
    pub fn is_flatten(&self) -> bool {
        if self.legacy {
            return false;
        }
        match self.repositories.as_slice() {
            [repo] => match repo.modules.as_slice() {
                [module] => module.local_name().is_none(),
                _ => false,
            },
            _ => false,
        }
    }
}

/// Installation-wide settings threaded into every checkout and poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GlobalSettings {
    /// Default compression level for repositories that set none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_level: Option<u8>,
    /// cvs executable.
    #[serde(default = "default_executable")]
    pub cvs_executable: PathBuf,
    /// Kill cvs commands running longer than this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,
}

fn default_executable() -> PathBuf {
    PathBuf::from("cvs")
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            compression_level: None,
            cvs_executable: default_executable(),
            command_timeout_secs: None,
        }
    }
}

impl GlobalSettings {
    /// The command timeout as a duration.
    #[must_use]
    pub fn command_timeout(&self) -> Option<std::time::Duration> {
        self.command_timeout_secs.map(std::time::Duration::from_secs)
    }
}
