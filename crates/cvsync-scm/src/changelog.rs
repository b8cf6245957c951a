//! Change summary of a checkout.

use crate::error::{Result, ScmError};
use chrono::{DateTime, Utc};
use cvsync_core::{ModuleKey, ResolvedLocation};
use cvsync_vcs::FileChange;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Default file name for a written summary.
pub const CHANGELOG_FILE: &str = "cvsync-changelog.json";

/// Files touched in one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleChanges {
    /// Module identity.
    pub key: ModuleKey,
    /// Location checked out.
    pub location: ResolvedLocation,
    /// Checkout directory.
    pub directory: PathBuf,
    /// Whether the module was updated in place.
    pub updated: bool,
    /// Touched files, exclusions removed.
    pub changes: Vec<FileChange>,
}

/// Files touched by one checkout across all modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChangeSummary {
    /// When the checkout started.
    pub started_at: DateTime<Utc>,
    /// Per-module changes in checkout order.
    pub modules: Vec<ModuleChanges>,
}

impl ChangeSummary {
    /// Total number of touched files.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.modules.iter().map(|m| m.changes.len()).sum()
    }

    /// Whether no file was touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.file_count() == 0
    }

    /// Write the summary as JSON, replacing `path` atomically.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let data = sonic_rs::to_string_pretty(self).map_err(|e| ScmError::Workspace {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| ScmError::workspace(parent, e))?;

        let mut temp = NamedTempFile::new_in(parent).map_err(|e| ScmError::workspace(parent, e))?;
        temp.write_all(data.as_bytes())
            .map_err(|e| ScmError::workspace(path, e))?;
        temp.persist(path)
            .map_err(|e| ScmError::workspace(path, e.error))?;
        tracing::debug!(path = %path.display(), files = self.file_count(), "wrote change summary");
        Ok(())
    }

    /// Read a summary written by [`Self::write_json`].
    pub fn read_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ScmError::workspace(path, e))?;
        sonic_rs::from_str(&content).map_err(|e| ScmError::Workspace {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvsync_vcs::FileAction;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn written_summary_reads_back() {
        let summary = ChangeSummary {
            started_at: DateTime::<Utc>::from_timestamp(1_300_000_000, 0).unwrap(),
            modules: vec![ModuleChanges {
                key: ModuleKey::new(":local:/cvs", "fooModule"),
                location: ResolvedLocation::head(),
                directory: PathBuf::from("fooModule"),
                updated: false,
                changes: vec![FileChange {
                    path: "head.txt".into(),
                    action: FileAction::Updated,
                }],
            }],
        };
        assert_eq!(summary.file_count(), 1);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CHANGELOG_FILE);
        summary.write_json(&path).unwrap();
        assert_eq!(ChangeSummary::read_json(&path).unwrap(), summary);
    }
}
