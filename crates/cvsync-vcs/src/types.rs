//! Request and report types exchanged with a CVS transport.

use chrono::{DateTime, Utc};
use cvsync_core::ExcludedRegion;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options shared by checkout and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutOptions {
    /// Compression level passed as `-z`.
    pub compression_level: Option<u8>,
    /// Remove empty directories (`-P`).
    pub prune_empty_directories: bool,
    /// Pass `-q` to cvs.
    pub quiet: bool,
    /// Fall back to HEAD for files lacking the revision (`-f`).
    pub head_fallback: bool,
}

/// A fresh checkout of one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Expanded CVSROOT.
    pub root: String,
    /// Remote module path.
    pub module: String,
    /// Tag or branch; `None` checks out HEAD.
    pub revision: Option<String>,
    /// Absolute directory receiving the module contents.
    pub destination: PathBuf,
    /// Paths to drop from disk and from the report.
    pub excluded_regions: Vec<ExcludedRegion>,
    /// Command options.
    pub options: CheckoutOptions,
}

/// An incremental update of an existing checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// Expanded CVSROOT.
    pub root: String,
    /// Remote module path.
    pub module: String,
    /// Tag or branch; `None` resets sticky tags to HEAD (`-A`).
    pub revision: Option<String>,
    /// Existing checkout directory.
    pub working_dir: PathBuf,
    /// Paths to drop from disk and from the report.
    pub excluded_regions: Vec<ExcludedRegion>,
    /// Command options.
    pub options: CheckoutOptions,
}

/// What happened to a file during checkout or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    /// New or replaced from the repository (`U`).
    Updated,
    /// Patched in place (`P`).
    Patched,
    /// Scheduled for addition locally (`A`).
    Added,
    /// Scheduled for removal locally (`R`).
    Removed,
    /// Locally modified (`M`).
    Modified,
    /// Merge conflict (`C`).
    Conflict,
}

impl FileAction {
    /// Map a cvs status letter.
    #[must_use]
    pub const fn from_code(code: char) -> Option<Self> {
        match code {
            'U' => Some(Self::Updated),
            'P' => Some(Self::Patched),
            'A' => Some(Self::Added),
            'R' => Some(Self::Removed),
            'M' => Some(Self::Modified),
            'C' => Some(Self::Conflict),
            _ => None,
        }
    }
}

/// One file touched by a checkout or update.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileChange {
    /// Path relative to the checkout directory.
    pub path: String,
    /// What happened.
    pub action: FileAction,
}

/// Result of a checkout or update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReport {
    /// Files touched, excluded paths removed.
    pub changes: Vec<FileChange>,
    /// Some files were served from HEAD because they lack the revision.
    pub head_fallback_used: bool,
}

/// A history query for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Expanded CVSROOT.
    pub root: String,
    /// Remote module path.
    pub module: String,
    /// Branch to scope to; `None` scopes to the trunk.
    pub revision: Option<String>,
    /// Exclusive lower bound.
    pub since: DateTime<Utc>,
    /// Inclusive upper bound.
    pub until: DateTime<Utc>,
    /// Maximum number of entries; `None` is unbounded.
    pub limit: Option<u32>,
}

/// One file revision found by a history query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Path relative to the module.
    pub path: String,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
    /// File revision, e.g. `1.4`.
    pub revision: String,
    /// Committer.
    #[serde(default)]
    pub author: String,
    /// Commit message.
    #[serde(default)]
    pub message: String,
}

/// A tag or branch attached to one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolicName {
    /// Path relative to the module.
    pub path: String,
    /// Tag or branch name.
    pub name: String,
    /// Revision the name points at.
    pub revision: String,
}

impl SymbolicName {
    /// Whether the name denotes a branch.
    ///
    /// Branch numbers carry a magic `0` in the second to last position
    /// (`1.2.0.4`) or have an odd number of components (vendor branches).
    #[must_use]
    pub fn is_branch(&self) -> bool {
        let parts: Vec<&str> = self.revision.split('.').collect();
        parts.len() % 2 == 1 || (parts.len() >= 4 && parts[parts.len() - 2] == "0")
    }
}

/// How much of a module a tag or branch covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceCoverage {
    /// On every file that was live when the reference was applied.
    Full,
    /// On some of those files only.
    Partial,
    /// On no file.
    Missing,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sym(path: &str, name: &str, revision: &str) -> SymbolicName {
        SymbolicName {
            path: path.into(),
            name: name.into(),
            revision: revision.into(),
        }
    }

    #[rstest]
    #[case("1.1", false)]
    #[case("1.2.0.4", true)]
    #[case("1.1.1", true)]
    #[case("1.2.2.1", false)]
    fn branch_numbers(#[case] revision: &str, #[case] branch: bool) {
        assert_eq!(sym("a", "n", revision).is_branch(), branch);
    }

    #[test]
    fn action_codes() {
        assert_eq!(FileAction::from_code('U'), Some(FileAction::Updated));
        assert_eq!(FileAction::from_code('?'), None);
    }
}
