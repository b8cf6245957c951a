//! Workspace preparation and the in-progress marker.

use crate::error::{Result, ScmError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Marker file left in the workspace while a checkout runs.
pub const IN_PROGRESS_MARKER: &str = ".cvsync-checkout-in-progress";

/// Whether a previous checkout of `workspace` did not finish.
#[must_use]
pub fn previous_checkout_aborted(workspace: &Path) -> bool {
    workspace.join(IN_PROGRESS_MARKER).exists()
}

/// Whether `dir` holds a CVS working copy.
#[must_use]
pub fn is_working_copy(dir: &Path) -> bool {
    dir.join("CVS").is_dir()
}

/// Guard for a running checkout.
///
/// The marker is removed only by [`CheckoutMarker::complete`]; a checkout
/// that fails or is cancelled leaves it behind.
#[derive(Debug)]
pub struct CheckoutMarker {
    path: PathBuf,
}

impl CheckoutMarker {
    /// Create the marker in `workspace`.
    pub fn begin(workspace: &Path) -> Result<Self> {
        std::fs::create_dir_all(workspace).map_err(|e| ScmError::workspace(workspace, e))?;
        let path = workspace.join(IN_PROGRESS_MARKER);
        std::fs::write(&path, chrono::Utc::now().to_rfc3339())
            .map_err(|e| ScmError::workspace(&path, e))?;
        Ok(Self { path })
    }

    /// Remove the marker.
    pub fn complete(self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ScmError::workspace(&self.path, e)),
        }
    }
}

/// Empty `dir` for a fresh checkout, keeping the in-progress marker.
pub fn clear_directory(dir: &Path) -> Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(ScmError::workspace(dir, e)),
    };

    let mut removed = 0usize;
    for entry in entries {
        let entry = entry.map_err(|e| ScmError::workspace(dir, e))?;
        if entry.file_name() == IN_PROGRESS_MARKER {
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| ScmError::workspace(&path, e))?;
        let result = if file_type.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        result.map_err(|e| ScmError::workspace(&path, e))?;
        removed += 1;
    }
    if removed > 0 {
        debug!(dir = %dir.display(), removed, "cleared directory for fresh checkout");
    }
    Ok(())
}

/// Log and report whether update mode can be honoured for `workspace`.
#[must_use]
pub fn update_allowed(workspace: &Path) -> bool {
    if previous_checkout_aborted(workspace) {
        warn!(
            workspace = %workspace.display(),
            "previous checkout did not finish; forcing a fresh checkout"
        );
        return false;
    }
    true
}
