//! Applying exclusion filters to a checkout.

use crate::error::{Result, VcsError};
use crate::types::CheckoutReport;
use cvsync_core::{ExcludedRegion, ExclusionSet};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Compile regions, mapping a bad pattern to a transport error.
///
/// # Errors
/// Returns an error if a pattern is not a valid regular expression.
pub fn compile(regions: &[ExcludedRegion]) -> Result<ExclusionSet> {
    ExclusionSet::compile(regions).map_err(|e| VcsError::Cvs {
        message: format!("invalid exclusion pattern: {e}"),
    })
}

/// Delete excluded files below `dir` and drop them from `report`.
///
/// Paths are matched relative to `dir` with `/` separators. CVS admin
/// directories are never touched.
///
/// # Errors
/// Returns an error if a pattern is invalid or a file cannot be removed.
pub fn apply(dir: &Path, regions: &[ExcludedRegion], report: &mut CheckoutReport) -> Result<()> {
    if regions.is_empty() {
        return Ok(());
    }
    let set = compile(regions)?;
    report.changes.retain(|c| !set.is_excluded(&c.path));

    if !dir.exists() {
        return Ok(());
    }
    let walker = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == "CVS"));
    for entry in walker {
        let entry = entry.map_err(|e| VcsError::Cvs {
            message: format!("failed to walk {}: {e}", dir.display()),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        if set.is_excluded(&relative) {
            debug!(path = %relative, "removing excluded file");
            std::fs::remove_file(entry.path()).map_err(|e| VcsError::io(entry.path(), e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileAction, FileChange};

    #[test]
    fn removes_matching_files_and_report_entries() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("docs")).unwrap();
        std::fs::create_dir_all(temp.path().join("CVS")).unwrap();
        std::fs::write(temp.path().join("keep.txt"), "a").unwrap();
        std::fs::write(temp.path().join("docs/drop.txt"), "b").unwrap();
        std::fs::write(temp.path().join("CVS/Entries"), "").unwrap();

        let mut report = CheckoutReport {
            changes: vec![
                FileChange {
                    path: "keep.txt".into(),
                    action: FileAction::Updated,
                },
                FileChange {
                    path: "docs/drop.txt".into(),
                    action: FileAction::Updated,
                },
            ],
            head_fallback_used: false,
        };
        let regions = [ExcludedRegion::new("docs/.*"), ExcludedRegion::new("CVS/.*")];
        apply(temp.path(), &regions, &mut report).unwrap();

        assert!(temp.path().join("keep.txt").exists());
        assert!(!temp.path().join("docs/drop.txt").exists());
        assert!(temp.path().join("CVS/Entries").exists());
        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes[0].path, "keep.txt");
    }

    #[test]
    fn invalid_pattern() {
        let mut report = CheckoutReport::default();
        let err = apply(Path::new("."), &[ExcludedRegion::new("(")], &mut report).unwrap_err();
        assert!(err.to_string().contains("invalid exclusion pattern"));
    }
}
