//! Assertion helpers for checked-out workspaces.

use anyhow::{Context, Result, bail};
use std::path::Path;

/// Assert that `dir` holds `file` with `content`.
pub fn assert_file_content(dir: &Path, file: &str, content: &str) -> Result<()> {
    let path = dir.join(file);
    let actual = std::fs::read_to_string(&path)
        .with_context(|| format!("{} was not checked out", path.display()))?;
    if actual != content {
        bail!(
            "unexpected content in {}: expected {content:?}, found {actual:?}",
            path.display()
        );
    }
    Ok(())
}

/// Assert that every file exists below `dir`.
pub fn assert_checked_out(dir: &Path, files: &[&str]) -> Result<()> {
    for file in files {
        let path = dir.join(file);
        if !path.is_file() {
            bail!("{} should have been checked out", path.display());
        }
    }
    Ok(())
}

/// Assert that none of the files exist below `dir`.
pub fn assert_not_checked_out(dir: &Path, files: &[&str]) -> Result<()> {
    for file in files {
        let path = dir.join(file);
        if path.exists() {
            bail!("{} should not have been checked out", path.display());
        }
    }
    Ok(())
}

/// Assert that `dir` is the working copy of a module.
pub fn assert_working_copy(dir: &Path, module: &str) -> Result<()> {
    let repository = dir.join("CVS").join("Repository");
    let recorded = std::fs::read_to_string(&repository)
        .with_context(|| format!("{} is not a working copy", dir.display()))?;
    if recorded.trim() != module {
        bail!(
            "{} is a working copy of {}, not {module}",
            dir.display(),
            recorded.trim()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn content_and_presence() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("head.txt"), "head").unwrap();

        assert_file_content(dir.path(), "head.txt", "head").unwrap();
        assert!(assert_file_content(dir.path(), "head.txt", "tag").is_err());
        assert_checked_out(dir.path(), &["head.txt"]).unwrap();
        assert_not_checked_out(dir.path(), &["tag.txt"]).unwrap();
        assert!(assert_not_checked_out(dir.path(), &["head.txt"]).is_err());
        assert!(assert_working_copy(dir.path(), "fooModule").is_err());
    }
}
