//! Upgrade of the single-repository configuration format.
//!
//! Older jobs stored one CVSROOT, a space-separated module list and a single
//! branch or tag for all modules. [`upgrade_legacy_config`] turns such a
//! record into the repository model; the result is not persisted until the
//! job configuration is next saved.

use crate::error::{ConfigError, Result};
use crate::types::ScmConfig;
use cvsync_core::{ExcludedRegion, Module, Repository, RevisionSelector, UNBOUNDED_POLLING_DEPTH};
use serde::{Deserialize, Serialize};

/// Job configuration as written before repositories were introduced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LegacyConfig {
    /// The only CVSROOT.
    pub cvsroot: String,
    /// Module names separated by spaces; `\ ` is a literal space.
    pub module: String,
    /// Branch or tag shared by all modules; empty means HEAD.
    #[serde(default)]
    pub branch: Option<String>,
    /// `CVS_RSH` override. Not carried over.
    #[serde(default)]
    pub cvs_rsh: Option<String>,
    /// Update an existing checkout.
    #[serde(default)]
    pub can_use_update: bool,
    /// Fall back to HEAD when the tag is missing.
    #[serde(default)]
    pub use_head_if_not_found: bool,
    /// Legacy directory layout.
    #[serde(default)]
    pub legacy: bool,
    /// `branch` names a tag rather than a branch.
    #[serde(default)]
    pub is_tag: bool,
    /// Exclusion patterns separated by line breaks.
    #[serde(default)]
    pub excluded_regions: Option<String>,
}

impl LegacyConfig {
    /// Upgrade into a full job configuration.
    pub fn upgrade(&self) -> Result<ScmConfig> {
        let repositories = upgrade_legacy_config(self)?;
        Ok(ScmConfig {
            repositories,
            can_use_update: self.can_use_update,
            legacy: self.legacy,
            ..ScmConfig::default()
        })
    }
}

/// Convert a legacy record into a single repository.
///
/// Every module gets the same location, no local name, a
/// `password_required` of false and no compression level.
pub fn upgrade_legacy_config(legacy: &LegacyConfig) -> Result<Vec<Repository>> {
    let root = legacy.cvsroot.trim();
    if root.is_empty() {
        return Err(ConfigError::legacy("'cvsroot' is empty"));
    }

    let names = split_modules(&legacy.module);
    if names.is_empty() {
        return Err(ConfigError::legacy("'module' lists no modules"));
    }

    let location = legacy_location(legacy);
    let mut repository = Repository::new(root).with_polling_depth(UNBOUNDED_POLLING_DEPTH);
    repository.modules = names
        .into_iter()
        .map(|name| Module::new(name, location.clone()))
        .collect();
    repository.excluded_regions = split_regions(legacy.excluded_regions.as_deref());

    if legacy.cvs_rsh.as_deref().is_some_and(|rsh| !rsh.is_empty()) {
        tracing::warn!(
            cvsroot = %root,
            "legacy CVS_RSH setting is not carried over; configure the rsh client globally"
        );
    }

    tracing::info!(
        cvsroot = %root,
        modules = repository.modules.len(),
        location = %location.kind(),
        "upgraded legacy configuration"
    );

    Ok(vec![repository])
}

fn legacy_location(legacy: &LegacyConfig) -> RevisionSelector {
    match legacy.branch.as_deref() {
        None | Some("") => RevisionSelector::Head,
        Some(name) if legacy.is_tag => RevisionSelector::tag(name, legacy.use_head_if_not_found),
        Some(name) => RevisionSelector::branch(name, legacy.use_head_if_not_found),
    }
}

/// Split on unescaped spaces, unescaping `\ ` to a space.
fn split_modules(raw: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&' ') => {
                current.push(' ');
                chars.next();
            }
            ' ' => {
                if !current.is_empty() {
                    names.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        names.push(current);
    }
    names
}

fn split_regions(raw: Option<&str>) -> Vec<ExcludedRegion> {
    raw.unwrap_or_default()
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ExcludedRegion::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvsync_core::LocationKind;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn legacy(branch: &str, is_tag: bool) -> LegacyConfig {
        LegacyConfig {
            cvsroot: ":pserver:cvsuser:cvs@localhost:/var/lib/cvs".into(),
            module: "test_module".into(),
            branch: Some(branch.into()),
            cvs_rsh: Some("cvsRsh".into()),
            can_use_update: true,
            use_head_if_not_found: true,
            legacy: true,
            is_tag,
            excluded_regions: None,
        }
    }

    #[test]
    fn upgrades_module_list_and_regions() {
        let config = LegacyConfig {
            cvsroot: "cvsroot".into(),
            module: r"module1 module2 module\ 3".into(),
            branch: Some(String::new()),
            cvs_rsh: Some("cvsRsh".into()),
            can_use_update: true,
            use_head_if_not_found: false,
            legacy: true,
            is_tag: false,
            excluded_regions: Some("excludedRegions\rregion2".into()),
        };

        let repositories = upgrade_legacy_config(&config).unwrap();
        assert_eq!(repositories.len(), 1);

        let repo = &repositories[0];
        assert_eq!(repo.cvs_root, "cvsroot");
        assert!(!repo.password_required);
        assert_eq!(repo.compression_level, None);
        assert_eq!(repo.polling_depth, -1);
        assert_eq!(
            repo.excluded_regions,
            vec![
                ExcludedRegion::new("excludedRegions"),
                ExcludedRegion::new("region2")
            ]
        );

        let names: Vec<_> = repo.modules.iter().map(|m| m.remote_name.as_str()).collect();
        assert_eq!(names, vec!["module1", "module2", "module 3"]);
        for module in &repo.modules {
            assert_eq!(module.local_name(), None);
            assert_eq!(module.location, RevisionSelector::Head);
        }
    }

    #[rstest]
    #[case(false, LocationKind::Branch)]
    #[case(true, LocationKind::Tag)]
    fn branch_or_tag(#[case] is_tag: bool, #[case] expected: LocationKind) {
        let config = legacy("test_branch", is_tag).upgrade().unwrap();

        assert!(config.can_use_update);
        assert!(config.legacy);

        let modules = &config.repositories[0].modules;
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].remote_name, "test_module");
        assert_eq!(modules[0].location.kind(), expected);
        assert_eq!(modules[0].location.raw_name(), "test_branch");
        assert!(modules[0].location.use_head_if_not_found());
    }

    #[test]
    fn missing_branch_is_head() {
        let mut config = legacy("", false);
        config.branch = None;
        let repos = upgrade_legacy_config(&config).unwrap();
        assert_eq!(repos[0].modules[0].location, RevisionSelector::Head);
    }

    #[rstest]
    #[case("", "module")]
    #[case("   ", "module")]
    #[case(":local:/cvs", "")]
    #[case(":local:/cvs", "   ")]
    fn rejects_empty_fields(#[case] root: &str, #[case] module: &str) {
        let config = LegacyConfig {
            cvsroot: root.into(),
            module: module.into(),
            ..LegacyConfig::default()
        };
        assert!(matches!(
            upgrade_legacy_config(&config),
            Err(ConfigError::LegacyUpgrade { .. })
        ));
    }

    #[rstest]
    #[case("a  b", &["a", "b"])]
    #[case(r"a\ b", &["a b"])]
    #[case(r"dir\path b", &[r"dir\path", "b"])]
    #[case(" lead trail ", &["lead", "trail"])]
    fn module_splitting(#[case] raw: &str, #[case] expected: &[&str]) {
        assert_eq!(split_modules(raw), expected);
    }

    #[test]
    fn regions_skip_blank_lines() {
        let regions = split_regions(Some("a\r\n\nb\n"));
        assert_eq!(regions, vec![ExcludedRegion::new("a"), ExcludedRegion::new("b")]);
        assert!(split_regions(None).is_empty());
    }
}
