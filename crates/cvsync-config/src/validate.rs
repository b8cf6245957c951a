//! Configuration validation with descriptive errors.

use crate::error::{ConfigError, Result};
use crate::types::{CONFIG_VERSION, GlobalSettings, ScmConfig};
use cvsync_core::{Repository, UNBOUNDED_POLLING_DEPTH};
use std::collections::HashSet;

/// Highest compression level cvs accepts.
pub const MAX_COMPRESSION_LEVEL: u8 = 9;

/// Validation severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational message.
    Info,
    /// Warning (may indicate issues).
    Warning,
    /// Error (must be fixed).
    Error,
}

/// Validation issue.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity level.
    pub severity: Severity,
    /// Issue code for programmatic handling.
    pub code: &'static str,
    /// Field path (dot-notation).
    pub field: String,
    /// Human-readable message.
    pub message: String,
    /// Suggested fix.
    pub hint: Option<String>,
}

impl ValidationIssue {
    /// Create a new error.
    #[must_use]
    pub fn error(code: &'static str, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, field, message)
    }

    /// Create a new warning.
    #[must_use]
    pub fn warning(
        code: &'static str,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::with_severity(Severity::Warning, code, field, message)
    }

    /// Create a new info message.
    #[must_use]
    pub fn info(code: &'static str, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Info, code, field, message)
    }

    fn with_severity(
        severity: Severity,
        code: &'static str,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code,
            field: field.into(),
            message: message.into(),
            hint: None,
        }
    }

    /// Add a hint to the issue.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Validation result containing all issues.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// All validation issues.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Create a new empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an issue.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Add multiple issues.
    pub fn extend(&mut self, issues: impl IntoIterator<Item = ValidationIssue>) {
        self.issues.extend(issues);
    }

    /// Check if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    /// Check if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.count(Severity::Warning) > 0
    }

    /// Get error count.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Get warning count.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Issue codes in order, for assertions and reports.
    #[must_use]
    pub fn codes(&self) -> Vec<&'static str> {
        self.issues.iter().map(|i| i.code).collect()
    }

    /// Convert to result, failing if there are errors.
    pub fn into_result(self) -> Result<()> {
        if !self.has_errors() {
            return Ok(());
        }
        let errors: Vec<String> = self
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .map(|i| format!("{}: {}", i.field, i.message))
            .collect();
        Err(ConfigError::ValidationFailed {
            count: errors.len(),
            errors,
        })
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    /// Strict mode (treat warnings as errors).
    strict: bool,
}

impl Validator {
    /// Create a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable strict mode.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Validate a job configuration.
    #[must_use]
    pub fn validate_config(&self, config: &ScmConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        if config.version > CONFIG_VERSION {
            result.add(
                ValidationIssue::error(
                    "unsupported-version",
                    "version",
                    format!("version {} is newer than {CONFIG_VERSION}", config.version),
                )
                .with_hint("upgrade cvsync"),
            );
        }

        if config.repositories.is_empty() {
            result.add(
                ValidationIssue::error("no-repositories", "repositories", "no repositories configured")
                    .with_hint("add at least one repository with one module"),
            );
        }

        for (index, repo) in config.repositories.iter().enumerate() {
            self.validate_repository(repo, &format!("repositories[{index}]"), &mut result);
        }

        if config.skip_changelog && config.repositories.len() > 1 {
            result.add(ValidationIssue::info(
                "no-changelog",
                "skip-changelog",
                "change summaries are disabled for every repository",
            ));
        }

        self.finish(result)
    }

    /// Validate installation-wide settings.
    #[must_use]
    pub fn validate_settings(&self, settings: &GlobalSettings) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Some(level) = settings.compression_level {
            check_compression(level, "compression-level", &mut result);
        }
        if settings.cvs_executable.as_os_str().is_empty() {
            result.add(ValidationIssue::error(
                "empty-executable",
                "cvs-executable",
                "cvs executable is empty",
            ));
        }
        if settings.command_timeout_secs == Some(0) {
            result.add(
                ValidationIssue::warning(
                    "zero-timeout",
                    "command-timeout-secs",
                    "a zero timeout fails every command",
                )
                .with_hint("omit the field to disable the timeout"),
            );
        }

        self.finish(result)
    }

    fn validate_repository(&self, repo: &Repository, field: &str, result: &mut ValidationResult) {
        if repo.cvs_root.trim().is_empty() {
            result.add(ValidationIssue::error(
                "empty-root",
                format!("{field}.cvs-root"),
                "CVSROOT is empty",
            ));
        }

        if repo.modules.is_empty() {
            result.add(
                ValidationIssue::error("no-modules", format!("{field}.modules"), "no modules configured")
                    .with_hint("every repository needs at least one module"),
            );
        }

        let mut seen = HashSet::new();
        for (index, module) in repo.modules.iter().enumerate() {
            let module_field = format!("{field}.modules[{index}]");
            if module.remote_name.trim().is_empty() {
                result.add(ValidationIssue::error(
                    "empty-module",
                    format!("{module_field}.remote-name"),
                    "remote name is empty",
                ));
                continue;
            }
            if !seen.insert(module.remote_name.as_str()) {
                result.add(
                    ValidationIssue::error(
                        "duplicate-module",
                        format!("{module_field}.remote-name"),
                        format!("module '{}' is listed twice", module.remote_name),
                    )
                    .with_hint("use a local name to check out the same module twice in another repository"),
                );
            }
            if let Some(local) = module.local_name() {
                if std::path::Path::new(local).is_absolute() || local.split(['/', '\\']).any(|c| c == "..") {
                    result.add(ValidationIssue::error(
                        "local-name-escapes",
                        format!("{module_field}.local-name"),
                        format!("local name '{local}' leaves the workspace"),
                    ));
                }
            }
            if module.location.kind() != cvsync_core::LocationKind::Head
                && module.location.raw_name().trim().is_empty()
            {
                result.add(
                    ValidationIssue::warning(
                        "empty-reference",
                        format!("{module_field}.location.name"),
                        format!("{} name is empty; HEAD is checked out", module.location.kind()),
                    )
                    .with_hint("set a name or switch the location to head"),
                );
            }
        }

        if let Some(level) = repo.compression_level {
            check_compression(level, &format!("{field}.compression-level"), result);
        }

        if repo.polling_depth < UNBOUNDED_POLLING_DEPTH {
            result.add(
                ValidationIssue::error(
                    "polling-depth",
                    format!("{field}.polling-depth"),
                    format!("polling depth {} is below -1", repo.polling_depth),
                )
                .with_hint("use -1 for no limit"),
            );
        } else if repo.polling_depth == 0 {
            result.add(ValidationIssue::warning(
                "polling-depth-zero",
                format!("{field}.polling-depth"),
                "a polling depth of 0 never sees changes",
            ));
        }

        for (index, region) in repo.excluded_regions.iter().enumerate() {
            if let Err(err) = region.compile() {
                result.add(ValidationIssue::error(
                    "invalid-region",
                    format!("{field}.excluded-regions[{index}]"),
                    format!("invalid pattern '{}': {err}", region.pattern),
                ));
            }
        }
    }

    fn finish(&self, mut result: ValidationResult) -> ValidationResult {
        if self.strict {
            for issue in &mut result.issues {
                if issue.severity == Severity::Warning {
                    issue.severity = Severity::Error;
                }
            }
        }
        result
    }
}

fn check_compression(level: u8, field: &str, result: &mut ValidationResult) {
    if level > MAX_COMPRESSION_LEVEL {
        result.add(ValidationIssue::error(
            "compression-range",
            field,
            format!("compression level {level} is outside 0..={MAX_COMPRESSION_LEVEL}"),
        ));
    }
}
