//! Validate command implementation.

use crate::output;
use anyhow::{Context as _, Result};
use clap::Args;
use console::style;
use cvsync_config::{
    ConfigFormat, ConfigLoader, LegacyConfig, ScmConfig, Severity, ValidationIssue, Validator,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// Arguments for the validate command.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Job configuration file
    pub file: PathBuf,

    /// Strict mode (warnings as errors)
    #[arg(long)]
    pub strict: bool,
}

#[derive(Serialize)]
struct JsonIssue<'a> {
    severity: &'static str,
    code: &'static str,
    field: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'a str>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    valid: bool,
    legacy_format: bool,
    issues: Vec<JsonIssue<'a>>,
}

const fn severity_name(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}

/// Run the validate command.
pub fn run(args: &ValidateArgs) -> Result<ExitCode> {
    info!(file = %args.file.display(), "running validate command");

    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let format = ConfigLoader::detect_format(&content)
        .with_context(|| format!("{} is not a job file", args.file.display()))?;
    let config: ScmConfig = match format {
        ConfigFormat::Current => sonic_rs::from_str(&content)
            .with_context(|| format!("invalid job file {}", args.file.display()))?,
        ConfigFormat::Legacy => {
            let legacy: LegacyConfig = sonic_rs::from_str(&content)
                .with_context(|| format!("invalid legacy job file {}", args.file.display()))?;
            legacy.upgrade()?
        }
    };

    let result = Validator::new().strict(args.strict).validate_config(&config);
    let valid = !result.has_errors();

    if output::is_json() {
        output::print_json(&JsonReport {
            valid,
            legacy_format: format == ConfigFormat::Legacy,
            issues: result
                .issues
                .iter()
                .map(|i| JsonIssue {
                    severity: severity_name(i.severity),
                    code: i.code,
                    field: &i.field,
                    message: &i.message,
                    hint: i.hint.as_deref(),
                })
                .collect(),
        })?;
    } else {
        output::header(&format!("Validating {}...", args.file.display()));
        for issue in &result.issues {
            print_issue(issue);
        }
        if valid {
            output::success(&format!("{} is valid", args.file.display()));
        } else {
            eprintln!(
                "{} {} error(s), {} warning(s)",
                style("Invalid:").red().bold(),
                result.error_count(),
                result.warning_count()
            );
        }
    }

    Ok(if valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_issue(issue: &ValidationIssue) {
    let label = match issue.severity {
        Severity::Error => style("error").red().bold(),
        Severity::Warning => style("warning").yellow(),
        Severity::Info => style("info").dim(),
    };
    eprintln!("{label}[{}] {}: {}", issue.code, issue.field, issue.message);
    if let Some(hint) = &issue.hint {
        eprintln!("  {} {hint}", style("hint:").dim());
    }
}
