//! Error types for configuration management.

// False positive warnings from thiserror macro expansion
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration error type with rich diagnostics.
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    #[diagnostic(code(config::not_found), help("create the file or check the path"))]
    NotFound {
        /// Path that was not found.
        path: PathBuf,
    },

    /// Invalid JSON syntax.
    #[error("invalid JSON in {path}: {message}")]
    #[diagnostic(
        code(config::invalid_json),
        help("check JSON syntax at line {line}, column {column}")
    )]
    InvalidJson {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
        /// Line number (1-indexed).
        line: usize,
        /// Column number (1-indexed).
        column: usize,
    },

    /// Invalid field value.
    #[error("invalid value for '{field}': {message}")]
    #[diagnostic(code(config::invalid_value), help("{hint}"))]
    InvalidValue {
        /// Field name.
        field: String,
        /// Error message.
        message: String,
        /// Help hint.
        hint: String,
    },

    /// Legacy single-module configuration could not be upgraded.
    #[error("cannot upgrade legacy configuration: {message}")]
    #[diagnostic(
        code(config::legacy_upgrade),
        help("check the 'cvsroot' and 'module' fields of the legacy configuration")
    )]
    LegacyUpgrade {
        /// What is wrong.
        message: String,
    },

    /// Unsupported document version.
    #[error("unsupported configuration version {found} (expected at most {supported})")]
    #[diagnostic(code(config::version), help("upgrade cvsync or rewrite the file"))]
    UnsupportedVersion {
        /// Version in the file.
        found: u32,
        /// Newest version understood.
        supported: u32,
    },

    /// IO error.
    #[error("IO error at {path}: {message}")]
    #[diagnostic(code(config::io_error))]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Environment variable error.
    #[error("invalid environment variable {var}: {message}")]
    #[diagnostic(code(config::env_error))]
    EnvError {
        /// Variable name.
        var: String,
        /// Error message.
        message: String,
    },

    /// Validation error with multiple issues.
    #[error("configuration validation failed with {count} error(s)")]
    #[diagnostic(code(config::validation_failed), help("{}", errors.join("; ")))]
    ValidationFailed {
        /// Number of errors.
        count: usize,
        /// Individual errors.
        errors: Vec<String>,
    },

    /// Permission denied.
    #[error("permission denied: {path}")]
    #[diagnostic(code(config::permission_denied), help("check file permissions"))]
    PermissionDenied {
        /// File path.
        path: PathBuf,
    },
}

impl ConfigError {
    /// Create an IO error with context.
    #[must_use]
    #[allow(unused_assignments)]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound { path };
        }
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied { path };
        }
        Self::Io {
            path,
            message: err.to_string(),
        }
    }

    /// Create a JSON parse error with location.
    #[must_use]
    pub fn json(path: impl Into<PathBuf>, err: &sonic_rs::Error) -> Self {
        Self::InvalidJson {
            path: path.into(),
            message: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }

    /// Create an invalid value error.
    #[must_use]
    pub fn invalid_value(
        field: impl Into<String>,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Create a legacy upgrade error.
    #[must_use]
    pub fn legacy(message: impl Into<String>) -> Self {
        Self::LegacyUpgrade {
            message: message.into(),
        }
    }

    /// Check if error is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<sonic_rs::Error> for ConfigError {
    #[allow(unused_assignments)]
    fn from(err: sonic_rs::Error) -> Self {
        Self::InvalidJson {
            path: PathBuf::new(),
            message: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }
}

impl From<ConfigError> for cvsync_core::Error {
    fn from(err: ConfigError) -> Self {
        let code = match &err {
            ConfigError::LegacyUpgrade { .. } => cvsync_core::ErrorCode::E0102,
            _ => cvsync_core::ErrorCode::E0101,
        };
        Self::Config {
            code,
            message: err.to_string(),
            suggestions: vec!["Run 'cvsync validate' to list every issue".to_string()],
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
