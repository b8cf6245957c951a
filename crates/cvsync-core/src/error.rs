//! Error types shared across cvsync.
//!
//! Each error has:
//! - A unique error code (e.g., E0201) for easy reference and searching
//! - A clear error message naming the repository, module or revision involved
//! - Suggestions for how to fix the issue

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for cvsync errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Configuration errors (E01xx)
    /// Invalid configuration
    E0101,
    /// Legacy configuration could not be upgraded
    E0102,
    /// Duplicate module name within a repository
    E0103,

    // Reference errors (E02xx)
    /// Tag or branch not found
    E0201,

    // Transport errors (E03xx)
    /// CVS command failed
    E0301,
    /// Authentication failed
    E0302,
    /// Repository unreachable
    E0303,
    /// Transport timed out
    E0304,
    /// Operation cancelled
    E0305,

    // Polling errors (E04xx)
    /// Poll failed, baseline kept
    E0401,
    /// Baseline store unreadable or unwritable
    E0402,

    // Workspace and IO errors (E05xx)
    /// File not found
    E0501,
    /// Permission denied
    E0502,
    /// Workspace in an unusable state
    E0503,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::E0101 => "E0101",
            Self::E0102 => "E0102",
            Self::E0103 => "E0103",
            Self::E0201 => "E0201",
            Self::E0301 => "E0301",
            Self::E0302 => "E0302",
            Self::E0303 => "E0303",
            Self::E0304 => "E0304",
            Self::E0305 => "E0305",
            Self::E0401 => "E0401",
            Self::E0402 => "E0402",
            Self::E0501 => "E0501",
            Self::E0502 => "E0502",
            Self::E0503 => "E0503",
        }
    }

    /// Get a brief title for this error code.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::E0101 => "Invalid configuration",
            Self::E0102 => "Legacy upgrade failed",
            Self::E0103 => "Duplicate module",
            Self::E0201 => "Reference not found",
            Self::E0301 => "CVS command failed",
            Self::E0302 => "Authentication failed",
            Self::E0303 => "Repository unreachable",
            Self::E0304 => "Transport timeout",
            Self::E0305 => "Cancelled",
            Self::E0401 => "Poll failed",
            Self::E0402 => "Baseline store error",
            Self::E0501 => "File not found",
            Self::E0502 => "Permission denied",
            Self::E0503 => "Workspace error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for cvsync.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error, detected at load or upgrade time.
    #[error("[{code}] configuration error: {message}")]
    Config {
        /// Error code.
        code: ErrorCode,
        /// Error message.
        message: String,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// A tag or branch does not exist for the module.
    #[error("[E0201] {kind} '{name}' not found in module '{module}' of {repository}")]
    ReferenceNotFound {
        /// Repository root.
        repository: String,
        /// Module remote name.
        module: String,
        /// `tag` or `branch`.
        kind: String,
        /// Reference name.
        name: String,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// Transport-level failure (auth, network, protocol, timeout).
    #[error("[{code}] transport failure for module '{module}' of {repository}: {message}")]
    Transport {
        /// Error code.
        code: ErrorCode,
        /// Repository root.
        repository: String,
        /// Module remote name.
        module: String,
        /// Error message.
        message: String,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// Polling failed; the previous baseline stays in place.
    #[error("[{code}] poll failed: {message}")]
    Poll {
        /// Error code.
        code: ErrorCode,
        /// Error message.
        message: String,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// JSON error.
    #[error("[E0101] json error: {0}")]
    Json(#[from] sonic_rs::Error),

    /// IO error.
    #[error("[{code}] io error at {path}: {message}")]
    Io {
        /// Error code.
        code: ErrorCode,
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },
}

impl Error {
    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Config { code, .. }
            | Self::Transport { code, .. }
            | Self::Poll { code, .. }
            | Self::Io { code, .. } => *code,
            Self::ReferenceNotFound { .. } => ErrorCode::E0201,
            Self::Json(_) => ErrorCode::E0101,
        }
    }

    /// Get suggestions for fixing the error.
    #[must_use]
    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::Config { suggestions, .. }
            | Self::ReferenceNotFound { suggestions, .. }
            | Self::Transport { suggestions, .. }
            | Self::Poll { suggestions, .. }
            | Self::Io { suggestions, .. } => suggestions,
            Self::Json(_) => &[],
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::E0101,
            message: message.into(),
            suggestions: vec!["Run 'cvsync validate' to list every issue".to_string()],
        }
    }

    /// Create a reference-not-found error.
    #[must_use]
    pub fn reference_not_found(
        repository: impl Into<String>,
        module: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self::ReferenceNotFound {
            repository: repository.into(),
            module: module.into(),
            kind: kind.into(),
            suggestions: vec![
                format!("List the available tags with 'cvsync tags' and check '{name}'"),
                "Enable 'use-head-if-not-found' to fall back to HEAD".to_string(),
            ],
            name,
        }
    }

    /// Create a transport error.
    #[must_use]
    pub fn transport(
        code: ErrorCode,
        repository: impl Into<String>,
        module: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let suggestions = match code {
            ErrorCode::E0302 => vec![
                "Run 'cvs login' for pserver roots".to_string(),
                "Check the user name in the CVSROOT".to_string(),
            ],
            ErrorCode::E0303 => vec!["Check the host and path of the CVSROOT".to_string()],
            ErrorCode::E0304 => vec!["Raise the command timeout in the global settings".to_string()],
            _ => Vec::new(),
        };
        Self::Transport {
            code,
            repository: repository.into(),
            module: module.into(),
            message: message.into(),
            suggestions,
        }
    }

    /// Create a poll error.
    #[must_use]
    pub fn poll(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Poll {
            code,
            message: message.into(),
            suggestions: vec!["The previous baseline was kept; the next poll retries".to_string()],
        }
    }

    /// Create an IO error with context.
    #[must_use]
    #[allow(clippy::needless_pass_by_value)]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let (code, suggestions) = match err.kind() {
            std::io::ErrorKind::NotFound => (
                ErrorCode::E0501,
                vec![format!("Check if the path exists: {}", path.display())],
            ),
            std::io::ErrorKind::PermissionDenied => (
                ErrorCode::E0502,
                vec![format!("Check permissions on: {}", path.display())],
            ),
            _ => (
                ErrorCode::E0503,
                vec![format!("Check the workspace: {}", path.display())],
            ),
        };
        Self::Io {
            code,
            path,
            message: err.to_string(),
            suggestions,
        }
    }
}

/// Result type for cvsync operations.
pub type Result<T> = std::result::Result<T, Error>;
