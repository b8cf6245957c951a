//! CVS transport errors.

use std::path::PathBuf;
use thiserror::Error;

/// CVS-specific error types with detailed context.
#[derive(Error, Debug)]
pub enum VcsError {
    /// cvs reported an error not covered by another variant.
    #[error("cvs error: {message}")]
    Cvs {
        /// Error message.
        message: String,
    },

    /// Tag or branch missing from the module.
    #[error("reference '{reference}' not found in module '{module}'{}", if *partial { " (present on some files only)" } else { "" })]
    ReferenceNotFound {
        /// Tag or branch name.
        reference: String,
        /// Module path.
        module: String,
        /// The reference exists for a subset of the module's files.
        partial: bool,
    },

    /// Authentication failed.
    #[error("authentication failed for {root}: {reason}")]
    AuthenticationFailed {
        /// CVSROOT.
        root: String,
        /// Failure reason.
        reason: String,
    },

    /// Repository or module does not exist, or the server is unreachable.
    #[error("repository not reachable: {root}: {reason}")]
    RepositoryNotFound {
        /// CVSROOT.
        root: String,
        /// Failure reason.
        reason: String,
    },

    /// Malformed CVSROOT.
    #[error("invalid cvsroot '{root}': {reason}")]
    InvalidRoot {
        /// The invalid root.
        root: String,
        /// Reason it's invalid.
        reason: String,
    },

    /// IO error.
    #[error("io error at {path}: {message}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Command execution failed.
    #[error("command '{command}' failed: {message}")]
    Command {
        /// Command that failed.
        command: String,
        /// Error message.
        message: String,
        /// Exit code if available.
        exit_code: Option<i32>,
    },

    /// cvs executable not available.
    #[error("{executable} is not installed or not in PATH")]
    ToolNotAvailable {
        /// Executable name.
        executable: String,
    },

    /// Timeout.
    #[error("operation timed out after {seconds}s")]
    Timeout {
        /// Timeout in seconds.
        seconds: u64,
    },

    /// Cancelled by the host.
    #[error("operation cancelled")]
    Cancelled,
}

impl VcsError {
    /// Create an IO error.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create a reference-not-found error.
    #[must_use]
    pub fn reference_not_found(
        reference: impl Into<String>,
        module: impl Into<String>,
        partial: bool,
    ) -> Self {
        Self::ReferenceNotFound {
            reference: reference.into(),
            module: module.into(),
            partial,
        }
    }

    /// Check if this is a "not found" error for a tag or branch.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ReferenceNotFound { .. })
    }

    /// Check if this is an authentication error.
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }

    /// Everything but a missing reference is a transport failure.
    #[must_use]
    pub const fn is_transport_failure(&self) -> bool {
        !self.is_not_found()
    }
}

impl From<std::io::Error> for VcsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            message: err.to_string(),
        }
    }
}

impl From<VcsError> for cvsync_core::Error {
    fn from(err: VcsError) -> Self {
        use cvsync_core::ErrorCode;
        let code = match &err {
            VcsError::AuthenticationFailed { .. } => ErrorCode::E0302,
            VcsError::RepositoryNotFound { .. } | VcsError::InvalidRoot { .. } => ErrorCode::E0303,
            VcsError::Timeout { .. } => ErrorCode::E0304,
            VcsError::Cancelled => ErrorCode::E0305,
            _ => ErrorCode::E0301,
        };
        match err {
            VcsError::ReferenceNotFound {
                reference, module, ..
            } => Self::reference_not_found("", module, "reference", reference),
            VcsError::AuthenticationFailed { ref root, .. }
            | VcsError::RepositoryNotFound { ref root, .. }
            | VcsError::InvalidRoot { ref root, .. } => {
                Self::transport(code, root.clone(), "", err.to_string())
            }
            other => Self::transport(code, "", "", other.to_string()),
        }
    }
}

/// Result type for CVS operations.
pub type Result<T> = std::result::Result<T, VcsError>;
