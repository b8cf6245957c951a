//! Checkout and polling errors.

use cvsync_core::{CheckoutOutcome, ErrorCode, LocationKind, ModuleKey};
use cvsync_vcs::VcsError;
use std::path::PathBuf;
use thiserror::Error;

/// Error raised while checking out or polling one module.
#[derive(Error, Debug)]
pub enum ScmError {
    /// A tag or branch is missing and HEAD fallback is off.
    #[error("{kind} '{name}' not found in module '{module}' of {repository}{}", if *partial { " (present on some files only)" } else { "" })]
    ReferenceNotFound {
        /// Configured CVSROOT.
        repository: String,
        /// Module remote name.
        module: String,
        /// Tag or branch.
        kind: LocationKind,
        /// Resolved name.
        name: String,
        /// The reference exists on some files only.
        partial: bool,
    },

    /// The transport failed; never retried.
    #[error("transport failure for module '{module}' of {repository}: {source}")]
    Transport {
        /// Configured CVSROOT.
        repository: String,
        /// Module remote name.
        module: String,
        /// Underlying error.
        #[source]
        source: VcsError,
    },

    /// Exclusion patterns of a repository do not compile.
    #[error("invalid exclusion pattern in {repository}: {message}")]
    Exclusion {
        /// Configured CVSROOT.
        repository: String,
        /// Compiler message.
        message: String,
    },

    /// Workspace could not be prepared.
    #[error("workspace error at {path}: {message}")]
    Workspace {
        /// Offending path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Baseline store could not be read or written.
    #[error("baseline store error at {path}: {message}")]
    Baseline {
        /// Store path.
        path: PathBuf,
        /// Error message.
        message: String,
    },
}

impl ScmError {
    /// Create a workspace error.
    #[must_use]
    pub fn workspace(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Workspace {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create a baseline store error.
    #[must_use]
    pub fn baseline(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Baseline {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether the error came from the transport.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Whether a reference was missing.
    #[must_use]
    pub const fn is_reference_not_found(&self) -> bool {
        matches!(self, Self::ReferenceNotFound { .. })
    }
}

impl From<ScmError> for cvsync_core::Error {
    fn from(err: ScmError) -> Self {
        match err {
            ScmError::ReferenceNotFound {
                repository,
                module,
                kind,
                name,
                ..
            } => Self::reference_not_found(repository, module, kind.to_string(), name),
            ScmError::Transport {
                repository,
                module,
                source,
            } => match Self::from(source) {
                Self::Transport { code, message, .. } => {
                    Self::transport(code, repository, module, message)
                }
                other => other,
            },
            ScmError::Exclusion { .. } => Self::config(err.to_string()),
            ScmError::Workspace { path, message } => Self::Io {
                code: ErrorCode::E0503,
                path,
                message,
                suggestions: vec!["Remove the workspace and run a fresh checkout".to_string()],
            },
            ScmError::Baseline { .. } => Self::poll(ErrorCode::E0402, err.to_string()),
        }
    }
}

/// A checkout that stopped before every module was processed.
///
/// `outcomes` holds the modules completed before the failure, followed by
/// the failed module itself.
#[derive(Error, Debug)]
#[error("checkout failed after {count} completed module(s): {cause}", count = .outcomes.iter().filter(|o| o.success).count())]
pub struct CheckoutFailure {
    /// Per-module outcomes up to and including the failure.
    pub outcomes: Vec<CheckoutOutcome>,
    /// What went wrong.
    #[source]
    pub cause: ScmError,
}

impl CheckoutFailure {
    /// Modules that were checked out before the failure.
    pub fn completed(&self) -> impl Iterator<Item = &CheckoutOutcome> {
        self.outcomes.iter().filter(|o| o.success)
    }
}

/// A poll that could not finish; no baseline may be committed.
#[derive(Error, Debug)]
#[error("poll failed{}: {cause}", .key.as_ref().map(|k| format!(" for {k}")).unwrap_or_default())]
pub struct PollFailure {
    /// Module being polled, if the failure is module-specific.
    pub key: Option<ModuleKey>,
    /// What went wrong.
    #[source]
    pub cause: ScmError,
}

/// Result type for single-module operations.
pub type Result<T> = std::result::Result<T, ScmError>;

#[cfg(test)]
mod tests {
    use super::*;
    use cvsync_core::ResolvedLocation;

    #[test]
    fn failure_counts_completed_modules() {
        let key = ModuleKey::new(":local:/cvs", "fooModule");
        let failure = CheckoutFailure {
            outcomes: vec![
                CheckoutOutcome::succeeded(key.clone(), ResolvedLocation::head(), "a".into()),
                CheckoutOutcome::failed(key, ResolvedLocation::head(), "b".into(), "boom"),
            ],
            cause: ScmError::Transport {
                repository: ":local:/cvs".into(),
                module: "barModule".into(),
                source: VcsError::Timeout { seconds: 3 },
            },
        };
        assert_eq!(failure.completed().count(), 1);
        assert!(failure.to_string().contains("after 1 completed"));
    }

    #[test]
    fn converts_to_core() {
        let err: cvsync_core::Error = ScmError::Transport {
            repository: "root".into(),
            module: "fooModule".into(),
            source: VcsError::AuthenticationFailed {
                root: "root".into(),
                reason: "bad".into(),
            },
        }
        .into();
        assert_eq!(err.code(), ErrorCode::E0302);
        assert!(err.to_string().contains("fooModule"));

        let err: cvsync_core::Error = ScmError::ReferenceNotFound {
            repository: "root".into(),
            module: "fooModule".into(),
            kind: LocationKind::Tag,
            name: "wrongTag".into(),
            partial: false,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::E0201);
    }

    #[test]
    fn poll_failure_names_module() {
        let failure = PollFailure {
            key: Some(ModuleKey::new("root", "fooModule")),
            cause: ScmError::baseline("/tmp/b.json", "locked"),
        };
        assert!(failure.to_string().contains("root#fooModule"));
    }
}
