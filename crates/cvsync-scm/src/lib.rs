//! Checkout coordination and change detection for cvsync.
//!
//! This crate drives a [`CvsTransport`](cvsync_vcs::CvsTransport) on behalf
//! of a build:
//!
//! - **Checkout**: [`CheckoutCoordinator`] places every module of a job in
//!   the workspace, with HEAD fallback and the `CVS_BRANCH` projection
//! - **Polling**: [`ChangeDetector`] compares server history with stored
//!   [`PollBaseline`]s and ignores excluded regions
//! - **Baselines**: in-memory and locked JSON file stores
//! - **Workspace**: in-progress marker that forces a fresh checkout after an
//!   aborted one
//!
//! # Quick Start
//!
//! ```no_run
//! use cvsync_config::{GlobalSettings, ScmConfig};
//! use cvsync_core::{Module, ParameterContext, Repository, RevisionSelector};
//! use cvsync_scm::{CheckoutCoordinator, CheckoutMode};
//! use cvsync_vcs::CvsCli;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let repo = Repository::new(":pserver:anonymous@cvs.example.org:/cvsroot")
//!     .with_module(Module::new("fooModule", RevisionSelector::tag("fooTag", true)));
//! let coordinator = CheckoutCoordinator::new(Arc::new(CvsCli::new()), GlobalSettings::default());
//! let result = coordinator.checkout(
//!     &ScmConfig::new(vec![repo]),
//!     &ParameterContext::from_process_env(),
//!     Path::new("/tmp/ws"),
//!     CheckoutMode::Fresh,
//! );
//! if let Ok(result) = result {
//!     println!("CVS_BRANCH = {:?}", result.environment.get("CVS_BRANCH"));
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod baseline;
pub mod changelog;
pub mod clock;
pub mod coordinator;
pub mod detector;
pub mod error;
pub mod workspace;

pub use baseline::{BaselineStore, FileBaselineStore, MemoryBaselineStore, PollBaseline};
pub use changelog::{CHANGELOG_FILE, ChangeSummary, ModuleChanges};
pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{CheckoutCoordinator, CheckoutMode, CheckoutResult};
pub use detector::{ChangeDetector, ModuleHistory, PollResult};
pub use error::{CheckoutFailure, PollFailure, Result, ScmError};
pub use workspace::{IN_PROGRESS_MARKER, previous_checkout_aborted};
