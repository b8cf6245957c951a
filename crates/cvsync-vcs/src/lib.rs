//! CVS transport for cvsync.
//!
//! This crate talks to CVS servers on behalf of the checkout coordinator and
//! the change detector:
//!
//! - **Transport seam**: [`CvsTransport`] with checkout, update, history and
//!   tag listing operations
//! - **Command-line client**: [`CvsCli`] drives the `cvs` executable with
//!   timeouts and cancellation
//! - **Parsers**: `rlog` records and checkout/update status lines
//! - **Roots**: [`CvsRoot`] parses `:method:user@host:/path` strings
//!
//! # Quick Start
//!
//! ```no_run
//! use cvsync_vcs::{CancellationToken, CheckoutOptions, CheckoutRequest, CvsCli, CvsTransport};
//! use std::path::PathBuf;
//!
//! # fn main() -> cvsync_vcs::Result<()> {
//! let cvs = CvsCli::new();
//! let report = cvs.checkout(
//!     &CheckoutRequest {
//!         root: ":pserver:anonymous@cvs.example.org:/cvsroot".to_string(),
//!         module: "fooModule".to_string(),
//!         revision: Some("fooTag".to_string()),
//!         destination: PathBuf::from("/tmp/ws/fooModule"),
//!         excluded_regions: Vec::new(),
//!         options: CheckoutOptions::default(),
//!     },
//!     &CancellationToken::new(),
//! )?;
//! println!("{} files", report.changes.len());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cancel;
pub mod cli;
pub mod error;
pub mod exclude;
pub mod rlog;
pub mod root;
pub mod transport;
pub mod types;

pub use cancel::CancellationToken;
pub use cli::CvsCli;
pub use error::{Result, VcsError};
pub use rlog::ModuleLog;
pub use root::{AccessMethod, CvsRoot};
pub use transport::CvsTransport;
pub use types::{
    CheckoutOptions, CheckoutReport, CheckoutRequest, FileAction, FileChange, HistoryEntry,
    HistoryQuery, ReferenceCoverage, SymbolicName, UpdateRequest,
};
