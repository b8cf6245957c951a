//! Testing utilities for cvsync.
//!
//! - [`mock_cvs`]: an in-memory CVS server implementing the transport seam
//! - [`fixtures`]: the reference repository with `fooModule` and `barModule`
//! - [`assertions`]: checks on checked-out workspaces
//!
//! # Example
//!
//! ```rust,no_run
//! use cvsync_test_utils::prelude::*;
//! use cvsync_test_utils::prelude::assert_eq;
//! use cvsync_vcs::{CancellationToken, CvsTransport, ReferenceCoverage};
//!
//! let server = Fixtures::server();
//! let coverage = server
//!     .reference_coverage(Fixtures::ROOT, Fixtures::FOO_MODULE, Fixtures::FOO_TAG, &CancellationToken::new())
//!     .unwrap();
//! assert_eq!(coverage, ReferenceCoverage::Full);
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod assertions;
pub mod fixtures;
pub mod mock_cvs;

/// Re-export commonly used testing utilities.
pub mod prelude {
    pub use crate::assertions::*;
    pub use crate::fixtures::Fixtures;
    pub use crate::mock_cvs::{MockCall, MockCvsServer, MockFailure};

    pub use pretty_assertions::{assert_eq, assert_ne};
}
