//! The transport seam between cvsync and a CVS server.

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::types::{
    CheckoutReport, CheckoutRequest, HistoryEntry, HistoryQuery, ReferenceCoverage, SymbolicName,
    UpdateRequest,
};

/// Remote CVS operations.
///
/// Every call blocks until the server answers, the token is cancelled, or a
/// timeout fires. Implementations do not retry.
///
/// `checkout` and `update` with a revision fail with
/// [`VcsError::ReferenceNotFound`](crate::VcsError::ReferenceNotFound) when
/// the revision is missing from the module. Without `options.head_fallback`
/// they also fail when it covers the module only partially; with it, HEAD
/// fills the files the revision lacks.
pub trait CvsTransport: std::fmt::Debug + Send + Sync {
    /// Check a module out into `request.destination`.
    fn checkout(&self, request: &CheckoutRequest, cancel: &CancellationToken) -> Result<CheckoutReport>;

    /// Update an existing checkout in place.
    fn update(&self, request: &UpdateRequest, cancel: &CancellationToken) -> Result<CheckoutReport>;

    /// Revisions committed in `(query.since, query.until]`, newest first,
    /// truncated to `query.limit`.
    fn query_history(&self, query: &HistoryQuery, cancel: &CancellationToken) -> Result<Vec<HistoryEntry>>;

    /// Every tag and branch attached to the module's files.
    fn list_symbolic_names(
        &self,
        root: &str,
        module: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<SymbolicName>>;

    /// How much of the module `reference` covers.
    fn reference_coverage(
        &self,
        root: &str,
        module: &str,
        reference: &str,
        cancel: &CancellationToken,
    ) -> Result<ReferenceCoverage>;

    /// Whether `reference` exists on at least one file of the module.
    fn reference_exists(
        &self,
        root: &str,
        module: &str,
        reference: &str,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        Ok(self.reference_coverage(root, module, reference, cancel)? != ReferenceCoverage::Missing)
    }
}
