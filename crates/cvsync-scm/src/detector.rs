//! Change detection against stored baselines.
//!
//! A poll asks the server for history entries newer than each module's
//! baseline, drops entries matching the repository's excluded regions and
//! reports whether anything is left. Baselines are returned, not written;
//! the caller commits them once the poll result has been acted on.
//!
//! A module whose tag or branch is missing and that allows the HEAD fallback
//! was built from HEAD, so its trunk history is polled instead.

use crate::baseline::{BaselineStore, PollBaseline};
use crate::clock::{Clock, SystemClock};
use crate::error::{PollFailure, Result, ScmError};
use cvsync_core::{
    Module, ModuleKey, ParameterContext, ParameterResolver, Repository, ResolvedLocation,
};
use cvsync_vcs::{CancellationToken, CvsTransport, HistoryEntry, HistoryQuery, VcsError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Relevant history of one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHistory {
    /// Module identity.
    pub key: ModuleKey,
    /// Entries newer than the baseline, newest first, exclusions removed.
    pub entries: Vec<HistoryEntry>,
}

/// Result of one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollResult {
    /// Whether a build should be triggered.
    pub has_changes: bool,
    /// Baselines to store once the result is acted on.
    pub updated_baselines: BTreeMap<ModuleKey, PollBaseline>,
    /// Modules with relevant entries.
    pub changes: Vec<ModuleHistory>,
}

impl PollResult {
    /// Number of relevant history entries across all modules.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.changes.iter().map(|c| c.entries.len()).sum()
    }

    /// Store the updated baselines.
    pub fn commit(&self, store: &dyn BaselineStore) -> Result<()> {
        store.put_all(&self.updated_baselines)
    }
}

/// Polls the repositories of a job for relevant changes.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    transport: Arc<dyn CvsTransport>,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

impl ChangeDetector {
    /// Create a detector over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn CvsTransport>) -> Self {
        Self {
            transport,
            clock: Arc::new(SystemClock),
            cancel: CancellationToken::new(),
        }
    }

    /// Use another clock for the upper bound of history queries.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share a cancellation token with the host.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Poll every module of `repositories`.
    ///
    /// A module without a baseline counts as changed and gets a baseline at
    /// the current time. Any transport error fails the whole poll.
    pub fn poll(
        &self,
        repositories: &[Repository],
        baselines: &dyn BaselineStore,
        context: &ParameterContext,
    ) -> std::result::Result<PollResult, PollFailure> {
        let now = self.clock.now();
        let resolver = ParameterResolver::new(context);
        let mut result = PollResult::default();

        for repo in repositories {
            let exclusions = repo.exclusions().map_err(|e| PollFailure {
                key: None,
                cause: ScmError::Exclusion {
                    repository: repo.cvs_root.clone(),
                    message: e.to_string(),
                },
            })?;
            let root = resolver.expand(&repo.cvs_root);

            for module in &repo.modules {
                let key = repo.key_for(module);
                let failure = |cause| PollFailure {
                    key: Some(repo.key_for(module)),
                    cause,
                };
                let transport_failure = |source| {
                    failure(ScmError::Transport {
                        repository: repo.cvs_root.clone(),
                        module: module.remote_name.clone(),
                        source,
                    })
                };

                let Some(baseline) = baselines.get(&key).map_err(failure)? else {
                    info!(module = %key, "no baseline recorded; treating as changed");
                    result.has_changes = true;
                    result.updated_baselines.insert(key, PollBaseline::at(now));
                    continue;
                };
                if baseline.timestamp >= now {
                    debug!(module = %key, baseline = %baseline.timestamp, "baseline not older than now");
                    result.updated_baselines.insert(key, baseline);
                    continue;
                }

                let location = resolver.resolve(&module.location);
                let revision = self
                    .history_revision(&root, module, &location)
                    .map_err(transport_failure)?;
                let query = HistoryQuery {
                    root: root.clone(),
                    module: module.remote_name.clone(),
                    revision,
                    since: baseline.timestamp,
                    until: now,
                    limit: repo.polling_limit(),
                };
                let entries = self
                    .transport
                    .query_history(&query, &self.cancel)
                    .map_err(transport_failure)?;

                let newest = entries
                    .iter()
                    .max_by_key(|e| e.timestamp)
                    .map(|e| PollBaseline::at(e.timestamp).with_revision(e.revision.clone()));
                let seen = entries.len();
                let relevant: Vec<HistoryEntry> = entries
                    .into_iter()
                    .filter(|e| !exclusions.is_excluded(&e.path))
                    .collect();

                debug!(
                    module = %key,
                    location = %location,
                    since = %baseline.timestamp,
                    seen,
                    relevant = relevant.len(),
                    "polled module"
                );

                let advanced = match newest {
                    Some(newest) => baseline.max(newest),
                    None => baseline,
                };
                result.updated_baselines.insert(key.clone(), advanced);
                if !relevant.is_empty() {
                    result.has_changes = true;
                    result.changes.push(ModuleHistory {
                        key,
                        entries: relevant,
                    });
                }
            }
        }

        info!(
            has_changes = result.has_changes,
            modules = result.updated_baselines.len(),
            entries = result.entry_count(),
            "poll complete"
        );
        Ok(result)
    }

    /// Line of development the module was built from.
    fn history_revision(
        &self,
        root: &str,
        module: &Module,
        location: &ResolvedLocation,
    ) -> std::result::Result<Option<String>, VcsError> {
        let Some(name) = location.revision_arg() else {
            return Ok(None);
        };
        if location.use_head_if_not_found
            && !self
                .transport
                .reference_exists(root, &module.remote_name, name, &self.cancel)?
        {
            debug!(
                module = %module.remote_name,
                reference = name,
                "reference missing; polling HEAD"
            );
            return Ok(None);
        }
        Ok(Some(name.to_string()))
    }
}
