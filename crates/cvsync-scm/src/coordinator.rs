//! Checkout of every module of a job for one build.
//!
//! Modules of one repository are processed in declared order. Independent
//! repositories may run on the rayon pool when the job enables
//! `parallel-repositories`; they own disjoint workspace subtrees.
//!
//! With `use-head-if-not-found`, a tag or branch missing from the module is
//! retried once against HEAD. One that covers the module only partially is
//! retried with cvs' `-f` flag, which serves HEAD for every file lacking the
//! revision. The outcome keeps the requested location. Transport failures are
//! never retried and abort the checkout.

use crate::baseline::PollBaseline;
use crate::changelog::{ChangeSummary, ModuleChanges};
use crate::clock::{Clock, SystemClock};
use crate::error::{CheckoutFailure, Result, ScmError};
use crate::workspace::{self, CheckoutMarker};
use chrono::{DateTime, Utc};
use cvsync_config::{GlobalSettings, ScmConfig};
use cvsync_core::{
    BuildEnvironmentDelta, CheckoutOutcome, EnvironmentProjector, Module, ModuleKey,
    ParameterContext, ParameterResolver, Repository, ResolvedLocation,
};
use cvsync_vcs::{
    CancellationToken, CheckoutOptions, CheckoutReport, CheckoutRequest, CvsTransport,
    UpdateRequest, VcsError,
};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// How the build wants its workspace prepared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutMode {
    /// Wipe each module directory and check out from scratch.
    #[default]
    Fresh,
    /// Update existing working copies in place where the job allows it.
    Update,
}

/// Everything a successful checkout produced.
#[derive(Debug, Clone)]
pub struct CheckoutResult {
    /// Environment entries for the build.
    pub environment: BuildEnvironmentDelta,
    /// One outcome per module in checkout order.
    pub outcomes: Vec<CheckoutOutcome>,
    /// Baselines for the next poll, one per module.
    pub baselines: BTreeMap<ModuleKey, PollBaseline>,
    /// Touched files; `None` when the job skips the changelog.
    pub summary: Option<ChangeSummary>,
}

/// Per-build state shared by every repository.
struct Job<'a> {
    config: &'a ScmConfig,
    resolver: ParameterResolver<'a>,
    workspace: &'a Path,
    update: bool,
    flatten: bool,
}

struct CheckedOut {
    outcome: CheckoutOutcome,
    changes: ModuleChanges,
}

#[derive(Default)]
struct RepositoryRun {
    modules: Vec<CheckedOut>,
    failure: Option<(CheckoutOutcome, ScmError)>,
}

/// Checks out the modules of a job.
#[derive(Debug, Clone)]
pub struct CheckoutCoordinator {
    transport: Arc<dyn CvsTransport>,
    settings: GlobalSettings,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

impl CheckoutCoordinator {
    /// Create a coordinator over `transport` with installation settings.
    #[must_use]
    pub fn new(transport: Arc<dyn CvsTransport>, settings: GlobalSettings) -> Self {
        Self {
            transport,
            settings,
            clock: Arc::new(SystemClock),
            cancel: CancellationToken::new(),
        }
    }

    /// Use another clock for baselines.
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

    /// Token that aborts in-flight transport calls.
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Check out or update every module of `config` below `workspace`.
    pub fn checkout(
        &self,
        config: &ScmConfig,
        context: &ParameterContext,
        workspace: &Path,
        mode: CheckoutMode,
    ) -> std::result::Result<CheckoutResult, CheckoutFailure> {
        let started = self.clock.now();
        let update = match mode {
            CheckoutMode::Fresh => false,
            CheckoutMode::Update if !config.can_use_update => {
                debug!("update requested but disabled for this job; checking out fresh");
                false
            }
            CheckoutMode::Update => workspace::update_allowed(workspace),
        };

        let marker = CheckoutMarker::begin(workspace).map_err(|cause| CheckoutFailure {
            outcomes: Vec::new(),
            cause,
        })?;

        let job = Job {
            config,
            resolver: ParameterResolver::new(context),
            workspace,
            update,
            flatten: config.is_flatten(),
        };

        info!(
            workspace = %workspace.display(),
            repositories = config.repositories.len(),
            update,
            flatten = job.flatten,
            "starting checkout"
        );

        let runs: Vec<RepositoryRun> =
            if config.parallel_repositories && config.repositories.len() > 1 {
                config
                    .repositories
                    .par_iter()
                    .map(|repo| self.checkout_repository(&job, repo))
                    .collect()
            } else {
                let mut runs = Vec::with_capacity(config.repositories.len());
                for repo in &config.repositories {
                    let run = self.checkout_repository(&job, repo);
                    let failed = run.failure.is_some();
                    runs.push(run);
                    if failed {
                        break;
                    }
                }
                runs
            };

        let mut outcomes = Vec::new();
        let mut modules = Vec::new();
        let mut cause = None;
        for run in runs {
            for checked_out in run.modules {
                outcomes.push(checked_out.outcome);
                modules.push(checked_out.changes);
            }
            if let Some((outcome, err)) = run.failure {
                outcomes.push(outcome);
                cause.get_or_insert(err);
            }
        }

        if let Some(cause) = cause {
            error!(
                completed = outcomes.iter().filter(|o| o.success).count(),
                "checkout failed: {cause}"
            );
            return Err(CheckoutFailure { outcomes, cause });
        }

        if let Err(cause) = marker.complete() {
            return Err(CheckoutFailure { outcomes, cause });
        }

        Ok(self.finish(config, started, outcomes, modules))
    }

    fn finish(
        &self,
        config: &ScmConfig,
        started: DateTime<Utc>,
        outcomes: Vec<CheckoutOutcome>,
        modules: Vec<ModuleChanges>,
    ) -> CheckoutResult {
        let environment = EnvironmentProjector.project(&outcomes);
        let baselines = outcomes
            .iter()
            .map(|o| (o.key.clone(), PollBaseline::at(started)))
            .collect();
        let summary = (!config.skip_changelog).then(|| ChangeSummary {
            started_at: started,
            modules,
        });

        info!(
            modules = outcomes.len(),
            fallbacks = outcomes.iter().filter(|o| o.fell_back_to_head).count(),
            cvs_branch = environment.get(cvsync_core::CVS_BRANCH).unwrap_or("<unset>"),
            "checkout complete"
        );

        CheckoutResult {
            environment,
            outcomes,
            baselines,
            summary,
        }
    }

    fn checkout_repository(&self, job: &Job<'_>, repo: &Repository) -> RepositoryRun {
        let root = job.resolver.expand(&repo.cvs_root);
        let mut run = RepositoryRun::default();

        for module in &repo.modules {
            let key = repo.key_for(module);
            let location = job.resolver.resolve(&module.location);
            let relative = module.checkout_dir(job.flatten);

            let attempt = if self.cancel.is_cancelled() {
                Err(ScmError::Transport {
                    repository: repo.cvs_root.clone(),
                    module: module.remote_name.clone(),
                    source: VcsError::Cancelled,
                })
            } else {
                self.checkout_module(job, repo, &root, module, &location, &relative)
            };

            match attempt {
                Ok((report, updated)) => {
                    let mut outcome =
                        CheckoutOutcome::succeeded(key.clone(), location.clone(), relative.clone());
                    if report.head_fallback_used {
                        outcome = outcome.with_head_fallback();
                    }
                    info!(
                        repository = %repo.cvs_root,
                        module = %module.remote_name,
                        location = %location,
                        directory = %relative.display(),
                        files = report.changes.len(),
                        updated,
                        "checked out module"
                    );
                    run.modules.push(CheckedOut {
                        outcome,
                        changes: ModuleChanges {
                            key,
                            location,
                            directory: relative,
                            updated,
                            changes: report.changes,
                        },
                    });
                }
                Err(cause) => {
                    let outcome =
                        CheckoutOutcome::failed(key, location, relative, cause.to_string());
                    run.failure = Some((outcome, cause));
                    break;
                }
            }
        }
        run
    }

    /// Check out one module; returns the report and whether it was an update.
    fn checkout_module(
        &self,
        job: &Job<'_>,
        repo: &Repository,
        root: &str,
        module: &Module,
        location: &ResolvedLocation,
        relative: &Path,
    ) -> Result<(CheckoutReport, bool)> {
        let dir = job.workspace.join(relative);
        if !location.is_head() && location.name.is_empty() {
            warn!(
                module = %module.remote_name,
                kind = %location.kind,
                "location resolved to an empty name; checking out HEAD"
            );
        }

        let update = job.update && workspace::is_working_copy(&dir);
        if !update {
            workspace::clear_directory(&dir)?;
        }

        let options = CheckoutOptions {
            compression_level: repo.effective_compression(self.settings.compression_level),
            prune_empty_directories: job.config.prune_empty_directories,
            quiet: !job.config.disable_cvs_quiet,
            head_fallback: false,
        };
        let transport_call = |revision: Option<&str>, head_fallback: bool| {
            let options = CheckoutOptions {
                head_fallback,
                ..options.clone()
            };
            let revision = revision.map(str::to_string);
            if update {
                self.transport.update(
                    &UpdateRequest {
                        root: root.to_string(),
                        module: module.remote_name.clone(),
                        revision,
                        working_dir: dir.clone(),
                        excluded_regions: repo.excluded_regions.clone(),
                        options,
                    },
                    &self.cancel,
                )
            } else {
                self.transport.checkout(
                    &CheckoutRequest {
                        root: root.to_string(),
                        module: module.remote_name.clone(),
                        revision,
                        destination: dir.clone(),
                        excluded_regions: repo.excluded_regions.clone(),
                        options,
                    },
                    &self.cancel,
                )
            }
        };

        match transport_call(location.revision_arg(), false) {
            Ok(report) => Ok((report, update)),
            Err(err) if err.is_not_found() && location.use_head_if_not_found => {
                let partial = matches!(err, VcsError::ReferenceNotFound { partial: true, .. });
                warn!(
                    repository = %repo.cvs_root,
                    module = %module.remote_name,
                    location = %location,
                    partial,
                    "{err}; retrying with HEAD"
                );
                if !update {
                    workspace::clear_directory(&dir)?;
                }
                // -f only fills gaps of a reference that exists
                let retry = if partial {
                    transport_call(location.revision_arg(), true)
                } else {
                    transport_call(None, false)
                };
                let mut report = retry.map_err(|err| classify(repo, module, location, err))?;
                report.head_fallback_used = true;
                Ok((report, update))
            }
            Err(err) => Err(classify(repo, module, location, err)),
        }
    }
}

fn classify(
    repo: &Repository,
    module: &Module,
    location: &ResolvedLocation,
    err: VcsError,
) -> ScmError {
    match err {
        VcsError::ReferenceNotFound { partial, .. } => ScmError::ReferenceNotFound {
            repository: repo.cvs_root.clone(),
            module: module.remote_name.clone(),
            kind: location.kind,
            name: location.name.clone(),
            partial,
        },
        source => ScmError::Transport {
            repository: repo.cvs_root.clone(),
            module: module.remote_name.clone(),
            source,
        },
    }
}
