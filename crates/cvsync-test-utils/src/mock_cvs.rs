//! In-memory CVS server implementing [`CvsTransport`].
//!
//! Files live in memory and are written to disk on checkout and update,
//! together with a minimal `CVS/` admin directory. Tags and branches are
//! snapshots of the trunk taken when they are created; a reference applied
//! to fewer files than were live at that moment is partial.

use chrono::{DateTime, Utc};
use cvsync_vcs::{
    CancellationToken, CheckoutReport, CheckoutRequest, CvsTransport, FileAction, FileChange,
    HistoryEntry, HistoryQuery, ReferenceCoverage, Result, SymbolicName, UpdateRequest, VcsError,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// A failure the server injects into every call against one root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Bad credentials.
    Authentication,
    /// Server unreachable.
    Unreachable,
    /// Command timed out.
    Timeout,
}

impl MockFailure {
    fn to_error(self, root: &str) -> VcsError {
        match self {
            Self::Authentication => VcsError::AuthenticationFailed {
                root: root.to_string(),
                reason: "I HATE YOU".to_string(),
            },
            Self::Unreachable => VcsError::RepositoryNotFound {
                root: root.to_string(),
                reason: "connect to localhost:2401 failed: Connection refused".to_string(),
            },
            Self::Timeout => VcsError::Timeout { seconds: 30 },
        }
    }
}

/// A transport call as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// `checkout`.
    Checkout {
        /// Module.
        module: String,
        /// Requested revision.
        revision: Option<String>,
        /// `-f` was passed.
        head_fallback: bool,
    },
    /// `update`.
    Update {
        /// Module.
        module: String,
        /// Requested revision.
        revision: Option<String>,
        /// `-f` was passed.
        head_fallback: bool,
    },
    /// `query_history`.
    History {
        /// Module.
        module: String,
        /// Branch scope.
        revision: Option<String>,
        /// Lower bound.
        since: DateTime<Utc>,
    },
    /// `list_symbolic_names`.
    SymbolicNames {
        /// Module.
        module: String,
    },
    /// `reference_coverage`.
    Coverage {
        /// Module.
        module: String,
        /// Reference.
        reference: String,
    },
}

impl MockCall {
    /// Module the call targeted.
    #[must_use]
    pub fn module(&self) -> &str {
        match self {
            Self::Checkout { module, .. }
            | Self::Update { module, .. }
            | Self::History { module, .. }
            | Self::SymbolicNames { module }
            | Self::Coverage { module, .. } => module,
        }
    }
}

#[derive(Debug, Clone)]
struct FileRevision {
    content: String,
    revision: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReferenceKind {
    Tag,
    Branch,
}

#[derive(Debug, Clone)]
struct Reference {
    kind: ReferenceKind,
    files: BTreeMap<String, FileRevision>,
    live_files: usize,
    branch_number: u32,
}

#[derive(Debug, Clone)]
struct Commit {
    branch: Option<String>,
    entry: HistoryEntry,
}

#[derive(Debug, Default)]
struct ModuleState {
    head: BTreeMap<String, FileRevision>,
    trunk_revisions: BTreeMap<String, u32>,
    references: BTreeMap<String, Reference>,
    history: Vec<Commit>,
}

#[derive(Debug, Default)]
struct RootState {
    modules: BTreeMap<String, ModuleState>,
    failure: Option<MockFailure>,
}

#[derive(Debug, Default)]
struct State {
    roots: BTreeMap<String, RootState>,
    calls: Vec<MockCall>,
    checkouts_before_failure: Option<(usize, MockFailure)>,
}

/// An in-memory CVS server.
///
/// Clones share state, so a test can keep a handle while the coordinator
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct MockCvsServer {
    state: Arc<Mutex<State>>,
}

impl MockCvsServer {
    /// An empty server.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a file on the trunk.
    pub fn commit(&self, root: &str, module: &str, path: &str, content: &str, at: DateTime<Utc>) {
        let mut state = self.state.lock();
        let module_state = state.module_mut(root, module);
        let number = module_state
            .trunk_revisions
            .entry(path.to_string())
            .and_modify(|n| *n += 1)
            .or_insert(1);
        let revision = format!("1.{number}");
        module_state.head.insert(
            path.to_string(),
            FileRevision {
                content: content.to_string(),
                revision: revision.clone(),
            },
        );
        module_state.history.push(Commit {
            branch: None,
            entry: entry(path, at, revision, "commit"),
        });
    }

    /// Remove a file from the trunk.
    pub fn remove(&self, root: &str, module: &str, path: &str, at: DateTime<Utc>) {
        let mut state = self.state.lock();
        let module_state = state.module_mut(root, module);
        if module_state.head.remove(path).is_none() {
            return;
        }
        let number = module_state
            .trunk_revisions
            .entry(path.to_string())
            .and_modify(|n| *n += 1)
            .or_insert(1);
        let revision = format!("1.{number}");
        module_state.history.push(Commit {
            branch: None,
            entry: entry(path, at, revision, "remove"),
        });
    }

    /// Tag trunk files; an empty `paths` tags every live file.
    pub fn tag(&self, root: &str, module: &str, name: &str, paths: &[&str]) {
        self.snapshot(root, module, name, paths, ReferenceKind::Tag);
    }

    /// Branch from trunk files; an empty `paths` branches every live file.
    pub fn branch(&self, root: &str, module: &str, name: &str, paths: &[&str]) {
        self.snapshot(root, module, name, paths, ReferenceKind::Branch);
    }

    fn snapshot(&self, root: &str, module: &str, name: &str, paths: &[&str], kind: ReferenceKind) {
        let mut state = self.state.lock();
        let module_state = state.module_mut(root, module);
        let branch_number = 2 * (module_state.references.len() as u32 + 1);
        let files = module_state
            .head
            .iter()
            .filter(|(path, _)| paths.is_empty() || paths.contains(&path.as_str()))
            .map(|(path, file)| (path.clone(), file.clone()))
            .collect();
        module_state.references.insert(
            name.to_string(),
            Reference {
                kind,
                files,
                live_files: module_state.head.len(),
                branch_number,
            },
        );
    }

    /// Commit a file on a branch created with [`Self::branch`].
    ///
    /// # Panics
    /// Panics if the branch does not exist.
    pub fn commit_on_branch(
        &self,
        root: &str,
        module: &str,
        branch: &str,
        path: &str,
        content: &str,
        at: DateTime<Utc>,
    ) {
        let mut state = self.state.lock();
        let module_state = state.module_mut(root, module);
        let reference = module_state
            .references
            .get_mut(branch)
            .filter(|r| r.kind == ReferenceKind::Branch)
            .unwrap_or_else(|| panic!("no branch {branch} in {module}"));
        let base = module_state
            .trunk_revisions
            .get(path)
            .copied()
            .unwrap_or(1);
        // 1.N.B.M on the branch; bump M or start at 1
        let step = reference
            .files
            .get(path)
            .map(|f| f.revision.split('.').collect::<Vec<_>>())
            .filter(|parts| parts.len() == 4)
            .and_then(|parts| parts[3].parse::<u32>().ok())
            .map_or(1, |n| n + 1);
        let revision = format!("1.{base}.{}.{step}", reference.branch_number);
        reference.files.insert(
            path.to_string(),
            FileRevision {
                content: content.to_string(),
                revision: revision.clone(),
            },
        );
        module_state.history.push(Commit {
            branch: Some(branch.to_string()),
            entry: entry(path, at, revision, "branch commit"),
        });
    }

    /// Fail every call against `root`.
    pub fn fail_with(&self, root: &str, failure: MockFailure) {
        self.state.lock().roots.entry(root.to_string()).or_default().failure = Some(failure);
    }

    /// Stop failing calls against `root`.
    pub fn clear_failure(&self, root: &str) {
        if let Some(root_state) = self.state.lock().roots.get_mut(root) {
            root_state.failure = None;
        }
    }

    /// Let `count` checkouts or updates succeed, then fail the rest.
    pub fn fail_checkouts_after(&self, count: usize, failure: MockFailure) {
        self.state.lock().checkouts_before_failure = Some((count, failure));
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Checkout and update calls received so far.
    #[must_use]
    pub fn checkout_calls(&self) -> Vec<MockCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, MockCall::Checkout { .. } | MockCall::Update { .. }))
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }
}

impl State {
    fn module_mut(&mut self, root: &str, module: &str) -> &mut ModuleState {
        self.roots
            .entry(root.to_string())
            .or_default()
            .modules
            .entry(module.to_string())
            .or_default()
    }

    fn module(&self, root: &str, module: &str, cancel: &CancellationToken) -> Result<&ModuleState> {
        if cancel.is_cancelled() {
            return Err(VcsError::Cancelled);
        }
        let root_state = self.roots.get(root).ok_or_else(|| VcsError::RepositoryNotFound {
            root: root.to_string(),
            reason: "no such repository".to_string(),
        })?;
        if let Some(failure) = root_state.failure {
            return Err(failure.to_error(root));
        }
        root_state.modules.get(module).ok_or_else(|| VcsError::Cvs {
            message: format!("cannot find module `{module}' - ignored"),
        })
    }

    fn take_checkout_budget(&mut self, root: &str) -> Result<()> {
        match &mut self.checkouts_before_failure {
            Some((0, failure)) => Err(failure.to_error(root)),
            Some((remaining, _)) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl ModuleState {
    fn coverage(&self, reference: &str) -> ReferenceCoverage {
        match self.references.get(reference) {
            None => ReferenceCoverage::Missing,
            Some(r) if r.files.is_empty() && r.live_files > 0 => ReferenceCoverage::Missing,
            Some(r) if r.files.len() < r.live_files => ReferenceCoverage::Partial,
            Some(_) => ReferenceCoverage::Full,
        }
    }

    /// Files for a revision and whether HEAD filled gaps.
    fn select(
        &self,
        module: &str,
        revision: Option<&str>,
        head_fallback: bool,
    ) -> Result<(BTreeMap<String, String>, bool)> {
        let head = || -> BTreeMap<String, String> {
            self.head
                .iter()
                .map(|(p, f)| (p.clone(), f.content.clone()))
                .collect()
        };
        let Some(name) = revision else {
            return Ok((head(), false));
        };
        let tagged = || -> BTreeMap<String, String> {
            self.references
                .get(name)
                .map(|r| {
                    r.files
                        .iter()
                        .map(|(p, f)| (p.clone(), f.content.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };

        match (self.coverage(name), head_fallback) {
            (ReferenceCoverage::Full, _) => Ok((tagged(), false)),
            (ReferenceCoverage::Missing, _) => {
                Err(VcsError::reference_not_found(name, module, false))
            }
            (ReferenceCoverage::Partial, false) => {
                Err(VcsError::reference_not_found(name, module, true))
            }
            (ReferenceCoverage::Partial, true) => {
                let mut files = head();
                files.extend(tagged());
                Ok((files, true))
            }
        }
    }
}

fn entry(path: &str, at: DateTime<Utc>, revision: String, message: &str) -> HistoryEntry {
    HistoryEntry {
        path: path.to_string(),
        timestamp: at,
        revision,
        author: "cvsuser".to_string(),
        message: message.to_string(),
    }
}

fn write_admin(dir: &Path, root: &str, module: &str, revision: Option<&str>, files: &BTreeMap<String, String>) -> Result<()> {
    let admin = dir.join("CVS");
    std::fs::create_dir_all(&admin).map_err(|e| VcsError::io(&admin, e))?;
    let write = |name: &str, content: String| {
        let path = admin.join(name);
        std::fs::write(&path, content).map_err(|e| VcsError::io(&path, e))
    };
    write("Root", format!("{root}\n"))?;
    write("Repository", format!("{module}\n"))?;
    let entries: String = files.keys().map(|p| format!("{p}\n")).collect();
    write("Entries", entries)?;
    match revision {
        Some(name) => write("Tag", format!("T{name}\n")),
        None => {
            let tag = admin.join("Tag");
            if tag.exists() {
                std::fs::remove_file(&tag).map_err(|e| VcsError::io(&tag, e))?;
            }
            Ok(())
        }
    }
}

fn read_entries(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("CVS").join("Entries"))
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

fn write_file(dir: &Path, relative: &str, content: &str) -> Result<()> {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| VcsError::io(parent, e))?;
    }
    std::fs::write(&path, content).map_err(|e| VcsError::io(&path, e))
}

impl CvsTransport for MockCvsServer {
    fn checkout(&self, request: &CheckoutRequest, cancel: &CancellationToken) -> Result<CheckoutReport> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Checkout {
            module: request.module.clone(),
            revision: request.revision.clone(),
            head_fallback: request.options.head_fallback,
        });
        let (files, fallback) = state
            .module(&request.root, &request.module, cancel)?
            .select(
                &request.module,
                request.revision.as_deref(),
                request.options.head_fallback,
            )?;
        state.take_checkout_budget(&request.root)?;
        drop(state);

        std::fs::create_dir_all(&request.destination)
            .map_err(|e| VcsError::io(&request.destination, e))?;
        let mut report = CheckoutReport {
            changes: Vec::with_capacity(files.len()),
            head_fallback_used: fallback,
        };
        for (path, content) in &files {
            write_file(&request.destination, path, content)?;
            report.changes.push(FileChange {
                path: path.clone(),
                action: FileAction::Updated,
            });
        }
        write_admin(
            &request.destination,
            &request.root,
            &request.module,
            request.revision.as_deref(),
            &files,
        )?;
        cvsync_vcs::exclude::apply(&request.destination, &request.excluded_regions, &mut report)?;
        Ok(report)
    }

    fn update(&self, request: &UpdateRequest, cancel: &CancellationToken) -> Result<CheckoutReport> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Update {
            module: request.module.clone(),
            revision: request.revision.clone(),
            head_fallback: request.options.head_fallback,
        });
        let (files, fallback) = state
            .module(&request.root, &request.module, cancel)?
            .select(
                &request.module,
                request.revision.as_deref(),
                request.options.head_fallback,
            )?;
        state.take_checkout_budget(&request.root)?;
        drop(state);

        let dir = &request.working_dir;
        if !dir.join("CVS").is_dir() {
            return Err(VcsError::Cvs {
                message: format!("in directory {}: no CVS directory", dir.display()),
            });
        }

        let mut report = CheckoutReport {
            changes: Vec::new(),
            head_fallback_used: fallback,
        };
        for stale in read_entries(dir) {
            if !files.contains_key(&stale) {
                let path = dir.join(&stale);
                if path.exists() {
                    std::fs::remove_file(&path).map_err(|e| VcsError::io(&path, e))?;
                }
            }
        }
        for (path, content) in &files {
            let current = std::fs::read_to_string(dir.join(path)).ok();
            if current.as_deref() != Some(content.as_str()) {
                write_file(dir, path, content)?;
                report.changes.push(FileChange {
                    path: path.clone(),
                    action: if current.is_some() {
                        FileAction::Patched
                    } else {
                        FileAction::Updated
                    },
                });
            }
        }
        write_admin(dir, &request.root, &request.module, request.revision.as_deref(), &files)?;
        cvsync_vcs::exclude::apply(dir, &request.excluded_regions, &mut report)?;
        Ok(report)
    }

    fn query_history(&self, query: &HistoryQuery, cancel: &CancellationToken) -> Result<Vec<HistoryEntry>> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::History {
            module: query.module.clone(),
            revision: query.revision.clone(),
            since: query.since,
        });
        let module = state.module(&query.root, &query.module, cancel)?;

        let scope: Option<Option<&str>> = match query.revision.as_deref() {
            None => Some(None),
            Some(name) => match module.references.get(name) {
                Some(r) if r.kind == ReferenceKind::Branch => Some(Some(name)),
                _ => None,
            },
        };
        let Some(scope) = scope else {
            return Ok(Vec::new());
        };

        let mut entries: Vec<HistoryEntry> = module
            .history
            .iter()
            .filter(|c| c.branch.as_deref() == scope)
            .filter(|c| c.entry.timestamp > query.since && c.entry.timestamp <= query.until)
            .map(|c| c.entry.clone())
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = query.limit {
            entries.truncate(limit as usize);
        }
        Ok(entries)
    }

    fn list_symbolic_names(&self, root: &str, module: &str, cancel: &CancellationToken) -> Result<Vec<SymbolicName>> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::SymbolicNames {
            module: module.to_string(),
        });
        let module_state = state.module(root, module, cancel)?;
        let mut names = Vec::new();
        for (name, reference) in &module_state.references {
            for (path, file) in &reference.files {
                let revision = match reference.kind {
                    ReferenceKind::Tag => file.revision.clone(),
                    ReferenceKind::Branch => {
                        let base = file.revision.split('.').take(2).collect::<Vec<_>>().join(".");
                        format!("{base}.0.{}", reference.branch_number)
                    }
                };
                names.push(SymbolicName {
                    path: path.clone(),
                    name: name.clone(),
                    revision,
                });
            }
        }
        Ok(names)
    }

    fn reference_coverage(
        &self,
        root: &str,
        module: &str,
        reference: &str,
        cancel: &CancellationToken,
    ) -> Result<ReferenceCoverage> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Coverage {
            module: module.to_string(),
            reference: reference.to_string(),
        });
        Ok(state.module(root, module, cancel)?.coverage(reference))
    }
}
