//! Polling tests against the reference repository.
//!
//! These tests verify that baselines recorded by a checkout suppress
//! spurious builds and that later commits are detected on the right line
//! of development.

use chrono::Duration;
use cvsync_config::{GlobalSettings, ScmConfig};
use cvsync_core::{ParameterContext, Repository, RevisionSelector, UNBOUNDED_POLLING_DEPTH};
use cvsync_scm::{
    BaselineStore, ChangeDetector, CheckoutCoordinator, CheckoutMode, FileBaselineStore,
    ManualClock, MemoryBaselineStore, PollBaseline, ScmError,
};
use cvsync_test_utils::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    server: MockCvsServer,
    clock: ManualClock,
    workspace: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self {
            server: Fixtures::server(),
            clock: ManualClock::new(Fixtures::settled()),
            workspace: TempDir::new().unwrap(),
        }
    }

    fn detector(&self) -> ChangeDetector {
        ChangeDetector::new(Arc::new(self.server.clone())).with_clock(Arc::new(self.clock.clone()))
    }

    /// Check out `repos` and record the resulting baselines.
    fn checkout(&self, repos: &[Repository], store: &dyn BaselineStore) {
        let result = CheckoutCoordinator::new(Arc::new(self.server.clone()), GlobalSettings::default())
            .with_clock(Arc::new(self.clock.clone()))
            .checkout(
                &ScmConfig::new(repos.to_vec()),
                &ParameterContext::new(),
                self.workspace.path(),
                CheckoutMode::Fresh,
            )
            .unwrap();
        store.put_all(&result.baselines).unwrap();
    }

    fn poll(&self, repos: &[Repository], store: &dyn BaselineStore) -> cvsync_scm::PollResult {
        let result = self
            .detector()
            .poll(repos, store, &ParameterContext::new())
            .unwrap();
        result.commit(store).unwrap();
        result
    }
}

// ========== Baseline Tests ==========

mod baselines {
    use super::*;
    use cvsync_test_utils::prelude::assert_eq;

    #[test]
    fn test_poll_after_checkout_finds_nothing() {
        let h = Harness::new();
        let store = MemoryBaselineStore::new();
        let repos = vec![Fixtures::foo(RevisionSelector::Head)];
        h.checkout(&repos, &store);
        h.clock.advance(Duration::days(1));

        let result = h.poll(&repos, &store);

        assert!(!result.has_changes);
        assert!(result.changes.is_empty());
        let key = repos[0].key_for(&repos[0].modules[0]);
        assert_eq!(store.get(&key).unwrap(), Some(PollBaseline::at(Fixtures::settled())));
    }

    #[test]
    fn test_first_poll_without_checkout_triggers() {
        let h = Harness::new();
        let store = MemoryBaselineStore::new();
        let repos = vec![Fixtures::foo_and_bar(RevisionSelector::Head, RevisionSelector::Head)];

        let first = h.poll(&repos, &store);
        h.clock.advance(Duration::hours(1));
        let second = h.poll(&repos, &store);

        assert!(first.has_changes);
        assert_eq!(first.updated_baselines.len(), 2);
        assert!(!second.has_changes);
    }

    #[test]
    fn test_commit_advances_baseline() {
        let h = Harness::new();
        let store = MemoryBaselineStore::new();
        let repos = vec![Fixtures::foo(RevisionSelector::Head)];
        h.checkout(&repos, &store);

        let committed_at = Fixtures::settled() + Duration::hours(12);
        h.server
            .commit(Fixtures::ROOT, Fixtures::FOO_MODULE, "new.txt", "new", committed_at);
        h.clock.advance(Duration::days(1));

        let result = h.poll(&repos, &store);
        assert!(result.has_changes);
        assert_eq!(result.entry_count(), 1);
        assert_eq!(result.changes[0].entries[0].path, "new.txt");

        let key = repos[0].key_for(&repos[0].modules[0]);
        let stored = store.get(&key).unwrap().unwrap();
        assert_eq!(stored.timestamp, committed_at);
        assert!(stored.revision.is_some());

        h.clock.advance(Duration::days(1));
        assert!(!h.poll(&repos, &store).has_changes);
    }

    #[test]
    fn test_failed_poll_leaves_baselines() {
        let h = Harness::new();
        let store = MemoryBaselineStore::new();
        let repos = vec![Fixtures::foo(RevisionSelector::Head)];
        h.checkout(&repos, &store);
        h.server.commit(
            Fixtures::ROOT,
            Fixtures::FOO_MODULE,
            "new.txt",
            "new",
            Fixtures::settled() + Duration::hours(1),
        );
        h.server.fail_with(Fixtures::ROOT, MockFailure::Authentication);
        h.clock.advance(Duration::days(1));

        let failure = h
            .detector()
            .poll(&repos, &store, &ParameterContext::new())
            .unwrap_err();

        assert!(failure.cause.is_transport());
        assert_eq!(failure.key, Some(repos[0].key_for(&repos[0].modules[0])));
        let key = repos[0].key_for(&repos[0].modules[0]);
        assert_eq!(store.get(&key).unwrap(), Some(PollBaseline::at(Fixtures::settled())));

        h.server.clear_failure(Fixtures::ROOT);
        assert!(h.poll(&repos, &store).has_changes);
    }

    #[test]
    fn test_cancelled_poll() {
        let h = Harness::new();
        let store = MemoryBaselineStore::new();
        let repos = vec![Fixtures::foo(RevisionSelector::Head)];
        h.checkout(&repos, &store);
        h.clock.advance(Duration::days(1));

        let detector = h.detector();
        let token = cvsync_vcs::CancellationToken::new();
        token.cancel();
        let failure = detector
            .with_cancellation(token)
            .poll(&repos, &store, &ParameterContext::new())
            .unwrap_err();

        assert!(matches!(
            failure.cause,
            ScmError::Transport {
                source: cvsync_vcs::VcsError::Cancelled,
                ..
            }
        ));
    }

    #[test]
    fn test_file_store_survives_restart() {
        let h = Harness::new();
        let state = TempDir::new().unwrap();
        let path = state.path().join("baselines.json");
        let repos = vec![Fixtures::foo(RevisionSelector::Head)];

        h.checkout(&repos, &FileBaselineStore::new(&path));
        h.clock.advance(Duration::days(1));

        let reopened = FileBaselineStore::new(&path);
        assert!(!h.poll(&repos, &reopened).has_changes);
        assert_eq!(reopened.load().unwrap().len(), 1);
    }
}

// ========== Line of Development Tests ==========

mod scoping {
    use super::*;
    use cvsync_test_utils::prelude::assert_eq;

    #[test]
    fn test_branch_ignores_trunk_commits() {
        let h = Harness::new();
        let store = MemoryBaselineStore::new();
        let repos = vec![Fixtures::foo(RevisionSelector::branch(Fixtures::FOO_BRANCH, false))];
        h.checkout(&repos, &store);

        h.server.commit(
            Fixtures::ROOT,
            Fixtures::FOO_MODULE,
            "trunk.txt",
            "trunk",
            Fixtures::settled() + Duration::hours(1),
        );
        h.clock.advance(Duration::days(1));
        assert!(!h.poll(&repos, &store).has_changes);

        h.server.commit_on_branch(
            Fixtures::ROOT,
            Fixtures::FOO_MODULE,
            Fixtures::FOO_BRANCH,
            "branch.txt",
            "branch 2",
            Fixtures::settled() + Duration::days(1) + Duration::hours(1),
        );
        h.clock.advance(Duration::days(1));
        let result = h.poll(&repos, &store);
        assert!(result.has_changes);
        assert_eq!(result.changes[0].entries[0].path, "branch.txt");
    }

    #[test]
    fn test_head_ignores_branch_commits() {
        let h = Harness::new();
        let store = MemoryBaselineStore::new();
        let repos = vec![Fixtures::foo(RevisionSelector::Head)];
        h.checkout(&repos, &store);

        h.server.commit_on_branch(
            Fixtures::ROOT,
            Fixtures::FOO_MODULE,
            Fixtures::FOO_BRANCH,
            "branch.txt",
            "branch 2",
            Fixtures::settled() + Duration::hours(1),
        );
        h.clock.advance(Duration::days(1));

        assert!(!h.poll(&repos, &store).has_changes);
    }

    #[test]
    fn test_tag_never_changes() {
        let h = Harness::new();
        let store = MemoryBaselineStore::new();
        let repos = vec![Fixtures::foo(RevisionSelector::tag(Fixtures::FOO_TAG, false))];
        h.checkout(&repos, &store);

        h.server.commit(
            Fixtures::ROOT,
            Fixtures::FOO_MODULE,
            "tag.txt",
            "retagged later",
            Fixtures::settled() + Duration::hours(1),
        );
        h.clock.advance(Duration::days(1));

        assert!(!h.poll(&repos, &store).has_changes);
    }

    #[test]
    fn test_excluded_commits_are_ignored_but_advance_baseline() {
        let h = Harness::new();
        let store = MemoryBaselineStore::new();
        let repos = vec![Fixtures::foo(RevisionSelector::Head).with_excluded_region(r"docs/.*")];
        h.checkout(&repos, &store);

        let committed_at = Fixtures::settled() + Duration::hours(2);
        h.server
            .commit(Fixtures::ROOT, Fixtures::FOO_MODULE, "docs/readme.txt", "docs", committed_at);
        h.clock.advance(Duration::days(1));

        let result = h.poll(&repos, &store);
        assert!(!result.has_changes);
        let key = repos[0].key_for(&repos[0].modules[0]);
        assert_eq!(store.get(&key).unwrap().unwrap().timestamp, committed_at);
    }

    #[test]
    fn test_polling_depth_limits_entries() {
        let h = Harness::new();
        let store = MemoryBaselineStore::new();
        let bounded = vec![Fixtures::foo(RevisionSelector::Head)];
        let unbounded =
            vec![Fixtures::foo(RevisionSelector::Head).with_polling_depth(UNBOUNDED_POLLING_DEPTH)];
        h.checkout(&bounded, &store);

        for i in 1..=5 {
            h.server.commit(
                Fixtures::ROOT,
                Fixtures::FOO_MODULE,
                &format!("file{i}.txt"),
                "content",
                Fixtures::settled() + Duration::hours(i),
            );
        }
        h.clock.advance(Duration::days(1));

        let limited = h
            .detector()
            .poll(&bounded, &store, &ParameterContext::new())
            .unwrap();
        let all = h
            .detector()
            .poll(&unbounded, &store, &ParameterContext::new())
            .unwrap();

        assert_eq!(limited.entry_count(), Fixtures::POLLING_DEPTH as usize);
        assert_eq!(limited.changes[0].entries[0].path, "file5.txt");
        assert_eq!(all.entry_count(), 5);
        assert_eq!(limited.updated_baselines, all.updated_baselines);
    }

    #[test]
    fn test_branch_from_parameter() {
        let h = Harness::new();
        let store = MemoryBaselineStore::new();
        let repos = vec![Fixtures::foo(RevisionSelector::branch("${branch}", false))];
        let context = ParameterContext::new().with_parameter("branch", Fixtures::FOO_BRANCH);
        let key = repos[0].key_for(&repos[0].modules[0]);
        store.put(&key, PollBaseline::at(Fixtures::epoch())).unwrap();

        let result = h.detector().poll(&repos, &store, &context).unwrap();

        assert!(result.has_changes);
        assert!(h.server.calls().contains(&MockCall::History {
            module: Fixtures::FOO_MODULE.to_string(),
            revision: Some(Fixtures::FOO_BRANCH.to_string()),
            since: Fixtures::epoch(),
        }));
    }

    #[test]
    fn test_head_fallback_polls_trunk() {
        let h = Harness::new();
        let store = MemoryBaselineStore::new();
        let repos = vec![Fixtures::foo(RevisionSelector::branch("missingBranch", true))];
        h.checkout(&repos, &store);
        assert_checked_out(h.workspace.path(), &["head.txt"]).unwrap();

        h.server.commit(
            Fixtures::ROOT,
            Fixtures::FOO_MODULE,
            "head.txt",
            "head2",
            Fixtures::settled() + Duration::hours(1),
        );
        h.clock.advance(Duration::days(1));
        h.server.clear_calls();

        let result = h.poll(&repos, &store);

        assert!(result.has_changes);
        assert_eq!(result.changes[0].entries[0].path, "head.txt");
        assert!(h.server.calls().contains(&MockCall::History {
            module: Fixtures::FOO_MODULE.to_string(),
            revision: None,
            since: Fixtures::settled(),
        }));
    }

    #[test]
    fn test_existing_branch_with_fallback_polls_branch() {
        let h = Harness::new();
        let store = MemoryBaselineStore::new();
        let repos = vec![Fixtures::foo(RevisionSelector::branch(Fixtures::FOO_BRANCH, true))];
        let key = repos[0].key_for(&repos[0].modules[0]);
        store.put(&key, PollBaseline::at(Fixtures::epoch())).unwrap();

        let result = h.poll(&repos, &store);

        assert!(result.has_changes);
        assert!(h.server.calls().contains(&MockCall::History {
            module: Fixtures::FOO_MODULE.to_string(),
            revision: Some(Fixtures::FOO_BRANCH.to_string()),
            since: Fixtures::epoch(),
        }));
    }
}
