//! Checkout tests against the reference repository.
//!
//! These tests drive the coordinator through complete checkouts of the
//! fixture modules and verify the workspace, the outcomes and the
//! `CVS_BRANCH` projection.

use cvsync_config::{GlobalSettings, ScmConfig};
use cvsync_core::{CVS_BRANCH, LocationKind, Module, ParameterContext, Repository, RevisionSelector};
use cvsync_scm::workspace::IN_PROGRESS_MARKER;
use cvsync_scm::{CheckoutCoordinator, CheckoutMode, ManualClock, previous_checkout_aborted};
use cvsync_test_utils::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn coordinator(server: &MockCvsServer) -> CheckoutCoordinator {
    CheckoutCoordinator::new(Arc::new(server.clone()), GlobalSettings::default())
        .with_clock(Arc::new(ManualClock::new(Fixtures::settled())))
}

fn fresh(server: &MockCvsServer, config: &ScmConfig, ws: &Path) -> cvsync_scm::CheckoutResult {
    coordinator(server)
        .checkout(config, &ParameterContext::new(), ws, CheckoutMode::Fresh)
        .unwrap()
}

fn foo_dir(ws: &Path) -> std::path::PathBuf {
    ws.join(Fixtures::FOO_MODULE)
}

fn bar_dir(ws: &Path) -> std::path::PathBuf {
    ws.join(Fixtures::BAR_MODULE)
}

// ========== Single Module Tests ==========

mod single_module {
    use super::*;
    use cvsync_test_utils::prelude::assert_eq;

    #[test]
    fn test_checkout_head() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let config = ScmConfig::new(vec![Fixtures::foo(RevisionSelector::Head)]);

        let result = fresh(&server, &config, ws.path());

        assert_file_content(ws.path(), "head.txt", "head").unwrap();
        assert_not_checked_out(ws.path(), &["tag.txt", "branch.txt"]).unwrap();
        assert_working_copy(ws.path(), Fixtures::FOO_MODULE).unwrap();
        assert_eq!(result.environment.get(CVS_BRANCH), None);
        assert!(result.outcomes[0].success);
        assert!(!result.outcomes[0].fell_back_to_head);
    }

    #[test]
    fn test_checkout_tag() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let config = ScmConfig::new(vec![Fixtures::foo(RevisionSelector::tag(
            Fixtures::FOO_TAG,
            false,
        ))]);

        let result = fresh(&server, &config, ws.path());

        assert_checked_out(ws.path(), &["tag.txt"]).unwrap();
        assert_not_checked_out(ws.path(), &["head.txt"]).unwrap();
        assert_eq!(result.environment.get(CVS_BRANCH), Some(Fixtures::FOO_TAG));
    }

    #[test]
    fn test_checkout_branch() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let config = ScmConfig::new(vec![Fixtures::foo(RevisionSelector::branch(
            Fixtures::FOO_BRANCH,
            false,
        ))]);

        let result = fresh(&server, &config, ws.path());

        assert_file_content(ws.path(), "branch.txt", "branch").unwrap();
        assert_not_checked_out(ws.path(), &["head.txt", "tag.txt"]).unwrap();
        assert_eq!(result.environment.get(CVS_BRANCH), Some(Fixtures::FOO_BRANCH));
        assert_eq!(result.outcomes[0].effective_location.kind, LocationKind::Branch);
    }

    #[test]
    fn test_fresh_checkout_removes_previous_content() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        std::fs::write(ws.path().join("stale.txt"), "old").unwrap();
        let config = ScmConfig::new(vec![Fixtures::foo(RevisionSelector::Head)]);

        fresh(&server, &config, ws.path());

        assert_not_checked_out(ws.path(), &["stale.txt"]).unwrap();
        assert!(!ws.path().join(IN_PROGRESS_MARKER).exists());
    }

    #[test]
    fn test_local_name_overrides_directory() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let repo = Fixtures::repository([
            Module::new(Fixtures::FOO_MODULE, RevisionSelector::Head).with_local_name("work")
        ]);
        let config = ScmConfig::new(vec![repo]);

        let result = fresh(&server, &config, ws.path());

        assert_checked_out(&ws.path().join("work"), &["head.txt"]).unwrap();
        assert_eq!(result.outcomes[0].directory, Path::new("work"));
    }

    #[test]
    fn test_legacy_layout_keeps_module_directory() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let mut config = ScmConfig::new(vec![Fixtures::foo(RevisionSelector::Head)]);
        config.legacy = true;

        fresh(&server, &config, ws.path());

        assert_checked_out(&foo_dir(ws.path()), &["head.txt"]).unwrap();
        assert_not_checked_out(ws.path(), &["head.txt"]).unwrap();
    }

    #[test]
    fn test_excluded_regions_are_removed() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let repo = Fixtures::foo_and_bar(RevisionSelector::Head, RevisionSelector::Head)
            .with_excluded_region(r"shared\.txt");
        let config = ScmConfig::new(vec![repo]);

        let result = fresh(&server, &config, ws.path());

        assert_checked_out(&bar_dir(ws.path()), &["barHead.txt"]).unwrap();
        assert_not_checked_out(&bar_dir(ws.path()), &["shared.txt"]).unwrap();
        let summary = result.summary.unwrap();
        assert!(
            summary.modules[1]
                .changes
                .iter()
                .all(|c| c.path != "shared.txt")
        );
    }
}

// ========== Multiple Module Tests ==========

mod multiple_modules {
    use super::*;
    use cvsync_test_utils::prelude::assert_eq;

    #[test]
    fn test_same_tag_sets_cvs_branch() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let tag = RevisionSelector::tag(Fixtures::FOO_TAG, false);
        let config = ScmConfig::new(vec![Fixtures::foo_and_bar(tag.clone(), tag)]);

        let result = fresh(&server, &config, ws.path());

        assert_checked_out(&foo_dir(ws.path()), &["tag.txt"]).unwrap();
        assert_checked_out(&bar_dir(ws.path()), &["barTag.txt"]).unwrap();
        assert_eq!(result.environment.get(CVS_BRANCH), Some(Fixtures::FOO_TAG));
        assert_eq!(result.outcomes.len(), 2);
    }

    #[test]
    fn test_different_branches_clear_cvs_branch() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let config = ScmConfig::new(vec![Fixtures::foo_and_bar(
            RevisionSelector::branch(Fixtures::FOO_BRANCH, false),
            RevisionSelector::branch(Fixtures::BAR_BRANCH, false),
        )]);

        let result = fresh(&server, &config, ws.path());

        assert_checked_out(&foo_dir(ws.path()), &["branch.txt"]).unwrap();
        assert_file_content(&bar_dir(ws.path()), "barBranch.txt", "barBranch").unwrap();
        assert_eq!(result.environment.get(CVS_BRANCH), None);
        assert_eq!(result.environment.to_map().get(CVS_BRANCH), None);
    }

    #[test]
    fn test_head_mixed_with_tag_clears_cvs_branch() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let config = ScmConfig::new(vec![Fixtures::foo_and_bar(
            RevisionSelector::Head,
            RevisionSelector::tag(Fixtures::FOO_TAG, false),
        )]);

        let result = fresh(&server, &config, ws.path());

        assert_eq!(result.environment.get(CVS_BRANCH), None);
    }

    #[test]
    fn test_modules_are_processed_in_order() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let config = ScmConfig::new(vec![Fixtures::foo_and_bar(
            RevisionSelector::Head,
            RevisionSelector::Head,
        )]);

        fresh(&server, &config, ws.path());

        let modules: Vec<String> = server
            .checkout_calls()
            .iter()
            .map(|c| c.module().to_string())
            .collect();
        assert_eq!(modules, vec![Fixtures::FOO_MODULE, Fixtures::BAR_MODULE]);
    }

    #[test]
    fn test_parallel_repositories() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let mut config = ScmConfig::new(vec![
            Fixtures::foo(RevisionSelector::tag(Fixtures::FOO_TAG, false)),
            Fixtures::repository([Fixtures::module(
                Fixtures::BAR_MODULE,
                RevisionSelector::tag(Fixtures::FOO_TAG, false),
            )]),
        ]);
        config.parallel_repositories = true;

        let result = fresh(&server, &config, ws.path());

        assert_checked_out(&foo_dir(ws.path()), &["tag.txt"]).unwrap();
        assert_checked_out(&bar_dir(ws.path()), &["barTag.txt"]).unwrap();
        assert_eq!(result.outcomes[0].key.remote_name, Fixtures::FOO_MODULE);
        assert_eq!(result.outcomes[1].key.remote_name, Fixtures::BAR_MODULE);
        assert_eq!(result.environment.get(CVS_BRANCH), Some(Fixtures::FOO_TAG));
        assert_eq!(result.baselines.len(), 2);
    }
}

// ========== Missing Reference Tests ==========

mod missing_reference {
    use super::*;
    use cvsync_test_utils::prelude::assert_eq;

    #[test]
    fn test_wrong_tag_fails_without_fallback() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let config = ScmConfig::new(vec![Fixtures::foo(RevisionSelector::tag(
            Fixtures::WRONG_TAG,
            false,
        ))]);

        let failure = coordinator(&server)
            .checkout(&config, &ParameterContext::new(), ws.path(), CheckoutMode::Fresh)
            .unwrap_err();

        assert!(failure.cause.is_reference_not_found());
        assert_eq!(failure.completed().count(), 0);
        assert_eq!(failure.outcomes.len(), 1);
        assert!(failure.outcomes[0].failure_reason.is_some());
        assert!(previous_checkout_aborted(ws.path()));
        assert_eq!(server.checkout_calls().len(), 1);
    }

    #[test]
    fn test_wrong_tag_falls_back_to_head() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let config = ScmConfig::new(vec![Fixtures::foo(RevisionSelector::tag(
            Fixtures::WRONG_TAG,
            true,
        ))]);

        let result = fresh(&server, &config, ws.path());

        assert_checked_out(ws.path(), &["head.txt"]).unwrap();
        let outcome = &result.outcomes[0];
        assert!(outcome.success);
        assert!(outcome.fell_back_to_head);
        assert_eq!(outcome.effective_location.name, Fixtures::WRONG_TAG);
        assert_eq!(
            server.checkout_calls(),
            vec![
                MockCall::Checkout {
                    module: Fixtures::FOO_MODULE.to_string(),
                    revision: Some(Fixtures::WRONG_TAG.to_string()),
                    head_fallback: false,
                },
                MockCall::Checkout {
                    module: Fixtures::FOO_MODULE.to_string(),
                    revision: None,
                    head_fallback: false,
                },
            ]
        );
    }

    #[test]
    fn test_branch_missing_in_one_module() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let branch = RevisionSelector::branch(Fixtures::BAR_BRANCH, false);
        let config = ScmConfig::new(vec![Fixtures::foo_and_bar(branch.clone(), branch)]);

        let failure = coordinator(&server)
            .checkout(&config, &ParameterContext::new(), ws.path(), CheckoutMode::Fresh)
            .unwrap_err();

        assert!(failure.cause.is_reference_not_found());
        assert_eq!(failure.outcomes[0].key.remote_name, Fixtures::FOO_MODULE);
        assert_eq!(server.checkout_calls().len(), 1);
    }

    #[test]
    fn test_partial_tag_is_reported() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let config = ScmConfig::new(vec![Fixtures::repository([Fixtures::module(
            Fixtures::BAR_MODULE,
            RevisionSelector::tag(Fixtures::SINGLE_TAG, false),
        )])]);

        let failure = coordinator(&server)
            .checkout(&config, &ParameterContext::new(), ws.path(), CheckoutMode::Fresh)
            .unwrap_err();

        assert!(matches!(
            failure.cause,
            cvsync_scm::ScmError::ReferenceNotFound { partial: true, .. }
        ));
        assert!(failure.to_string().contains("some files only"));
    }

    #[test]
    fn test_partial_tag_with_fallback_fills_from_head() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let config = ScmConfig::new(vec![Fixtures::repository([Fixtures::module(
            Fixtures::BAR_MODULE,
            RevisionSelector::tag(Fixtures::SINGLE_TAG, true),
        )])]);

        let result = fresh(&server, &config, ws.path());

        assert_checked_out(ws.path(), &["barHead.txt", "shared.txt"]).unwrap();
        assert!(result.outcomes[0].fell_back_to_head);
        assert_eq!(result.environment.get(CVS_BRANCH), Some(Fixtures::SINGLE_TAG));
    }

    #[test]
    fn test_partial_branch_is_reported() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let config = ScmConfig::new(vec![Fixtures::repository([Fixtures::module(
            Fixtures::BAR_MODULE,
            RevisionSelector::branch(Fixtures::SINGLE_BRANCH, false),
        )])]);

        let failure = coordinator(&server)
            .checkout(&config, &ParameterContext::new(), ws.path(), CheckoutMode::Fresh)
            .unwrap_err();

        assert!(matches!(
            failure.cause,
            cvsync_scm::ScmError::ReferenceNotFound { partial: true, .. }
        ));
    }

    #[test]
    fn test_partial_branch_with_fallback_keeps_revision() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let config = ScmConfig::new(vec![Fixtures::repository([Fixtures::module(
            Fixtures::BAR_MODULE,
            RevisionSelector::branch(Fixtures::SINGLE_BRANCH, true),
        )])]);

        let result = fresh(&server, &config, ws.path());

        assert_checked_out(ws.path(), &["barHead.txt", "shared.txt"]).unwrap();
        assert!(result.outcomes[0].fell_back_to_head);
        assert_eq!(
            server.checkout_calls().last(),
            Some(&MockCall::Checkout {
                module: Fixtures::BAR_MODULE.to_string(),
                revision: Some(Fixtures::SINGLE_BRANCH.to_string()),
                head_fallback: true,
            })
        );
    }
}

// ========== Parameter Tests ==========

mod parameters {
    use super::*;
    use cvsync_test_utils::prelude::assert_eq;

    #[test]
    fn test_tag_from_build_parameter() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let config = ScmConfig::new(vec![Fixtures::foo(RevisionSelector::tag("${cvsTag}", false))]);
        let context = ParameterContext::new().with_parameter("cvsTag", Fixtures::FOO_TAG);

        let result = coordinator(&server)
            .checkout(&config, &context, ws.path(), CheckoutMode::Fresh)
            .unwrap();

        assert_checked_out(ws.path(), &["tag.txt"]).unwrap();
        assert_eq!(result.environment.get(CVS_BRANCH), Some(Fixtures::FOO_TAG));
        assert_eq!(result.outcomes[0].effective_location.name, Fixtures::FOO_TAG);
    }

    #[test]
    fn test_empty_parameter_checks_out_head() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let config = ScmConfig::new(vec![Fixtures::foo(RevisionSelector::tag("${cvsTag}", false))]);
        let context = ParameterContext::new().with_parameter("cvsTag", "");

        let result = coordinator(&server)
            .checkout(&config, &context, ws.path(), CheckoutMode::Fresh)
            .unwrap();

        assert_checked_out(ws.path(), &["head.txt"]).unwrap();
        assert_eq!(result.environment.get(CVS_BRANCH), None);
        assert_eq!(result.outcomes[0].effective_location.kind, LocationKind::Tag);
        assert!(matches!(
            server.checkout_calls()[0],
            MockCall::Checkout { revision: None, .. }
        ));
    }

    #[test]
    fn test_root_from_environment() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let repo = Repository::new("${CVSROOT}")
            .with_module(Module::new(Fixtures::FOO_MODULE, RevisionSelector::Head));
        let config = ScmConfig::new(vec![repo]);
        let context = ParameterContext::new().with_env("CVSROOT", Fixtures::ROOT);

        let result = coordinator(&server)
            .checkout(&config, &context, ws.path(), CheckoutMode::Fresh)
            .unwrap();

        assert_checked_out(ws.path(), &["head.txt"]).unwrap();
        assert_eq!(result.outcomes[0].key.cvs_root, "${CVSROOT}");
    }
}

// ========== Failure Tests ==========

mod failures {
    use super::*;
    use cvsync_test_utils::prelude::assert_eq;

    #[test]
    fn test_transport_failure_keeps_partial_progress() {
        let server = Fixtures::server();
        server.fail_checkouts_after(1, MockFailure::Unreachable);
        let ws = TempDir::new().unwrap();
        let config = ScmConfig::new(vec![Fixtures::foo_and_bar(
            RevisionSelector::Head,
            RevisionSelector::Head,
        )]);

        let failure = coordinator(&server)
            .checkout(&config, &ParameterContext::new(), ws.path(), CheckoutMode::Fresh)
            .unwrap_err();

        assert!(failure.cause.is_transport());
        assert_eq!(failure.completed().count(), 1);
        assert_eq!(failure.outcomes.len(), 2);
        assert!(!failure.outcomes[1].success);
        assert_checked_out(&foo_dir(ws.path()), &["head.txt"]).unwrap();
        assert!(previous_checkout_aborted(ws.path()));
    }

    #[test]
    fn test_authentication_failure_is_not_retried() {
        let server = Fixtures::server();
        server.fail_with(Fixtures::ROOT, MockFailure::Authentication);
        let ws = TempDir::new().unwrap();
        let config = ScmConfig::new(vec![Fixtures::foo(RevisionSelector::tag(
            Fixtures::WRONG_TAG,
            true,
        ))]);

        let failure = coordinator(&server)
            .checkout(&config, &ParameterContext::new(), ws.path(), CheckoutMode::Fresh)
            .unwrap_err();

        assert!(failure.cause.is_transport());
        assert_eq!(server.checkout_calls().len(), 1);
    }

    #[test]
    fn test_cancellation_between_modules() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let config = ScmConfig::new(vec![Fixtures::foo_and_bar(
            RevisionSelector::Head,
            RevisionSelector::Head,
        )]);
        let coordinator = coordinator(&server);
        coordinator.cancellation_token().cancel();

        let failure = coordinator
            .checkout(&config, &ParameterContext::new(), ws.path(), CheckoutMode::Fresh)
            .unwrap_err();

        assert_eq!(failure.completed().count(), 0);
        assert!(ws.path().join(IN_PROGRESS_MARKER).exists());
    }
}

// ========== Update Tests ==========

mod update_mode {
    use super::*;
    use cvsync_test_utils::prelude::assert_eq;

    fn updatable(location: RevisionSelector) -> ScmConfig {
        let mut config = ScmConfig::new(vec![Fixtures::foo(location)]);
        config.can_use_update = true;
        config
    }

    #[test]
    fn test_update_switches_tag_to_head() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let coordinator = coordinator(&server);
        let ctx = ParameterContext::new();

        coordinator
            .checkout(
                &updatable(RevisionSelector::tag(Fixtures::FOO_TAG, false)),
                &ctx,
                ws.path(),
                CheckoutMode::Fresh,
            )
            .unwrap();
        server.clear_calls();

        let result = coordinator
            .checkout(&updatable(RevisionSelector::Head), &ctx, ws.path(), CheckoutMode::Update)
            .unwrap();

        assert!(matches!(server.checkout_calls()[0], MockCall::Update { .. }));
        assert_checked_out(ws.path(), &["head.txt"]).unwrap();
        assert_not_checked_out(ws.path(), &["tag.txt"]).unwrap();
        let summary = result.summary.unwrap();
        assert!(summary.modules[0].updated);
        assert_eq!(summary.file_count(), 1);
    }

    #[test]
    fn test_missing_branch_updates_to_head() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let coordinator = coordinator(&server);
        let ctx = ParameterContext::new();

        coordinator
            .checkout(&updatable(RevisionSelector::Head), &ctx, ws.path(), CheckoutMode::Fresh)
            .unwrap();
        server.clear_calls();

        let result = coordinator
            .checkout(
                &updatable(RevisionSelector::branch(Fixtures::BAR_BRANCH, true)),
                &ctx,
                ws.path(),
                CheckoutMode::Update,
            )
            .unwrap();

        assert_checked_out(ws.path(), &["head.txt"]).unwrap();
        assert!(result.outcomes[0].fell_back_to_head);
        assert_eq!(result.environment.get(CVS_BRANCH), Some(Fixtures::BAR_BRANCH));
        assert_eq!(
            server.checkout_calls(),
            vec![
                MockCall::Update {
                    module: Fixtures::FOO_MODULE.to_string(),
                    revision: Some(Fixtures::BAR_BRANCH.to_string()),
                    head_fallback: false,
                },
                MockCall::Update {
                    module: Fixtures::FOO_MODULE.to_string(),
                    revision: None,
                    head_fallback: false,
                },
            ]
        );
    }

    #[test]
    fn test_update_without_changes_reports_nothing() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let coordinator = coordinator(&server);
        let ctx = ParameterContext::new();
        let config = updatable(RevisionSelector::Head);

        coordinator.checkout(&config, &ctx, ws.path(), CheckoutMode::Fresh).unwrap();
        let result = coordinator
            .checkout(&config, &ctx, ws.path(), CheckoutMode::Update)
            .unwrap();

        assert!(result.summary.unwrap().is_empty());
    }

    #[test]
    fn test_aborted_checkout_forces_fresh() {
        let server = Fixtures::server();
        server.fail_checkouts_after(0, MockFailure::Timeout);
        let ws = TempDir::new().unwrap();
        let config = updatable(RevisionSelector::Head);
        let ctx = ParameterContext::new();

        assert!(
            coordinator(&server)
                .checkout(&config, &ctx, ws.path(), CheckoutMode::Fresh)
                .is_err()
        );
        assert!(previous_checkout_aborted(ws.path()));

        let healthy = Fixtures::server();
        coordinator(&healthy)
            .checkout(&config, &ctx, ws.path(), CheckoutMode::Update)
            .unwrap();

        assert!(matches!(healthy.checkout_calls()[0], MockCall::Checkout { .. }));
        assert!(!previous_checkout_aborted(ws.path()));
    }

    #[test]
    fn test_module_without_working_copy_is_checked_out() {
        let server = Fixtures::server();
        let ws = TempDir::new().unwrap();
        let mut config = ScmConfig::new(vec![Fixtures::foo_and_bar(
            RevisionSelector::Head,
            RevisionSelector::Head,
        )]);
        config.can_use_update = true;
        std::fs::create_dir_all(foo_dir(ws.path())).unwrap();

        coordinator(&server)
            .checkout(&config, &ParameterContext::new(), ws.path(), CheckoutMode::Update)
            .unwrap();

        assert!(
            server
                .checkout_calls()
                .iter()
                .all(|c| matches!(c, MockCall::Checkout { .. }))
        );
    }
}
