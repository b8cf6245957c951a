//! The reference repository used across cvsync tests.
//!
//! Two modules on one pserver root:
//!
//! | module      | HEAD                         | fooTag       | fooBranch       | barBranch       | singleTag     | singleBranch  |
//! |-------------|------------------------------|--------------|-----------------|-----------------|---------------|---------------|
//! | `fooModule` | `head.txt`                   | `tag.txt`    | `branch.txt`    | -               | -             | -             |
//! | `barModule` | `barHead.txt`, `shared.txt`  | `barTag.txt` | `barBranch.txt` | `barBranch.txt` | `barHead.txt` | `barHead.txt` |
//!
//! `singleTag` and `singleBranch` cover one of the two live files of
//! `barModule`.
//! `wrongTag` exists nowhere.

use crate::mock_cvs::MockCvsServer;
use chrono::{DateTime, Duration, TimeZone, Utc};
use cvsync_core::{Module, Repository, RevisionSelector};

/// Collection of pre-built test fixtures.
#[derive(Debug)]
pub struct Fixtures;

impl Fixtures {
    /// CVSROOT of the reference repository.
    pub const ROOT: &'static str = ":pserver:cvsuser:cvs@localhost:/var/lib/cvs";
    /// First module.
    pub const FOO_MODULE: &'static str = "fooModule";
    /// Second module.
    pub const BAR_MODULE: &'static str = "barModule";
    /// Tag on every file of both modules.
    pub const FOO_TAG: &'static str = "fooTag";
    /// Branch present in both modules.
    pub const FOO_BRANCH: &'static str = "fooBranch";
    /// Branch present in `barModule` only.
    pub const BAR_BRANCH: &'static str = "barBranch";
    /// Tag on a single file of `barModule`.
    pub const SINGLE_TAG: &'static str = "singleTag";
    /// Branch on a single file of `barModule`.
    pub const SINGLE_BRANCH: &'static str = "singleBranch";
    /// A tag that does not exist.
    pub const WRONG_TAG: &'static str = "wrongTag";
    /// Polling depth used by repository fixtures.
    pub const POLLING_DEPTH: i32 = 3;

    /// Time of the first commit.
    #[must_use]
    pub fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2011, 1, 1, 0, 0, 0).single().unwrap_or_default()
    }

    /// A time after every fixture commit.
    #[must_use]
    pub fn settled() -> DateTime<Utc> {
        Self::epoch() + Duration::days(30)
    }

    /// A server holding the reference repository.
    #[must_use]
    pub fn server() -> MockCvsServer {
        let server = MockCvsServer::new();
        let t = |days: i64| Self::epoch() + Duration::days(days);

        let root = Self::ROOT;
        let foo = Self::FOO_MODULE;
        server.commit(root, foo, "tag.txt", "tag", t(1));
        server.tag(root, foo, Self::FOO_TAG, &[]);
        server.remove(root, foo, "tag.txt", t(2));
        server.branch(root, foo, Self::FOO_BRANCH, &[]);
        server.commit_on_branch(root, foo, Self::FOO_BRANCH, "branch.txt", "branch", t(3));
        server.commit(root, foo, "head.txt", "head", t(4));

        let bar = Self::BAR_MODULE;
        server.commit(root, bar, "barTag.txt", "barTag", t(1));
        server.tag(root, bar, Self::FOO_TAG, &[]);
        server.remove(root, bar, "barTag.txt", t(2));
        server.branch(root, bar, Self::FOO_BRANCH, &[]);
        server.branch(root, bar, Self::BAR_BRANCH, &[]);
        server.commit_on_branch(root, bar, Self::FOO_BRANCH, "barBranch.txt", "barBranch", t(3));
        server.commit_on_branch(root, bar, Self::BAR_BRANCH, "barBranch.txt", "barBranch", t(3));
        server.commit(root, bar, "barHead.txt", "barHead", t(4));
        server.commit(root, bar, "shared.txt", "shared", t(4));
        server.tag(root, bar, Self::SINGLE_TAG, &["barHead.txt"]);
        server.branch(root, bar, Self::SINGLE_BRANCH, &["barHead.txt"]);

        server
    }

    /// A module of the reference repository.
    #[must_use]
    pub fn module(name: &str, location: RevisionSelector) -> Module {
        Module::new(name, location)
    }

    /// The reference repository with the given modules.
    #[must_use]
    pub fn repository(modules: impl IntoIterator<Item = Module>) -> Repository {
        let mut repo = Repository::new(Self::ROOT).with_polling_depth(Self::POLLING_DEPTH);
        repo.password_required = true;
        repo.modules.extend(modules);
        repo
    }

    /// `fooModule` alone.
    #[must_use]
    pub fn foo(location: RevisionSelector) -> Repository {
        Self::repository([Self::module(Self::FOO_MODULE, location)])
    }

    /// `fooModule` and `barModule`.
    #[must_use]
    pub fn foo_and_bar(foo: RevisionSelector, bar: RevisionSelector) -> Repository {
        Self::repository([
            Self::module(Self::FOO_MODULE, foo),
            Self::module(Self::BAR_MODULE, bar),
        ])
    }
}
