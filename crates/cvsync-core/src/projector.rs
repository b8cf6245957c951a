//! Derivation of the `CVS_BRANCH` build variable.

use crate::location::ResolvedLocation;
use crate::outcome::CheckoutOutcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Name of the derived build variable.
pub const CVS_BRANCH: &str = "CVS_BRANCH";

/// Variables to set on, or clear from, the build environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEnvironmentDelta {
    /// `Some` sets the variable, `None` clears it.
    entries: BTreeMap<String, Option<String>>,
}

impl BuildEnvironmentDelta {
    /// Empty delta.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), Some(value.into()));
    }

    /// Clear `name`.
    pub fn unset(&mut self, name: impl Into<String>) {
        self.entries.insert(name.into(), None);
    }

    /// Value to set for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).and_then(|v| v.as_deref())
    }

    /// Merge into an environment map.
    pub fn apply_to(&self, env: &mut BTreeMap<String, String>) {
        for (name, value) in &self.entries {
            match value {
                Some(value) => {
                    env.insert(name.clone(), value.clone());
                }
                None => {
                    env.remove(name);
                }
            }
        }
    }

    /// Only the variables that are set.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.clone(), v.clone())))
            .collect()
    }
}

/// Collapses per-module outcomes into the build environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentProjector;

impl EnvironmentProjector {
    /// Project outcomes onto the environment.
    ///
    /// `CVS_BRANCH` is set only when every module used the same non-empty tag
    /// or branch name. All-HEAD, mixed names, HEAD mixed with a name, and an
    /// empty resolved name all leave it unset.
    #[must_use]
    pub fn project(&self, outcomes: &[CheckoutOutcome]) -> BuildEnvironmentDelta {
        let locations: Vec<&ResolvedLocation> =
            outcomes.iter().map(|o| &o.effective_location).collect();
        let mut delta = BuildEnvironmentDelta::new();
        match Self::uniform_name(&locations) {
            Some(name) => {
                debug!(cvs_branch = name, "all modules share one revision name");
                delta.set(CVS_BRANCH, name);
            }
            None => {
                debug!(modules = outcomes.len(), "no single revision name, clearing CVS_BRANCH");
                delta.unset(CVS_BRANCH);
            }
        }
        delta
    }

    fn uniform_name<'a>(locations: &[&'a ResolvedLocation]) -> Option<&'a str> {
        let mut distinct: Vec<Option<&str>> = Vec::new();
        for &loc in locations {
            let name = if loc.is_head() {
                None
            } else {
                Some(loc.name.as_str())
            };
            if !distinct.contains(&name) {
                distinct.push(name);
            }
        }
        match distinct.as_slice() {
            [Some(name)] if !name.is_empty() => Some(*name),
            _ => None,
        }
    }
}
