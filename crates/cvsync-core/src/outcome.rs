//! Per-module checkout outcome.

use crate::location::ResolvedLocation;
use crate::model::ModuleKey;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of checking out one module in one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CheckoutOutcome {
    /// Module identity.
    pub key: ModuleKey,
    /// Whether the module was checked out.
    pub success: bool,
    /// The location as requested, even when HEAD was used as a fallback.
    pub effective_location: ResolvedLocation,
    /// Checkout directory relative to the workspace.
    pub directory: PathBuf,
    /// Whether HEAD was substituted for a missing tag or branch.
    #[serde(default)]
    pub fell_back_to_head: bool,
    /// Why the module failed, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl CheckoutOutcome {
    /// A successful outcome.
    #[must_use]
    pub fn succeeded(key: ModuleKey, effective_location: ResolvedLocation, directory: PathBuf) -> Self {
        Self {
            key,
            success: true,
            effective_location,
            directory,
            fell_back_to_head: false,
            failure_reason: None,
        }
    }

    /// A failed outcome.
    #[must_use]
    pub fn failed(
        key: ModuleKey,
        effective_location: ResolvedLocation,
        directory: PathBuf,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            key,
            success: false,
            effective_location,
            directory,
            fell_back_to_head: false,
            failure_reason: Some(reason.into()),
        }
    }

    /// Mark the outcome as served by HEAD.
    #[must_use]
    pub const fn with_head_fallback(mut self) -> Self {
        self.fell_back_to_head = true;
        self
    }
}
