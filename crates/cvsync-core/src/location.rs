//! Revision selectors and their resolved form.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which revision of a module to check out.
///
/// Tag and branch names may carry `${param}` or `$VAR` tokens; they stay
/// unexpanded until [`crate::ParameterResolver::resolve`] runs for a build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RevisionSelector {
    /// Trunk tip.
    #[default]
    Head,
    /// A static tag.
    #[serde(rename_all = "kebab-case")]
    Tag {
        /// Tag name, possibly parameterized.
        name: String,
        /// Check out HEAD when the tag does not exist.
        #[serde(default)]
        use_head_if_not_found: bool,
    },
    /// A branch tip.
    #[serde(rename_all = "kebab-case")]
    Branch {
        /// Branch name, possibly parameterized.
        name: String,
        /// Check out HEAD when the branch does not exist.
        #[serde(default)]
        use_head_if_not_found: bool,
    },
}

impl RevisionSelector {
    /// Tag selector.
    #[must_use]
    pub fn tag(name: impl Into<String>, use_head_if_not_found: bool) -> Self {
        Self::Tag {
            name: name.into(),
            use_head_if_not_found,
        }
    }

    /// Branch selector.
    #[must_use]
    pub fn branch(name: impl Into<String>, use_head_if_not_found: bool) -> Self {
        Self::Branch {
            name: name.into(),
            use_head_if_not_found,
        }
    }

    /// The kind of revision selected.
    #[must_use]
    pub const fn kind(&self) -> LocationKind {
        match self {
            Self::Head => LocationKind::Head,
            Self::Tag { .. } => LocationKind::Tag,
            Self::Branch { .. } => LocationKind::Branch,
        }
    }

    /// Unexpanded name; empty for HEAD.
    #[must_use]
    pub fn raw_name(&self) -> &str {
        match self {
            Self::Head => "",
            Self::Tag { name, .. } | Self::Branch { name, .. } => name,
        }
    }

    /// Whether a missing reference degrades to HEAD. Always false for HEAD.
    #[must_use]
    pub const fn use_head_if_not_found(&self) -> bool {
        match self {
            Self::Head => false,
            Self::Tag {
                use_head_if_not_found,
                ..
            }
            | Self::Branch {
                use_head_if_not_found,
                ..
            } => *use_head_if_not_found,
        }
    }
}

/// Kind of a resolved location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    /// Trunk tip.
    Head,
    /// Static tag.
    Tag,
    /// Branch tip.
    Branch,
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => write!(f, "head"),
            Self::Tag => write!(f, "tag"),
            Self::Branch => write!(f, "branch"),
        }
    }
}

/// A selector after parameter expansion.
///
/// An empty name on a tag or branch is kept as-is: it is not HEAD, even
/// though the transport receives no `-r` argument for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedLocation {
    /// Kind tag.
    pub kind: LocationKind,
    /// Expanded name; empty for HEAD.
    pub name: String,
    /// Fallback policy carried over from the selector.
    #[serde(default)]
    pub use_head_if_not_found: bool,
}

impl ResolvedLocation {
    /// The HEAD location.
    #[must_use]
    pub const fn head() -> Self {
        Self {
            kind: LocationKind::Head,
            name: String::new(),
            use_head_if_not_found: false,
        }
    }

    /// Whether this is HEAD.
    #[must_use]
    pub const fn is_head(&self) -> bool {
        matches!(self.kind, LocationKind::Head)
    }

    /// The `-r` argument to pass to cvs, if any.
    #[must_use]
    pub fn revision_arg(&self) -> Option<&str> {
        match self.kind {
            LocationKind::Head => None,
            LocationKind::Tag | LocationKind::Branch if self.name.is_empty() => None,
            LocationKind::Tag | LocationKind::Branch => Some(&self.name),
        }
    }
}

impl fmt::Display for ResolvedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LocationKind::Head => write!(f, "HEAD"),
            kind => write!(f, "{kind} '{}'", self.name),
        }
    }
}
