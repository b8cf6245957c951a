//! Repositories, modules and exclusion filters.

use crate::location::RevisionSelector;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Polling depth meaning "no limit".
pub const UNBOUNDED_POLLING_DEPTH: i32 = -1;

const fn default_polling_depth() -> i32 {
    UNBOUNDED_POLLING_DEPTH
}

/// One remote source subtree mapped to one workspace subdirectory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Module {
    /// Remote module path; may contain spaces.
    pub remote_name: String,
    /// Local checkout directory, relative to the workspace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_name: Option<String>,
    /// Revision to check out.
    #[serde(default)]
    pub location: RevisionSelector,
}

impl Module {
    /// Create a module.
    #[must_use]
    pub fn new(remote_name: impl Into<String>, location: RevisionSelector) -> Self {
        Self {
            remote_name: remote_name.into(),
            local_name: None,
            location,
        }
    }

    /// Set the local checkout name.
    #[must_use]
    pub fn with_local_name(mut self, local_name: impl Into<String>) -> Self {
        self.local_name = Some(local_name.into());
        self
    }

    /// Local name if set and non-empty.
    #[must_use]
    pub fn local_name(&self) -> Option<&str> {
        self.local_name.as_deref().filter(|name| !name.is_empty())
    }

    /// Checkout directory relative to the workspace root.
    ///
    /// A local name always wins. Without one, a flattened layout checks out
    /// into the workspace root itself and otherwise into `remote_name`.
    #[must_use]
    pub fn checkout_dir(&self, flatten: bool) -> PathBuf {
        match self.local_name() {
            Some(name) => PathBuf::from(name),
            None if flatten => PathBuf::new(),
            None => PathBuf::from(&self.remote_name),
        }
    }
}

/// A path filter; matching paths are ignored by checkout summaries and polls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExcludedRegion {
    /// Regular expression matched against repository-relative paths.
    pub pattern: String,
}

impl ExcludedRegion {
    /// Create a region from a pattern.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// Compile the pattern, anchored to the whole path.
    pub fn compile(&self) -> Result<Regex, regex::Error> {
        Regex::new(&format!("^(?:{})$", self.pattern))
    }
}

impl fmt::Display for ExcludedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// A compiled set of exclusion filters.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    patterns: Vec<Regex>,
}

impl ExclusionSet {
    /// Compile every region.
    pub fn compile(regions: &[ExcludedRegion]) -> Result<Self, regex::Error> {
        let patterns = regions
            .iter()
            .map(ExcludedRegion::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Whether `path` matches any region.
    #[must_use]
    pub fn is_excluded(&self, path: &str) -> bool {
        let path = path.replace('\\', "/");
        self.patterns.iter().any(|re| re.is_match(&path))
    }

    /// Whether no regions are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// One remote CVS root with its modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Repository {
    /// CVSROOT connection string, possibly parameterized.
    pub cvs_root: String,
    /// Authenticate with a password (pserver).
    #[serde(default)]
    pub password_required: bool,
    /// Compression level 0-9; falls back to the global setting when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_level: Option<u8>,
    /// Modules in checkout order.
    pub modules: Vec<Module>,
    /// Exclusion filters for change summaries and polling.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_regions: Vec<ExcludedRegion>,
    /// Maximum history entries per poll, or -1 for no limit.
    #[serde(default = "default_polling_depth")]
    pub polling_depth: i32,
}

impl Repository {
    /// Create a repository with no modules.
    #[must_use]
    pub fn new(cvs_root: impl Into<String>) -> Self {
        Self {
            cvs_root: cvs_root.into(),
            password_required: false,
            compression_level: None,
            modules: Vec::new(),
            excluded_regions: Vec::new(),
            polling_depth: UNBOUNDED_POLLING_DEPTH,
        }
    }

    /// Append a module.
    #[must_use]
    pub fn with_module(mut self, module: Module) -> Self {
        self.modules.push(module);
        self
    }

    /// Append an exclusion filter.
    #[must_use]
    pub fn with_excluded_region(mut self, pattern: impl Into<String>) -> Self {
        self.excluded_regions.push(ExcludedRegion::new(pattern));
        self
    }

    /// Set the polling depth.
    #[must_use]
    pub const fn with_polling_depth(mut self, depth: i32) -> Self {
        self.polling_depth = depth;
        self
    }

    /// History entry limit for polls; `None` when unbounded.
    #[must_use]
    pub fn polling_limit(&self) -> Option<u32> {
        u32::try_from(self.polling_depth).ok()
    }

    /// Compile the exclusion filters.
    pub fn exclusions(&self) -> Result<ExclusionSet, regex::Error> {
        ExclusionSet::compile(&self.excluded_regions)
    }

    /// Compression level, falling back to `default`.
    #[must_use]
    pub fn effective_compression(&self, default: Option<u8>) -> Option<u8> {
        self.compression_level.or(default)
    }

    /// Key for one of this repository's modules.
    #[must_use]
    pub fn key_for(&self, module: &Module) -> ModuleKey {
        ModuleKey::new(&self.cvs_root, &module.remote_name)
    }
}

/// Identifies a module across builds: configured root plus remote name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleKey {
    /// Configured (unexpanded) CVSROOT.
    pub cvs_root: String,
    /// Remote module name.
    pub remote_name: String,
}

impl ModuleKey {
    /// Create a key.
    #[must_use]
    pub fn new(cvs_root: impl Into<String>, remote_name: impl Into<String>) -> Self {
        Self {
            cvs_root: cvs_root.into(),
            remote_name: remote_name.into(),
        }
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.cvs_root, self.remote_name)
    }
}
