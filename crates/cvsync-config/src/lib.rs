//! Configuration for cvsync jobs.
//!
//! - [`ScmConfig`]: repositories, modules and checkout options of one job
//! - [`GlobalSettings`]: installation-wide defaults, overridable from the
//!   environment through [`EnvConfig`]
//! - [`upgrade_legacy_config`]: converts the single-CVSROOT format
//! - [`Validator`]: collects every problem before a checkout starts

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod env;
pub mod error;
pub mod legacy;
pub mod loader;
pub mod types;
pub mod validate;

pub use env::{CvsyncEnvVar, EnvConfig};
pub use error::{ConfigError, Result};
pub use legacy::{LegacyConfig, upgrade_legacy_config};
pub use loader::{ConfigFormat, ConfigLoader, LoadedConfig, SETTINGS_FILE};
pub use types::{CONFIG_VERSION, GlobalSettings, ScmConfig};
pub use validate::{Severity, ValidationIssue, ValidationResult, Validator};
