//! Reading and writing job and global configuration files.

use crate::env::EnvConfig;
use crate::error::{ConfigError, Result};
use crate::legacy::LegacyConfig;
use crate::types::{CONFIG_VERSION, GlobalSettings, ScmConfig};
use crate::validate::Validator;
use serde::Deserialize;
use serde::de::IgnoredAny;
use std::path::{Path, PathBuf};

/// Settings file name inside the settings directory.
pub const SETTINGS_FILE: &str = "settings.json";

/// On-disk format of a job document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// Repository list.
    Current,
    /// Single CVSROOT with a module string.
    Legacy,
}

/// Fields that tell the two formats apart.
#[derive(Deserialize)]
struct FormatProbe {
    cvsroot: Option<IgnoredAny>,
    repositories: Option<IgnoredAny>,
}

/// A loaded job configuration and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The configuration, upgraded if necessary.
    pub config: ScmConfig,
    /// Format found on disk.
    pub format: ConfigFormat,
    /// Source file.
    pub path: PathBuf,
}

impl LoadedConfig {
    /// Whether the file was in the legacy format and has not been rewritten.
    #[must_use]
    pub fn was_upgraded(&self) -> bool {
        self.format == ConfigFormat::Legacy
    }
}

/// Loads job configurations and global settings.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Overrides applied to loaded settings.
    env: EnvConfig,
    /// Treat validation warnings as errors.
    strict: bool,
}

impl ConfigLoader {
    /// Create a loader that reads overrides from the process environment.
    pub fn new() -> Result<Self> {
        Ok(Self {
            env: EnvConfig::from_env()?,
            strict: false,
        })
    }

    /// Create a loader with explicit overrides.
    #[must_use]
    pub fn with_env(env: EnvConfig) -> Self {
        Self { env, strict: false }
    }

    /// Enable strict validation.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// The environment overrides in use.
    #[must_use]
    pub const fn env(&self) -> &EnvConfig {
        &self.env
    }

    /// Detect the format of a job document.
    pub fn detect_format(content: &str) -> Result<ConfigFormat> {
        let probe: FormatProbe = sonic_rs::from_str(content)?;
        match (probe.repositories, probe.cvsroot) {
            (Some(_), _) => Ok(ConfigFormat::Current),
            (None, Some(_)) => Ok(ConfigFormat::Legacy),
            (None, None) => Err(ConfigError::invalid_value(
                "repositories",
                "document has neither 'repositories' nor 'cvsroot'",
                "add a 'repositories' list",
            )),
        }
    }

    /// Parse a job document, upgrading the legacy format in memory.
    pub fn parse(&self, content: &str) -> Result<(ScmConfig, ConfigFormat)> {
        let format = Self::detect_format(content)?;
        let config = match format {
            ConfigFormat::Current => sonic_rs::from_str::<ScmConfig>(content)?,
            ConfigFormat::Legacy => {
                let legacy: LegacyConfig = sonic_rs::from_str(content)?;
                legacy.upgrade()?
            }
        };

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                supported: CONFIG_VERSION,
            });
        }

        let result = Validator::new()
            .strict(self.strict)
            .validate_config(&config);
        for issue in result.issues.iter().filter(|i| i.severity != crate::Severity::Error) {
            tracing::warn!(code = issue.code, field = %issue.field, "{}", issue.message);
        }
        result.into_result()?;

        Ok((config, format))
    }

    /// Load a job configuration file.
    pub fn load(&self, path: &Path) -> Result<LoadedConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let (config, format) = self.parse(&content).map_err(|e| match e {
            ConfigError::InvalidJson {
                message,
                line,
                column,
                ..
            } => ConfigError::InvalidJson {
                path: path.to_path_buf(),
                message,
                line,
                column,
            },
            other => other,
        })?;

        tracing::debug!(
            path = %path.display(),
            repositories = config.repositories.len(),
            legacy_format = format == ConfigFormat::Legacy,
            "loaded job configuration"
        );

        Ok(LoadedConfig {
            config,
            format,
            path: path.to_path_buf(),
        })
    }

    /// Write a job configuration in the current format.
    pub fn save(config: &ScmConfig, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }
        let content = sonic_rs::to_string_pretty(config)?;
        std::fs::write(path, content).map_err(|e| ConfigError::io(path, e))
    }

    /// Settings directory: `CVSYNC_HOME`, else `fallback`.
    #[must_use]
    pub fn settings_dir(&self, fallback: &Path) -> PathBuf {
        self.env
            .home
            .clone()
            .unwrap_or_else(|| fallback.to_path_buf())
    }

    /// Load global settings, applying environment overrides.
    ///
    /// A missing file yields the defaults.
    pub fn load_settings(&self, path: &Path) -> Result<GlobalSettings> {
        let mut settings = match std::fs::read_to_string(path) {
            Ok(content) => {
                sonic_rs::from_str(&content).map_err(|e| ConfigError::json(path, &e))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => GlobalSettings::default(),
            Err(e) => return Err(ConfigError::io(path, e)),
        };
        self.env.apply_to(&mut settings);
        Validator::new()
            .strict(self.strict)
            .validate_settings(&settings)
            .into_result()?;
        Ok(settings)
    }

    /// Write global settings.
    pub fn save_settings(settings: &GlobalSettings, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }
        let content = sonic_rs::to_string_pretty(settings)?;
        std::fs::write(path, content).map_err(|e| ConfigError::io(path, e))
    }
}
