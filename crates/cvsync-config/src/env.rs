//! Environment variable configuration support.

use crate::error::{ConfigError, Result};
use crate::types::GlobalSettings;
use std::path::PathBuf;

/// Environment variables read by cvsync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CvsyncEnvVar {
    /// `CVSYNC_HOME` - directory holding global settings and baselines.
    Home,
    /// `CVSYNC_COMPRESSION` - default compression level.
    Compression,
    /// `CVSYNC_CVS_EXE` - cvs executable.
    CvsExecutable,
    /// `CVSYNC_TIMEOUT` - command timeout in seconds.
    Timeout,
    /// `CVS_RSH` - remote shell for `:ext:` roots.
    CvsRsh,
}

impl CvsyncEnvVar {
    /// Get the environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "CVSYNC_HOME",
            Self::Compression => "CVSYNC_COMPRESSION",
            Self::CvsExecutable => "CVSYNC_CVS_EXE",
            Self::Timeout => "CVSYNC_TIMEOUT",
            Self::CvsRsh => "CVS_RSH",
        }
    }

    /// Get the value from environment.
    #[must_use]
    pub fn get(self) -> Option<String> {
        std::env::var(self.as_str()).ok().filter(|v| !v.is_empty())
    }

    /// Check if the variable is set.
    #[must_use]
    pub fn is_set(self) -> bool {
        self.get().is_some()
    }

    /// Get as path.
    #[must_use]
    pub fn as_path(self) -> Option<PathBuf> {
        self.get().map(PathBuf::from)
    }

    fn parse<T: std::str::FromStr>(self, value: &str) -> Result<T>
    where
        T::Err: std::fmt::Display,
    {
        value.trim().parse().map_err(|e: T::Err| ConfigError::EnvError {
            var: self.as_str().to_string(),
            message: format!("'{value}': {e}"),
        })
    }
}

/// Settings overrides taken from the environment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// Settings directory.
    pub home: Option<PathBuf>,
    /// Compression level.
    pub compression_level: Option<u8>,
    /// cvs executable.
    pub cvs_executable: Option<PathBuf>,
    /// Command timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Remote shell.
    pub cvs_rsh: Option<String>,
}

impl EnvConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| var.get())
    }

    /// Read overrides through `lookup`, which returns the raw value of a variable.
    pub fn from_lookup(lookup: impl Fn(CvsyncEnvVar) -> Option<String>) -> Result<Self> {
        let compression_level = lookup(CvsyncEnvVar::Compression)
            .map(|v| CvsyncEnvVar::Compression.parse::<u8>(&v))
            .transpose()?;
        let timeout_secs = lookup(CvsyncEnvVar::Timeout)
            .map(|v| CvsyncEnvVar::Timeout.parse::<u64>(&v))
            .transpose()?;

        Ok(Self {
            home: lookup(CvsyncEnvVar::Home).map(PathBuf::from),
            compression_level,
            cvs_executable: lookup(CvsyncEnvVar::CvsExecutable).map(PathBuf::from),
            timeout_secs,
            cvs_rsh: lookup(CvsyncEnvVar::CvsRsh),
        })
    }

    /// Apply environment overrides to global settings.
    pub fn apply_to(&self, settings: &mut GlobalSettings) {
        if let Some(level) = self.compression_level {
            settings.compression_level = Some(level);
        }
        if let Some(ref exe) = self.cvs_executable {
            settings.cvs_executable = exe.clone();
        }
        if let Some(timeout) = self.timeout_secs {
            settings.command_timeout_secs = Some(timeout);
        }
    }
}
