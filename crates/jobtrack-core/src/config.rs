//! Storage configuration
//!
//! Read from `<data dir>/config.toml` when present; `JOBTRACK_BACKEND` and
//! `JOBTRACK_FLAT_QUOTA` override the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{StorageError, StorageResult};
use crate::storage::DEFAULT_FLAT_QUOTA;

pub const CONFIG_FILE: &str = "config.toml";
pub const DATA_DIR_ENV: &str = "JOBTRACK_DATA_DIR";
pub const BACKEND_ENV: &str = "JOBTRACK_BACKEND";
pub const FLAT_QUOTA_ENV: &str = "JOBTRACK_FLAT_QUOTA";

/// Which backends selection may consider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// Probe SQLite, fall back to flat storage on failure
    #[default]
    Auto,
    /// Treat the indexed engine as absent
    Flat,
}

impl FromStr for BackendPreference {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "sqlite" | "indexed" => Ok(Self::Auto),
            "flat" => Ok(Self::Flat),
            other => Err(StorageError::Config(format!(
                "unknown backend '{other}' (expected 'auto' or 'flat')"
            ))),
        }
    }
}

/// Where and how data is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for all storage files
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Backend selection policy
    pub backend: BackendPreference,
    /// SQLite file name, relative to `data_dir`
    pub database_file: String,
    /// Byte limit for the flat backend
    pub flat_quota_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".jobtrack"),
            backend: BackendPreference::Auto,
            database_file: "jobtrack.db".to_string(),
            flat_quota_bytes: DEFAULT_FLAT_QUOTA,
        }
    }
}

impl StorageConfig {
    /// Defaults rooted at `data_dir`
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            ..Self::default()
        }
    }

    /// Set the backend preference
    #[must_use]
    pub fn with_backend(mut self, backend: BackendPreference) -> Self {
        self.backend = backend;
        self
    }

    /// Load `config.toml` from `data_dir` (if any) and apply environment overrides
    ///
    /// # Errors
    /// Returns an error if the file or an override cannot be parsed
    pub fn load(data_dir: &Path) -> StorageResult<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            toml::from_str::<Self>(&contents).map_err(|e| {
                StorageError::Config(format!("{}: {e}", path.display()))
            })?
        } else {
            Self::default()
        };
        config.data_dir = data_dir.to_path_buf();
        config.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable lookup
    ///
    /// # Errors
    /// Returns an error if an override has an invalid value
    pub fn apply_overrides<F>(mut self, lookup: F) -> StorageResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup(BACKEND_ENV) {
            self.backend = backend.parse()?;
        }
        if let Some(quota) = lookup(FLAT_QUOTA_ENV) {
            self.flat_quota_bytes = quota.trim().parse().map_err(|_| {
                StorageError::Config(format!("{FLAT_QUOTA_ENV} must be a byte count, got '{quota}'"))
            })?;
        }
        Ok(self)
    }

    /// Path of the SQLite database
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    /// Directory of the flat key-value store
    #[must_use]
    pub fn flat_dir(&self) -> PathBuf {
        self.data_dir.join("flat")
    }

    /// File holding the current session
    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session")
    }
}

/// Resolve the data directory
///
/// Priority:
/// 1. `$JOBTRACK_DATA_DIR`
/// 2. `$HOME/.jobtrack` (or `%USERPROFILE%\.jobtrack`)
/// 3. Platform data directory
#[must_use]
pub fn default_data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir));
        }
    }

    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        return Some(PathBuf::from(home).join(".jobtrack"));
    }

    dirs::data_dir().map(|dir| dir.join("jobtrack"))
}
