//! Service configuration.
//!
//! Values come from an optional TOML file; environment variables override the
//! file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Overrides [`DirectoryConfig::artifacts_base_url`].
pub const ENV_ARTIFACTS_BASE_URL: &str = "DIRECTORY_ARTIFACTS_BASE_URL";
/// Overrides [`DirectoryConfig::database_path`].
pub const ENV_DATABASE: &str = "DIRECTORY_DATABASE";

/// Page size used when a listing request does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// Upper bound on the page size of listing requests.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path of the file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A value needed by the requested operation is not set.
    #[error("{0} is not configured")]
    Missing(&'static str),
}

/// Directory service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Base URL artifacts and icons are downloaded from.
    pub artifacts_base_url: String,
    /// Page size when a request leaves it unset or zero.
    pub default_page_size: u32,
    /// Largest page size a request may ask for.
    pub max_page_size: u32,
    /// SQLite database location; see [`DirectoryConfig::database_path`].
    pub database_path: Option<PathBuf>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            artifacts_base_url: String::new(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            database_path: None,
        }
    }
}

impl DirectoryConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file at `path` when given, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed, or the
    /// resulting values are invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&source)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from a variable lookup such as the process environment.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_ARTIFACTS_BASE_URL).filter(|v| !v.is_empty()) {
            self.artifacts_base_url = url;
        }
        if let Some(path) = lookup(ENV_DATABASE).filter(|v| !v.is_empty()) {
            self.database_path = Some(PathBuf::from(path));
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "max_page_size",
                reason: "must be at least 1".into(),
            });
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid {
                field: "default_page_size",
                reason: format!("must be between 1 and {}", self.max_page_size),
            });
        }
        Ok(())
    }

    /// The artifacts base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when it is empty.
    pub fn require_artifacts_base_url(&self) -> Result<&str, ConfigError> {
        if self.artifacts_base_url.is_empty() {
            Err(ConfigError::Missing("artifacts_base_url"))
        } else {
            Ok(&self.artifacts_base_url)
        }
    }

    /// Database location: the configured path, else `<data dir>/directory/directory.db`.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_path.clone().or_else(|| {
            dirs::data_dir().map(|dir| dir.join("directory").join("directory.db"))
        })
    }

    /// Effective page size for a request: unset or zero means the default,
    /// anything larger than the maximum is clamped.
    pub fn page_size(&self, requested: Option<u32>) -> u32 {
        match requested {
            None | Some(0) => self.default_page_size,
            Some(size) => size.min(self.max_page_size),
        }
    }
}
