//! Runtime configuration for LJPics
//!
//! Settings are read once at startup from an optional TOML file and passed
//! into the store, client and resolver constructors.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::{Service, DEFAULT_DOMAIN};

/// Shown when a user has no userpic, is blocked or can't be resolved
pub const DEFAULT_USERPIC: &str = "http://l-stat.livejournal.com/img/profile_icons/user.gif";

/// One week (60s * 60m * 24h * 7d)
pub const REFRESH_TIMEOUT_SECS: i64 = 604_800;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Journal service domain
    pub domain: String,
    /// Scheme used when building journal links
    pub scheme: String,
    /// Fallback image for the redirect target
    pub default_userpic: String,
    /// Age in seconds after which a cached row is refetched
    pub refresh_timeout_secs: i64,
    /// Timeout for a single FOAF request
    pub request_timeout_secs: u64,
    /// User agent sent with FOAF requests
    pub user_agent: String,
    /// Database path; the XDG data directory is used when unset
    pub database: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            scheme: "http".to_string(),
            default_userpic: DEFAULT_USERPIC.to_string(),
            refresh_timeout_secs: REFRESH_TIMEOUT_SECS,
            request_timeout_secs: 30,
            user_agent: concat!("ljpics/", env!("CARGO_PKG_VERSION")).to_string(),
            database: None,
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `config.toml` from the XDG config directory if it exists,
    /// otherwise returns the defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `~/.config/ljpics/config.toml` on Linux, or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "ljpics")?;
        Some(project_dirs.config_dir().join("config.toml"))
    }

    /// Link builder for the configured journal service.
    pub fn service(&self) -> Service {
        Service::new(self.domain.clone(), self.scheme.clone())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
