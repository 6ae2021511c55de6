//! Configuration management for Clipcast
//!
//! The TOML file carries paths and service settings only. Credentials never
//! live in it; binaries collect them from flags or the environment and hand
//! them over in a [`RunConfig`].

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

pub const CONFIG_ENV: &str = "CLIPCAST_CONFIG";

/// Default upload ceiling for a single clip (50 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub queue: QueueConfig,
    pub media: MediaConfig,
    pub bluesky: BlueskyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub path: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/clipcast/videos.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub dir: String,
    pub max_upload_bytes: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            dir: "~/.local/share/clipcast/videos".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlueskyConfig {
    /// PDS base URL
    pub service: String,
    /// Per-request timeout enforced by the HTTP client
    pub timeout_secs: u64,
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            service: "https://bsky.social".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from `CLIPCAST_CONFIG` or the XDG location.
    ///
    /// A missing file at the XDG location yields the defaults; a missing
    /// file named by `CLIPCAST_CONFIG` is an error.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load_from_path(&expand_path(&path));
        }

        let path = resolve_config_path()?;
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&path)
    }

    /// Load configuration from an explicit path, or fall back to [`Config::load`]
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.queue.path.trim().is_empty() {
            return Err(ConfigError::MissingField("queue.path".to_string()).into());
        }
        if self.media.dir.trim().is_empty() {
            return Err(ConfigError::MissingField("media.dir".to_string()).into());
        }
        if self.media.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue(
                "media.max_upload_bytes must be greater than zero".to_string(),
            )
            .into());
        }
        if self.bluesky.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "bluesky.timeout_secs must be greater than zero".to_string(),
            )
            .into());
        }
        Ok(())
    }

    pub fn queue_path(&self) -> PathBuf {
        expand_path(&self.queue.path)
    }

    pub fn media_dir(&self) -> PathBuf {
        expand_path(&self.media.dir)
    }

    pub fn media_settings(&self) -> MediaSettings {
        MediaSettings {
            dir: self.media_dir(),
            max_upload_bytes: self.media.max_upload_bytes,
        }
    }
}

/// Where clips live and how large they may be
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSettings {
    pub dir: PathBuf,
    pub max_upload_bytes: u64,
}

/// Account identifier (handle or DID) and app password
pub struct Credentials {
    pub identifier: String,
    pub secret: SecretString,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: SecretString::from(secret.into()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Everything one run needs, resolved up front
#[derive(Debug)]
pub struct RunConfig {
    pub queue_path: PathBuf,
    pub media: MediaSettings,
    pub credentials: Credentials,
}

impl RunConfig {
    pub fn from_config(config: &Config, credentials: Credentials) -> Self {
        Self {
            queue_path: config.queue_path(),
            media: config.media_settings(),
            credentials,
        }
    }
}

/// Expand a leading `~` in a configured path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("clipcast").join("config.toml"))
}
