// src/config.rs
//! Client configuration
//!
//! Configuration is an explicit value handed to whoever opens a session.
//! A site-wide `[teamforge]` section can be overridden per job; the
//! precedence is resolved once, in [`Config::effective_connection`].
//!
//! Example configuration:
//! ```toml
//! [teamforge]
//! url = "https://ctf.example.com"
//! username = "builder"
//! password = "secret"
//!
//! [http]
//! timeout_secs = 30
//!
//! [upload]
//! chunk_size = 1048576            # 1 MiB blocks for chunked uploads
//! single_shot_limit = 130023424   # larger files use the chunked pipeline
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Block size of the chunked upload pipeline (1 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Largest file sent through the single-shot upload call
pub const DEFAULT_SINGLE_SHOT_LIMIT: u64 = 130_023_424;

/// Strip trailing slashes so endpoint paths can be appended
pub fn sanitize_server_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Complete credentials for one server
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Possibly incomplete connection values, as read from a file or a job
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamforgeSection {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl TeamforgeSection {
    /// Settings, if url, username and password are all present and non-empty
    pub fn complete(&self) -> Option<ConnectionSettings> {
        let present = |v: &Option<String>| v.as_deref().filter(|s| !s.trim().is_empty()).map(str::to_string);

        Some(ConnectionSettings {
            url: sanitize_server_url(&present(&self.url)?),
            username: present(&self.username)?,
            password: present(&self.password)?,
        })
    }
}

impl fmt::Debug for TeamforgeSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeamforgeSection")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSection {
    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl HttpSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Upload settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSection {
    /// Block size of chunked uploads in bytes (default: 1 MiB)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Files up to this size use the single-shot upload (default: 124 MiB)
    #[serde(default = "default_single_shot_limit")]
    pub single_shot_limit: u64,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            single_shot_limit: default_single_shot_limit(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_single_shot_limit() -> u64 {
    DEFAULT_SINGLE_SHOT_LIMIT
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Site-wide server and credentials
    #[serde(default)]
    pub teamforge: TeamforgeSection,

    #[serde(default)]
    pub http: HttpSection,

    #[serde(default)]
    pub upload: UploadSection,
}

impl Config {
    /// Load and validate a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Parse and validate TOML configuration text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.upload.chunk_size == 0 {
            return Err(Error::ConfigError("upload.chunk_size must be positive".to_string()));
        }
        if self.http.timeout_secs == 0 {
            return Err(Error::ConfigError("http.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Pick the connection to use for a job
    ///
    /// A complete job override wins; otherwise the site-wide section is used.
    /// Returns `None` when neither is complete.
    pub fn effective_connection(&self, job: Option<&TeamforgeSection>) -> Option<ConnectionSettings> {
        job.and_then(TeamforgeSection::complete)
            .or_else(|| self.teamforge.complete())
    }
}
