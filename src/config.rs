//! Configuration types for replay-upload

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Backend connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL that `auth`, `auth/status`, `upload` and `upload/status` are joined onto
    /// (default: "http://127.0.0.1:5000/api/")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout applied to every request (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl ServerConfig {
    /// Parse the base URL, guaranteeing a trailing slash so relative joins keep the path prefix
    pub fn parsed_base_url(&self) -> Result<Url> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw)?;
        if url.cannot_be_a_base() {
            return Err(Error::config(
                "server.base_url",
                format!("'{}' cannot be used as a base URL", self.base_url),
            ));
        }
        Ok(url)
    }
}

/// Client-side file screening, applied before any request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Smallest accepted file in bytes, inclusive (default: 262144 = 256 KiB)
    #[serde(default = "default_min_size_bytes")]
    pub min_size_bytes: u64,

    /// Largest accepted file in bytes, inclusive (default: 3145728 = 3 MiB)
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,

    /// Required file name suffix (default: ".replay")
    #[serde(default = "default_required_extension")]
    pub required_extension: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_size_bytes: default_min_size_bytes(),
            max_size_bytes: default_max_size_bytes(),
            required_extension: default_required_extension(),
        }
    }
}

/// Processing status polling
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Fixed delay before each status query (default: 2 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub interval: Duration,

    /// Give up once this much time has elapsed since processing started (default: 30 seconds)
    #[serde(default = "default_poll_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            timeout: default_poll_timeout(),
        }
    }
}

/// Upload body settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Size of the body chunks handed to the transport; progress is reported per chunk
    /// (default: 65536)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

/// Main configuration for the [`Uploader`](crate::Uploader)
///
/// Every field has a default, so `Config::default()` talks to a local backend with
/// the stock `.replay` rules.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend connection settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Local validation rules
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Status polling cadence and budget
    #[serde(default)]
    pub polling: PollingConfig,

    /// Upload body settings
    #[serde(default)]
    pub upload: UploadConfig,
}

impl Config {
    /// Parse a JSON configuration document and validate it
    ///
    /// Missing sections and fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for inconsistent values
    pub fn validate(&self) -> Result<()> {
        self.server.parsed_base_url()?;

        let v = &self.validation;
        if v.required_extension.is_empty() {
            return Err(Error::config(
                "validation.required_extension",
                "required extension must not be empty",
            ));
        }
        if v.min_size_bytes > v.max_size_bytes {
            return Err(Error::config(
                "validation.min_size_bytes",
                format!(
                    "minimum size {} exceeds maximum size {}",
                    v.min_size_bytes, v.max_size_bytes
                ),
            ));
        }
        if self.polling.interval.is_zero() {
            return Err(Error::config(
                "polling.interval",
                "poll interval must be non-zero",
            ));
        }
        if self.upload.chunk_size == 0 {
            return Err(Error::config(
                "upload.chunk_size",
                "chunk size must be non-zero",
            ));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000/api/".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("replay-upload/{}", env!("CARGO_PKG_VERSION"))
}

fn default_min_size_bytes() -> u64 {
    256 * 1024
}

fn default_max_size_bytes() -> u64 {
    3 * 1024 * 1024
}

fn default_required_extension() -> String {
    ".replay".to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_poll_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_chunk_size() -> usize {
    64 * 1024
}

// Durations are written as whole seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
