//! Client configuration.
//!
//! Hosts usually embed this in their own configuration file; every field
//! has a default so an empty document is a valid configuration.

use serde::{Deserialize, Serialize};

use chunkup_protocol::constants::DEFAULT_CHUNK_SIZE;
use chunkup_transfer::SignatureAlgorithm;

use crate::retry::RetryPolicy;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Upload client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Origin of the remote store, e.g. `http://localhost:5000`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Chunk width in bytes, shared by hashing and uploading.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Content signature algorithm.
    #[serde(default)]
    pub signature_algorithm: SignatureAlgorithm,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Per-chunk retry policy.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Capacity of the event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_base_url() -> String {
    "http://localhost:5000".into()
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_event_buffer() -> usize {
    256
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chunk_size: default_chunk_size(),
            signature_algorithm: SignatureAlgorithm::default(),
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetryPolicy::default(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl ClientConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the client cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url is empty".into()));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be > 0".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be >= 1".into()));
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::Invalid("event_buffer must be > 0".into()));
        }
        Ok(())
    }

    /// Request timeout as a [`Duration`](std::time::Duration).
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}
