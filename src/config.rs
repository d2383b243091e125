//! Client configuration
//!
//! Configuration is deliberately small: where the server lives and how long
//! to wait on it. It can be built in code or loaded from YAML:
//!
//! ```yaml
//! host: 192.168.1.20
//! port: 1726
//! connect_timeout_ms: 2000
//! ```
//!
//! Missing keys fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::{ClientError, Result};

/// Port the emostate server listens on unless told otherwise
pub const DEFAULT_PORT: u16 = 1726;

/// Host used when none is configured
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Server host name or address
    pub host: String,

    /// Server port
    pub port: u16,

    /// How long `connect()` waits for the worker to come up
    pub connect_timeout_ms: u64,

    /// How long a disconnect waits for the worker thread to stop
    pub stop_timeout_ms: u64,

    /// Longest accepted packet line in bytes
    pub max_frame_length: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout_ms: 5_000,
            stop_timeout_ms: 1_000,
            max_frame_length: 64 * 1024,
        }
    }
}

impl ClientConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: ClientConfig = serde_yaml_ng::from_str(yaml).map_err(|e| {
            ClientError::config_error("<inline>", "invalid YAML", Some(Box::new(e)))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config_error(path, "cannot read file", Some(Box::new(e)))
        })?;
        let config: ClientConfig = serde_yaml_ng::from_str(&yaml)
            .map_err(|e| ClientError::config_error(path, "invalid YAML", Some(Box::new(e))))?;
        config.validate()?;
        debug!(path = %path.display(), host = %config.host, port = config.port, "Loaded client config");
        Ok(config)
    }

    /// Check the values a client cannot work with
    pub fn validate(&self) -> Result<()> {
        validate_host(&self.host)?;
        validate_port(self.port)?;
        if self.connect_timeout_ms == 0 {
            return Err(ClientError::invalid_argument("connect_timeout_ms", "must be non-zero"));
        }
        if self.max_frame_length == 0 {
            return Err(ClientError::invalid_argument("max_frame_length", "must be non-zero"));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

pub(crate) fn validate_host(host: &str) -> Result<()> {
    if host.trim().is_empty() {
        return Err(ClientError::invalid_argument("host", "must be non-empty"));
    }
    Ok(())
}

pub(crate) fn validate_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(ClientError::invalid_argument("port", "must be between 1 and 65535"));
    }
    Ok(())
}
