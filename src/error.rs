//! Error types for the emostate client.
//!
//! All errors implement `std::error::Error` and carry enough context to decide
//! whether an operation can be retried.
//!
//! ## Error Categories
//!
//! - **Precondition Errors**: double connect, double disconnect, invalid host or port
//! - **Connection Errors**: DNS failures, refused connections, dropped peers
//! - **Decode Errors**: a single malformed packet on the wire (transient)
//! - **Config Errors**: unreadable or invalid configuration files
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use emoclient::ClientError;
//!
//! let error = ClientError::connection_failed("connection refused");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Main error type for client operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClientError {
    #[error("Client is already connected")]
    AlreadyConnected,

    #[error("Client is already disconnected")]
    AlreadyDisconnected,

    #[error("Invalid {name}: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("Failed to connect to emostate server: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Decode error in {context}: {details}")]
    Decode { context: String, details: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Configuration error ({path}): {reason}")]
    Config {
        path: PathBuf,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Connection { .. } => true,
            ClientError::Timeout { .. } => true,
            ClientError::Io(_) => true,
            ClientError::Decode { .. } => false,
            ClientError::AlreadyConnected => false,
            ClientError::AlreadyDisconnected => false,
            ClientError::InvalidArgument { .. } => false,
            ClientError::Config { .. } => false,
        }
    }

    /// Returns whether this error rejected an operation before any state changed.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ClientError::AlreadyConnected
                | ClientError::AlreadyDisconnected
                | ClientError::InvalidArgument { .. }
        )
    }

    /// Returns whether the receive loop should skip past this error and keep reading.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Decode { .. })
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ClientError::AlreadyConnected => {
                vec!["Call disconnect() before connecting again", "Check is_connected() first"]
            }
            ClientError::AlreadyDisconnected => {
                vec!["Call connect() before disconnecting", "Check is_connected() first"]
            }
            ClientError::InvalidArgument { .. } => vec![
                "Provide a non-empty host name or address",
                "Use a port in the range 1-65535",
            ],
            ClientError::Connection { .. } => vec![
                "Ensure the emostate server is running",
                "Verify the host name resolves",
                "Check the configured port",
                "Call connect() again once the server is reachable",
            ],
            ClientError::Decode { .. } => vec![
                "Check the server speaks the newline-delimited JSON packet format",
                "Verify client and server versions match",
            ],
            ClientError::Timeout { .. } => vec![
                "Increase the configured timeout",
                "Check network latency to the server",
            ],
            ClientError::Config { .. } => vec![
                "Check the configuration file exists and is readable",
                "Verify the YAML keys and value types",
            ],
            ClientError::Io(_) => {
                vec!["Check the network connection", "Call connect() again to start a new session"]
            }
        }
    }

    /// Helper constructor for invalid argument errors.
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        ClientError::InvalidArgument { name, reason: reason.into() }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        ClientError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        ClientError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for decode errors.
    pub fn decode_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        ClientError::Decode { context: context.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        ClientError::Config { path: path.into(), reason: reason.into(), source }
    }
}
