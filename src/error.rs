//! Error types for the key-value client
//!
//! This module provides detailed error types for connection management and
//! key-value operations, making it easier to diagnose and handle different
//! failure scenarios.

use std::fmt;

use crate::protocol::Status;

/// Errors that can occur while talking to the cluster
#[derive(Debug)]
#[non_exhaustive]
pub enum KvError {
    /// TCP connection failed
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// DNS resolution failed
    DnsResolution {
        address: String,
        source: std::io::Error,
    },

    /// Socket configuration failed (buffer sizes, keepalive, etc.)
    SocketConfig {
        operation: String,
        source: std::io::Error,
    },

    /// Hello / bucket selection handshake failed
    Handshake { node: String, detail: String },

    /// No connection could be leased from the pool
    Unavailable { node: String, detail: String },

    /// Connection is stale or broken
    StaleConnection { node: String, reason: String },

    /// The operation did not complete within the configured timeout
    Timeout {
        operation: &'static str,
        elapsed_ms: u64,
    },

    /// The requested document does not exist
    KeyNotFound { key: Vec<u8> },

    /// The document already exists with a different CAS
    KeyExists { key: Vec<u8> },

    /// The value exceeds the server's size limit
    ValueTooLarge { key: Vec<u8> },

    /// The server rejected the request or returned a malformed frame
    Protocol { detail: String },

    /// The server reported a transient condition (busy, temporary failure)
    Transient { status: Status },

    /// I/O error during communication
    Io(std::io::Error),
}

impl fmt::Display for KvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect { host, port, source } => {
                write!(f, "Failed to connect to {}:{}: {}", host, port, source)
            }
            Self::DnsResolution { address, source } => {
                write!(f, "Failed to resolve DNS for {}: {}", address, source)
            }
            Self::SocketConfig { operation, source } => {
                write!(f, "Failed to configure socket ({}): {}", operation, source)
            }
            Self::Handshake { node, detail } => {
                write!(f, "Handshake failed with node '{}': {}", node, detail)
            }
            Self::Unavailable { node, detail } => {
                write!(f, "No connection available for node '{}': {}", node, detail)
            }
            Self::StaleConnection { node, reason } => {
                write!(f, "Stale connection to node '{}': {}", node, reason)
            }
            Self::Timeout {
                operation,
                elapsed_ms,
            } => {
                write!(f, "Operation '{}' timed out after {}ms", operation, elapsed_ms)
            }
            Self::KeyNotFound { key } => {
                write!(f, "Key not found: {}", String::from_utf8_lossy(key))
            }
            Self::KeyExists { key } => {
                write!(f, "Key already exists: {}", String::from_utf8_lossy(key))
            }
            Self::ValueTooLarge { key } => {
                write!(f, "Value too large for key: {}", String::from_utf8_lossy(key))
            }
            Self::Protocol { detail } => write!(f, "Protocol error: {}", detail),
            Self::Transient { status } => {
                write!(f, "Transient server condition: {}", status)
            }
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for KvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connect { source, .. } => Some(source),
            Self::DnsResolution { source, .. } => Some(source),
            Self::SocketConfig { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl KvError {
    /// Check if this is a connectivity error (unreachable node or pool)
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::DnsResolution { .. }
                | Self::Unavailable { .. }
                | Self::StaleConnection { .. }
        )
    }

    /// Check if the operation may be retried safely
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transient { .. } | Self::Timeout { .. } | Self::Unavailable { .. }
        )
    }

    /// Check if this is a missing-document result rather than a failure
    #[must_use]
    pub const fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }

    /// Get the appropriate log level for this error
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        match self {
            // Per-document outcomes are normal control flow
            Self::KeyNotFound { .. } | Self::KeyExists { .. } => tracing::Level::DEBUG,
            // Handshake and protocol errors need attention
            Self::Handshake { .. } | Self::Protocol { .. } => tracing::Level::ERROR,
            // Network errors might be transient
            Self::Connect { .. } | Self::DnsResolution { .. } | Self::Transient { .. } => {
                tracing::Level::WARN
            }
            // Everything else is a warning
            _ => tracing::Level::WARN,
        }
    }

    /// Map a non-success response status to the matching error for `key`
    #[must_use]
    pub fn from_status(status: Status, key: &[u8]) -> Self {
        match status {
            Status::KeyNotFound => Self::KeyNotFound { key: key.to_vec() },
            Status::KeyExists | Status::NotStored => Self::KeyExists { key: key.to_vec() },
            Status::ValueTooLarge => Self::ValueTooLarge { key: key.to_vec() },
            Status::Busy | Status::TemporaryFailure => Self::Transient { status },
            other => Self::Protocol {
                detail: format!("unexpected status {} for key {}", other, String::from_utf8_lossy(key)),
            },
        }
    }
}

impl From<std::io::Error> for KvError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

// Note: No need for From<KvError> for anyhow::Error
// anyhow has a blanket impl for all types implementing std::error::Error
