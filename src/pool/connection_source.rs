//! Connection source abstraction
//!
//! This module defines the `ConnectionSource` trait which provides a generic
//! interface over pooled node connections. The abstraction enables:
//! - Easy mocking for testing
//! - Swappable pool implementations
//! - Monitoring without knowledge of the pool internals

use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use tokio::net::TcpStream;

use crate::types::{
    IdleConnections, InUseConnections, LiveConnections, MaxPoolSize, PoolUtilization,
};

/// Generic connection pool status information
#[derive(Debug, Clone, Copy)]
pub struct PoolStatus {
    /// Connections sitting idle in the pool
    pub idle: IdleConnections,
    /// Connections currently open (idle + leased)
    pub live: LiveConnections,
    /// Configured pool capacity
    pub max_size: MaxPoolSize,
}

impl PoolStatus {
    /// Connections currently leased to operations
    #[must_use]
    pub fn in_use(&self) -> InUseConnections {
        InUseConnections::from_pool_stats(self.live, self.idle)
    }

    /// Utilization of the configured capacity
    #[must_use]
    pub fn utilization(&self) -> PoolUtilization {
        PoolUtilization::from_pool_stats(self.max_size, self.live, self.idle)
    }
}

/// Trait for node connection sources - makes it easy to swap implementations
///
/// # Examples
///
/// ```no_run
/// use kvlink::pool::ConnectionSource;
///
/// async fn report(source: &impl ConnectionSource) {
///     let status = source.status();
///     println!("{}: {} live", source.name(), status.live);
/// }
/// ```
#[async_trait]
pub trait ConnectionSource: Send + Sync + Debug {
    /// Take a connection out of the source permanently
    ///
    /// The returned stream is removed from the pool and will NOT be returned
    /// automatically; the caller owns its lifecycle. Operation paths should
    /// prefer leasing via the concrete provider, which returns connections to
    /// rotation on drop.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can be established.
    async fn take_connection(&self) -> Result<TcpStream>;

    /// Get the name/identifier of this source
    ///
    /// Used for logging and metrics to distinguish between nodes.
    fn name(&self) -> &str;

    /// Get current pool statistics
    fn status(&self) -> PoolStatus;

    /// Get the node host this source connects to
    fn host(&self) -> &str;

    /// Get the node port this source connects to
    fn port(&self) -> u16;
}

/// Mock connection source for testing
///
/// Allows tests to exercise code paths that only need names and status
/// without requiring actual network connections.
#[derive(Debug, Clone)]
pub struct MockConnectionSource {
    name: String,
    host: String,
    port: u16,
}

impl MockConnectionSource {
    /// Create a new mock connection source
    ///
    /// # Arguments
    /// * `name` - Identifier for this source (used in logging)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: "mock.example.com".to_string(),
            port: 11210,
        }
    }

    /// Set the mock host
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the mock port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

#[async_trait]
impl ConnectionSource for MockConnectionSource {
    async fn take_connection(&self) -> Result<TcpStream> {
        Err(anyhow::anyhow!(
            "MockConnectionSource::take_connection() - tests should override this"
        ))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> PoolStatus {
        PoolStatus {
            idle: IdleConnections::zero(),
            live: LiveConnections::zero(),
            max_size: MaxPoolSize::new(0),
        }
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn port(&self) -> u16 {
        self.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_status_in_use() {
        let status = PoolStatus {
            idle: IdleConnections::new(2),
            live: LiveConnections::new(5),
            max_size: MaxPoolSize::new(5),
        };
        assert_eq!(status.in_use().get(), 3);
        assert_eq!(status.utilization().as_percentage(), 60.0);
    }

    #[test]
    fn test_mock_defaults() {
        let mock = MockConnectionSource::new("test-node");
        assert_eq!(mock.name(), "test-node");
        assert_eq!(mock.host(), "mock.example.com");
        assert_eq!(mock.port(), 11210);

        let status = mock.status();
        assert_eq!(status.live.get(), 0);
        assert_eq!(status.max_size.get(), 0);
    }

    #[test]
    fn test_mock_customization() {
        let mock = MockConnectionSource::new("custom")
            .with_host("10.0.0.9")
            .with_port(12000);
        assert_eq!(mock.host(), "10.0.0.9");
        assert_eq!(mock.port(), 12000);
    }

    #[tokio::test]
    async fn test_mock_take_connection_errors() {
        let mock = MockConnectionSource::new("test");
        assert!(mock.take_connection().await.is_err());
    }
}
