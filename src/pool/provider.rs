//! Connection pool provider implementation
//!
//! This module contains the `KvConnectionProvider` which manages the pool of
//! key-value connections for one data node. It provides:
//! - Connection pooling bounded by `[num_kv_connections, max_kv_connections]`
//! - Adaptive scaling via a background state machine (disabled if min == max)
//! - Automatic connection recycling
//! - Optional periodic Noop health checks for idle connections
//! - Graceful shutdown

use anyhow::Result;
use async_trait::async_trait;
use deadpool::managed::{self, Timeouts};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::{NodeConfig, PoolOptions, TimeoutOptions};
use crate::constants::pool::{
    MAINTENANCE_POOL_TIMEOUT_MS, MAX_CONNECTIONS_PER_HEALTH_CHECK_CYCLE,
};
use crate::error::KvError;
use crate::pool::connection_source::{ConnectionSource, PoolStatus};
use crate::pool::health_check::{HealthCheckMetrics, check_noop_response};
use crate::pool::manager::KvTcpManager;
use crate::pool::scaler::PoolScaler;
use crate::pool::{OperationBuilderPool, ScalerState};
use crate::types::{IdleConnections, LiveConnections, MaxPoolSize};

type Pool = managed::Pool<KvTcpManager>;

/// A connection leased from the pool; returns to rotation on drop
pub type PooledConnection = managed::Object<KvTcpManager>;

/// Connection provider for one data node
#[derive(Debug, Clone)]
pub struct KvConnectionProvider {
    pool: Pool,
    name: String,
    scaler: Arc<PoolScaler>,
    /// Shutdown signal sender for the background scaler/health tasks
    /// Kept alive to enable graceful shutdown when the provider is dropped
    shutdown_tx: Option<broadcast::Sender<()>>,
    /// Metrics for health check operations (lock-free)
    pub health_check_metrics: Arc<HealthCheckMetrics>,
}

/// Builder for constructing `KvConnectionProvider` instances
///
/// Provides a fluent API for creating providers without a full `Config`,
/// which keeps tests and small tools short.
///
/// # Examples
///
/// ```no_run
/// use kvlink::pool::{KvConnectionProvider, OperationBuilderPool};
///
/// let builders = OperationBuilderPool::new(1024 * 1024, 16);
/// let provider = KvConnectionProvider::builder("kv1.example.com", 11210)
///     .name("kv-node-1")
///     .bucket("travel-sample")
///     .connections(2, 5)
///     .build(builders)
///     .unwrap();
/// ```
pub struct Builder {
    host: String,
    port: u16,
    name: Option<String>,
    bucket: Option<String>,
    min_size: usize,
    max_size: usize,
    connect_timeout: Duration,
    idle_timeout: Duration,
    scale_down_after: u32,
}

impl Builder {
    /// Create a new builder with required connection parameters
    ///
    /// # Arguments
    /// * `host` - Node hostname or IP address
    /// * `port` - Key-value service port
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            name: None,
            bucket: None,
            min_size: crate::constants::pool::DEFAULT_MIN_CONNECTIONS,
            max_size: crate::constants::pool::DEFAULT_MAX_CONNECTIONS,
            connect_timeout: crate::constants::timeout::CONNECT,
            idle_timeout: crate::constants::pool::IDLE_TIMEOUT,
            scale_down_after: crate::constants::pool::SCALE_DOWN_AFTER,
        }
    }

    /// Set a friendly name for logging (defaults to "host:port")
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Bind pooled connections to a bucket during the handshake
    #[must_use]
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Set the pool bounds; equal values disable adaptive scaling
    #[must_use]
    pub fn connections(mut self, min: usize, max: usize) -> Self {
        self.min_size = min;
        self.max_size = max;
        self
    }

    /// Set the connection establishment timeout
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the idle duration after which the scaler may prune a connection
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the surplus-sample threshold for scaling down
    #[must_use]
    pub fn scale_down_after(mut self, samples: u32) -> Self {
        self.scale_down_after = samples;
        self
    }

    /// Build the connection provider
    ///
    /// Background tasks are not started here; see
    /// [`KvConnectionProvider::from_node_config`] which wires them up for
    /// cluster use.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool bounds are inverted.
    pub fn build(self, builders: OperationBuilderPool) -> Result<KvConnectionProvider> {
        if self.min_size > self.max_size {
            return Err(anyhow::anyhow!(
                "min connections ({}) cannot exceed max connections ({})",
                self.min_size,
                self.max_size
            ));
        }

        let name = self
            .name
            .unwrap_or_else(|| format!("{}:{}", self.host, self.port));

        let manager = KvTcpManager::new(
            self.host,
            self.port,
            name.clone(),
            self.bucket,
            self.connect_timeout,
            builders,
        );
        let pool = Pool::builder(manager)
            .max_size(self.max_size)
            .runtime(deadpool::Runtime::Tokio1)
            .build()
            .expect("Failed to create connection pool");

        let scaler = Arc::new(PoolScaler::new(
            self.min_size,
            self.max_size,
            self.idle_timeout,
            self.scale_down_after,
        ));

        info!(
            node = %name,
            min = self.min_size,
            max = self.max_size,
            "Created connection provider"
        );

        Ok(KvConnectionProvider {
            pool,
            name,
            scaler,
            shutdown_tx: None,
            health_check_metrics: Arc::new(HealthCheckMetrics::new()),
        })
    }
}

impl KvConnectionProvider {
    /// Create a builder for constructing a connection provider
    #[must_use]
    pub fn builder(host: impl Into<String>, port: u16) -> Builder {
        Builder::new(host, port)
    }

    /// Create a provider from cluster configuration and start its
    /// background tasks
    ///
    /// Spawns the adaptive scaler (unless the pool is fixed) and, when
    /// `connection_keepalive` is set, the periodic health check task. Must be
    /// called from within a tokio runtime.
    pub fn from_node_config(
        node: &NodeConfig,
        bucket: Option<&str>,
        pool_opts: &PoolOptions,
        timeouts: &TimeoutOptions,
        builders: OperationBuilderPool,
    ) -> Result<Self> {
        let mut provider = Self::builder(node.host.as_str(), node.port.get())
            .name(node.name.as_str())
            .connections(
                pool_opts.num_kv_connections.get(),
                pool_opts.max_kv_connections.get(),
            )
            .connect_timeout(timeouts.connect)
            .idle_timeout(pool_opts.idle_timeout)
            .scale_down_after(pool_opts.scale_down_after);
        if let Some(bucket) = bucket {
            provider = provider.bucket(bucket);
        }
        let mut provider = provider.build(builders.clone())?;

        let needs_tasks = !pool_opts.is_fixed() || pool_opts.connection_keepalive.is_some();
        if needs_tasks {
            let (tx, _) = broadcast::channel(1);

            if !pool_opts.is_fixed() {
                let scaler = Arc::clone(&provider.scaler);
                let pool = provider.pool.clone();
                let name = provider.name.clone();
                let interval = pool_opts.scale_interval;
                let rx = tx.subscribe();
                tokio::spawn(async move {
                    scaler.run(pool, name, interval, rx).await;
                });
            }

            if let Some(interval) = pool_opts.connection_keepalive {
                let pool = provider.pool.clone();
                let name = provider.name.clone();
                let metrics = Arc::clone(&provider.health_check_metrics);
                let rx = tx.subscribe();
                tokio::spawn(async move {
                    Self::run_periodic_health_checks(pool, name, interval, rx, metrics, builders)
                        .await;
                });
            }

            provider.shutdown_tx = Some(tx);
        }

        Ok(provider)
    }

    /// Lease a connection from the pool (returned to rotation when dropped)
    ///
    /// Queues when every connection is leased and the pool is at max size.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::Unavailable`] if no connection can be established.
    pub async fn acquire(&self) -> Result<PooledConnection, KvError> {
        self.pool.get().await.map_err(|e| KvError::Unavailable {
            node: self.name.clone(),
            detail: e.to_string(),
        })
    }

    /// Current state of the pool's scaling state machine
    #[must_use]
    pub fn scaler_state(&self) -> ScalerState {
        self.scaler.state()
    }

    /// The scaler driving this pool (for status reporting)
    #[must_use]
    pub fn scaler(&self) -> &PoolScaler {
        &self.scaler
    }

    /// Get the configured maximum pool size
    #[must_use]
    #[inline]
    pub fn max_size(&self) -> usize {
        self.pool.status().max_size
    }

    /// Get a reference to the health check metrics
    #[must_use]
    pub fn health_check_metrics(&self) -> &HealthCheckMetrics {
        &self.health_check_metrics
    }

    /// Signal the background scaler/health tasks to stop
    pub fn shutdown(&self) {
        if let Some(tx) = &self.shutdown_tx {
            let _ = tx.send(());
        }
    }

    /// Run periodic health checks on idle connections
    ///
    /// This task runs in the background checking a limited number of idle
    /// connections each cycle. It can be gracefully shut down via the
    /// shutdown_rx channel. Health check metrics are recorded in the provided
    /// metrics object.
    async fn run_periodic_health_checks(
        pool: Pool,
        name: String,
        interval: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
        metrics: Arc<HealthCheckMetrics>,
        builders: OperationBuilderPool,
    ) {
        use tokio::time::sleep;

        info!(
            pool = %name,
            interval_secs = interval.as_secs(),
            "Starting periodic health checks"
        );

        loop {
            tokio::select! {
                _ = sleep(interval) => {
                    // Time to run health check
                }
                _ = shutdown_rx.recv() => {
                    info!(pool = %name, "Shutting down periodic health check task");
                    break;
                }
            }

            let status = pool.status();
            if status.available == 0 {
                continue;
            }

            debug!(
                pool = %name,
                available = status.available,
                max_check = MAX_CONNECTIONS_PER_HEALTH_CHECK_CYCLE,
                "Running health check cycle"
            );

            let check_count =
                std::cmp::min(status.available, MAX_CONNECTIONS_PER_HEALTH_CHECK_CYCLE);
            let mut checked = 0u64;
            let mut failed = 0u64;

            let mut timeouts = Timeouts::new();
            timeouts.wait = Some(Duration::from_millis(MAINTENANCE_POOL_TIMEOUT_MS));

            for _ in 0..check_count {
                if let Ok(mut conn_obj) = pool.timeout_get(&timeouts).await {
                    checked += 1;

                    if let Err(e) = check_noop_response(&mut conn_obj, &builders).await {
                        failed += 1;
                        warn!(
                            pool = %name,
                            error = %e,
                            "Health check failed, discarding connection"
                        );
                        // Drop the connection without returning it to pool
                        drop(managed::Object::take(conn_obj));
                    } else {
                        // Connection is healthy, returns to pool via Drop
                        drop(conn_obj);
                    }
                } else {
                    break;
                }
            }

            if checked > 0 {
                metrics.record_cycle(checked, failed);

                debug!(
                    pool = %name,
                    checked = checked,
                    failed = failed,
                    "Health check cycle complete"
                );
            }
        }

        info!(pool = %name, "Periodic health check task terminated");
    }

    /// Gracefully shut down the pool
    ///
    /// Stops background tasks and closes the pool; idle connections close as
    /// they are dropped, leased connections close when their operations
    /// finish.
    pub async fn graceful_shutdown(&self) {
        let status = self.pool.status();
        info!(
            "Shutting down pool '{}' ({} idle connections)",
            self.name, status.available
        );

        self.shutdown();
        self.pool.close();
    }
}

#[async_trait]
impl ConnectionSource for KvConnectionProvider {
    async fn take_connection(&self) -> Result<TcpStream> {
        let conn = self.acquire().await?;

        // Object::take() consumes the wrapper and returns the inner stream.
        // This removes the connection from the pool permanently - it will NOT
        // be returned when dropped. Operation paths use acquire() instead,
        // which leases a connection that returns to rotation on drop.
        let stream = managed::Object::take(conn);
        Ok(stream)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> PoolStatus {
        let status = self.pool.status();
        PoolStatus {
            idle: IdleConnections::new(status.available),
            live: LiveConnections::new(status.size),
            max_size: MaxPoolSize::new(status.max_size),
        }
    }

    fn host(&self) -> &str {
        &self.pool.manager().host
    }

    fn port(&self) -> u16 {
        self.pool.manager().port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_builders() -> OperationBuilderPool {
        OperationBuilderPool::new(1024 * 1024, 8)
    }

    #[tokio::test]
    async fn test_builder_defaults() {
        let builder = Builder::new("kv1.example.com", 11210);
        assert_eq!(builder.host, "kv1.example.com");
        assert_eq!(builder.port, 11210);
        assert_eq!(builder.min_size, 2);
        assert_eq!(builder.max_size, 5);
        assert!(builder.name.is_none());
        assert!(builder.bucket.is_none());
    }

    #[tokio::test]
    async fn test_builder_chaining() {
        let builder = Builder::new("kv1.example.com", 11210)
            .name("primary")
            .bucket("travel-sample")
            .connections(3, 7)
            .scale_down_after(2);

        assert_eq!(builder.name, Some("primary".to_string()));
        assert_eq!(builder.bucket, Some("travel-sample".to_string()));
        assert_eq!(builder.min_size, 3);
        assert_eq!(builder.max_size, 7);
        assert_eq!(builder.scale_down_after, 2);
    }

    #[tokio::test]
    async fn test_builder_default_name_from_host_port() {
        let provider = Builder::new("test.example.com", 12000)
            .build(test_builders())
            .unwrap();

        assert_eq!(provider.name(), "test.example.com:12000");
        assert_eq!(provider.host(), "test.example.com");
        assert_eq!(provider.port(), 12000);
    }

    #[tokio::test]
    async fn test_builder_custom_name_used() {
        let provider = Builder::new("test.example.com", 12000)
            .name("Custom Name")
            .build(test_builders())
            .unwrap();

        assert_eq!(provider.name(), "Custom Name");
    }

    #[tokio::test]
    async fn test_builder_rejects_inverted_bounds() {
        let result = Builder::new("localhost", 11210)
            .connections(6, 5)
            .build(test_builders());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fixed_bounds_disable_scaling() {
        let provider = Builder::new("localhost", 11210)
            .connections(3, 3)
            .build(test_builders())
            .unwrap();

        assert_eq!(provider.scaler_state(), ScalerState::Fixed);
    }

    #[tokio::test]
    async fn test_scaling_bounds_start_idle() {
        let provider = Builder::new("localhost", 11210)
            .connections(2, 5)
            .build(test_builders())
            .unwrap();

        assert_eq!(provider.scaler_state(), ScalerState::Idle);
    }

    #[tokio::test]
    async fn test_status_before_any_connection() {
        let provider = Builder::new("localhost", 11210)
            .connections(2, 5)
            .build(test_builders())
            .unwrap();

        let status = ConnectionSource::status(&provider);
        assert_eq!(status.max_size.get(), 5);
        assert_eq!(status.live.get(), 0);
        assert_eq!(status.idle.get(), 0);
        assert_eq!(status.in_use().get(), 0);
    }

    #[tokio::test]
    async fn test_health_check_metrics_initialization() {
        let provider = Builder::new("localhost", 11210)
            .build(test_builders())
            .unwrap();

        let metrics = provider.health_check_metrics();
        assert_eq!(metrics.cycles_run(), 0);
        assert_eq!(metrics.connections_checked(), 0);
        assert_eq!(metrics.connections_failed(), 0);
        assert_eq!(metrics.failure_rate(), 0.0);
    }

    #[tokio::test]
    async fn test_builder_accepts_string_types() {
        let _ = Builder::new("example.com", 11210);
        let _ = Builder::new(String::from("example.com"), 11210);
        let _ = Builder::new("example.com", 11210).name("test");
        let _ = Builder::new("example.com", 11210).name(String::from("test"));
    }
}
