//! Real-time metrics collection for the client
//!
//! This module provides lock-free, thread-safe metrics tracking using atomic
//! operations. Metrics are designed to be updated on the operation hot path
//! with minimal overhead, and can be disabled entirely via the
//! `observability.metrics` flag.

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::pool::ConnectionSource;
use crate::types::NodeId;

/// Thread-safe metrics collector for the whole cluster facade
///
/// Uses atomic operations for lock-free updates from multiple tasks.
/// All methods are safe to call concurrently.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Per-node metrics (indexed by node ID)
    node_metrics: Vec<NodeMetrics>,

    /// Operation counts keyed by "bucket.scope.collection"
    collection_ops: DashMap<String, AtomicU64>,

    /// Start time for uptime calculation
    start_time: Instant,

    /// When false every record call is a no-op
    enabled: bool,
}

/// Metrics for a single data node
#[derive(Debug)]
struct NodeMetrics {
    operations: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    errors: AtomicU64,
}

/// Snapshot of current metrics (for display/reporting)
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub total_operations: u64,
    pub uptime: Duration,
    pub node_stats: Vec<NodeStats>,
    /// Operation counts per collection path, unordered
    pub collection_ops: Vec<(String, u64)>,
}

/// Statistics for a single node
#[derive(Debug, Clone)]
pub struct NodeStats {
    pub node_id: usize,
    pub operations: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub errors: u64,
    /// Populated from pool status via `with_pool_status`
    pub live_connections: usize,
    pub in_use_connections: usize,
}

impl MetricsCollector {
    /// Create a new metrics collector
    ///
    /// # Arguments
    /// * `num_nodes` - Number of data nodes to track
    /// * `enabled` - When false, recording is a no-op
    pub fn new(num_nodes: usize, enabled: bool) -> Self {
        let node_metrics = (0..num_nodes)
            .map(|_| NodeMetrics {
                operations: AtomicU64::new(0),
                bytes_sent: AtomicU64::new(0),
                bytes_received: AtomicU64::new(0),
                errors: AtomicU64::new(0),
            })
            .collect();

        Self {
            inner: Arc::new(MetricsInner {
                node_metrics,
                collection_ops: DashMap::new(),
                start_time: Instant::now(),
                enabled,
            }),
        }
    }

    /// Whether recording is active
    #[must_use]
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    /// Record a completed operation against a node
    #[inline]
    pub fn record_operation(
        &self,
        node_id: NodeId,
        collection_path: &str,
        bytes_sent: u64,
        bytes_received: u64,
    ) {
        if !self.inner.enabled {
            return;
        }
        if let Some(node) = self.inner.node_metrics.get(node_id.as_index()) {
            node.operations.fetch_add(1, Ordering::Relaxed);
            node.bytes_sent.fetch_add(bytes_sent, Ordering::Relaxed);
            node.bytes_received
                .fetch_add(bytes_received, Ordering::Relaxed);
        }

        self.inner
            .collection_ops
            .entry(collection_path.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed operation against a node
    #[inline]
    pub fn record_error(&self, node_id: NodeId) {
        if !self.inner.enabled {
            return;
        }
        if let Some(node) = self.inner.node_metrics.get(node_id.as_index()) {
            node.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get the number of nodes being tracked
    #[must_use]
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.inner.node_metrics.len()
    }

    /// Get a snapshot of current metrics
    ///
    /// This creates a point-in-time view of all counters. Individual values
    /// may be slightly inconsistent under concurrent updates, which is
    /// acceptable for reporting.
    ///
    /// **Note:** connection counts are NOT populated here. Use
    /// `MetricsSnapshot::with_pool_status()` to add pool data.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let node_stats: Vec<NodeStats> = self
            .inner
            .node_metrics
            .iter()
            .enumerate()
            .map(|(id, metrics)| NodeStats {
                node_id: id,
                operations: metrics.operations.load(Ordering::Relaxed),
                bytes_sent: metrics.bytes_sent.load(Ordering::Relaxed),
                bytes_received: metrics.bytes_received.load(Ordering::Relaxed),
                errors: metrics.errors.load(Ordering::Relaxed),
                live_connections: 0,
                in_use_connections: 0,
            })
            .collect();

        let total_operations = node_stats.iter().map(|n| n.operations).sum();

        let collection_ops = self
            .inner
            .collection_ops
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();

        MetricsSnapshot {
            total_operations,
            uptime: self.inner.start_time.elapsed(),
            node_stats,
            collection_ops,
        }
    }
}

impl MetricsSnapshot {
    /// Populate connection counts from pool status
    ///
    /// `sources` must be indexed by node ID, as built by the cluster facade.
    #[must_use]
    pub fn with_pool_status<S: ConnectionSource>(mut self, sources: &[S]) -> Self {
        for stats in &mut self.node_stats {
            if let Some(source) = sources.get(stats.node_id) {
                let pool_status = source.status();
                stats.live_connections = pool_status.live.get();
                stats.in_use_connections = pool_status.in_use().get();
            }
        }
        self
    }

    /// Format uptime as a human-readable string
    #[must_use]
    pub fn format_uptime(&self) -> String {
        let secs = self.uptime.as_secs();
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Total bytes transferred (sent + received) across nodes
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.node_stats
            .iter()
            .map(|n| n.bytes_sent + n.bytes_received)
            .sum()
    }

    /// Calculate operation throughput in operations per second
    #[must_use]
    pub fn ops_per_second(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs > 0.0 {
            self.total_operations as f64 / secs
        } else {
            0.0
        }
    }
}
