//! Cluster facade
//!
//! The `Cluster` is the entry point of the client: it owns the per-node
//! connection pools, the shared operation builder pool, and the metrics
//! collector. Handles derived from it (`Bucket`, `Scope`, `Collection`) are
//! cheap clones over shared state.
//!
//! A `Cluster` is expensive to create (it establishes and warms connection
//! pools) and is intended to be created once per process and reused;
//! per-operation construction churns pool warm-up and degrades latency.

pub mod bucket;
pub mod collection;
mod router;

pub use bucket::{Bucket, Scope};
pub use collection::{Collection, GetResult, MutationResult};
pub use router::NodeRouter;

use anyhow::Result;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::{Config, NodeConfig, ObservabilityOptions, PoolOptions, TimeoutOptions};
use crate::error::KvError;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::pool::{KvConnectionProvider, OperationBuilderPool, prewarm_pools};
use crate::protocol::{self, OpCode, Request};
use crate::types::BucketName;

/// Key under which the bucket-agnostic provider set is cached
const CLUSTER_SET: &str = "";

/// Shared services every handle hangs on to
#[derive(Debug)]
pub(crate) struct ClusterCtx {
    pub(crate) nodes: Vec<NodeConfig>,
    pub(crate) pool_opts: PoolOptions,
    pub(crate) timeouts: TimeoutOptions,
    pub(crate) observability: ObservabilityOptions,
    pub(crate) builders: OperationBuilderPool,
    pub(crate) metrics: MetricsCollector,
    pub(crate) router: NodeRouter,
    opaque: AtomicU32,
}

impl ClusterCtx {
    /// Next request correlation value; wraps on overflow
    pub(crate) fn next_opaque(&self) -> u32 {
        self.opaque.fetch_add(1, Ordering::Relaxed)
    }
}

/// Rows returned by a cluster-level query
#[derive(Debug, Clone)]
pub struct QueryResult {
    rows: Vec<Vec<u8>>,
}

impl QueryResult {
    /// The returned rows
    #[must_use]
    pub fn rows(&self) -> &[Vec<u8>] {
        &self.rows
    }

    /// Consume the result, returning the rows
    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<u8>> {
        self.rows
    }

    /// Number of rows returned
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the query returned no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A connected cluster
#[derive(Debug, Clone)]
pub struct Cluster {
    ctx: Arc<ClusterCtx>,
    /// Provider sets keyed by bucket name; [`CLUSTER_SET`] holds the
    /// bucket-agnostic pools used for cluster-level operations
    provider_sets: Arc<DashMap<String, Arc<Vec<KvConnectionProvider>>>>,
}

impl Cluster {
    /// Connect to a cluster
    ///
    /// Validates the configuration, builds the per-node connection pools,
    /// and warms each pool to its minimum connection count before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid. Nodes that cannot
    /// be reached during warm-up are logged and retried on first use rather
    /// than failing connect.
    pub async fn connect(config: Config) -> Result<Self> {
        config.validate()?;

        info!("Connecting to cluster with {} node(s):", config.nodes.len());
        for node in &config.nodes {
            info!("  - {} ({})", node.name, node.address());
        }

        let ctx = Arc::new(ClusterCtx {
            builders: OperationBuilderPool::new(
                config.builders.max_capacity.get(),
                config.builders.max_retained.get(),
            ),
            metrics: MetricsCollector::new(config.nodes.len(), config.observability.metrics),
            router: NodeRouter::new(config.nodes.len()),
            opaque: AtomicU32::new(0),
            pool_opts: config.pool,
            timeouts: config.timeouts,
            observability: config.observability,
            nodes: config.nodes,
        });

        let cluster = Self {
            ctx,
            provider_sets: Arc::new(DashMap::new()),
        };

        // Build and warm the bucket-agnostic pools up front so the first
        // operation does not pay connection establishment latency
        cluster.provider_set(None).await?;

        Ok(cluster)
    }

    /// Open a bucket
    ///
    /// The first open of each bucket builds and warms that bucket's per-node
    /// connection pools; subsequent opens reuse them.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket name is empty.
    pub async fn bucket(&self, name: &str) -> Result<Bucket> {
        let bucket_name = BucketName::new(name.to_string())?;
        let providers = self.provider_set(Some(name)).await?;
        Ok(Bucket::new(Arc::clone(&self.ctx), providers, bucket_name))
    }

    /// Run a cluster-level query, spreading statements round-robin over nodes
    ///
    /// # Errors
    ///
    /// Returns a connectivity error if no node connection can be leased, a
    /// timeout error if the node does not answer within the key-value
    /// budget, or a protocol error for malformed responses.
    pub async fn query(&self, statement: &str) -> Result<QueryResult, KvError> {
        let providers = match self.provider_sets.get(CLUSTER_SET) {
            Some(set) => Arc::clone(&set),
            None => {
                return Err(KvError::Unavailable {
                    node: "cluster".to_string(),
                    detail: "cluster provider set missing".to_string(),
                });
            }
        };

        let node = self.ctx.router.next_node();
        let provider = &providers[node.as_index()];
        let opaque = self.ctx.next_opaque();

        let request = Request {
            opcode: OpCode::Query,
            partition: 0,
            opaque,
            cas: 0,
            extras: &[],
            key: &[],
            value: statement.as_bytes(),
        };
        let request_len = request.encoded_len();

        if self.ctx.observability.tracing {
            debug!(node = %node, statement_len = statement.len(), "Dispatching query");
        }

        let started = Instant::now();
        let exchange = async {
            let mut conn = provider.acquire().await?;

            let mut builder = self.ctx.builders.rent(request_len);
            request.encode_into(&mut builder)?;
            conn.write_all(&builder).await?;
            drop(builder);

            protocol::read_response(&mut *conn, self.ctx.builders.rent(4096)).await
        };

        let response = match tokio::time::timeout(self.ctx.timeouts.key_value, exchange).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                self.ctx.metrics.record_error(node);
                return Err(e);
            }
            Err(_) => {
                self.ctx.metrics.record_error(node);
                return Err(KvError::Timeout {
                    operation: OpCode::Query.name(),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                });
            }
        };

        if response.header.opaque != opaque {
            self.ctx.metrics.record_error(node);
            return Err(KvError::Protocol {
                detail: format!(
                    "response desynchronized: sent opaque {}, got {}",
                    opaque, response.header.opaque
                ),
            });
        }
        if !response.header.status.is_success() {
            self.ctx.metrics.record_error(node);
            return Err(KvError::from_status(
                response.header.status,
                statement.as_bytes(),
            ));
        }

        self.ctx.metrics.record_operation(
            node,
            "query",
            request_len as u64,
            (protocol::HEADER_LEN as u64) + u64::from(response.header.body_len),
        );

        let rows = protocol::decode_rows(response.value())?;
        Ok(QueryResult { rows })
    }

    /// Snapshot of operation metrics, including current pool status
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        let snapshot = self.ctx.metrics.snapshot();
        match self.provider_sets.get(CLUSTER_SET) {
            Some(set) => snapshot.with_pool_status(&set[..]),
            None => snapshot,
        }
    }

    /// Scaling state of every node pool in the cluster-level set
    #[must_use]
    pub fn scaler_states(&self) -> Vec<crate::pool::ScalerState> {
        match self.provider_sets.get(CLUSTER_SET) {
            Some(set) => set.iter().map(|p| p.scaler_state()).collect(),
            None => Vec::new(),
        }
    }

    /// Gracefully shut down every pool
    ///
    /// Stops background scaler/health tasks and closes all connection pools.
    pub async fn graceful_shutdown(&self) {
        info!("Shutting down cluster pools");
        // Snapshot the sets first so no map guard is held across await points
        let sets: Vec<Arc<Vec<KvConnectionProvider>>> = self
            .provider_sets
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for set in sets {
            for provider in set.iter() {
                provider.graceful_shutdown().await;
            }
        }
        info!("Cluster shutdown complete");
    }

    /// Get or create the provider set for `bucket` (None = cluster-level)
    async fn provider_set(
        &self,
        bucket: Option<&str>,
    ) -> Result<Arc<Vec<KvConnectionProvider>>> {
        let key = bucket.unwrap_or(CLUSTER_SET);

        let (providers, created) = match self.provider_sets.entry(key.to_string()) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                let set: Vec<KvConnectionProvider> = self
                    .ctx
                    .nodes
                    .iter()
                    .map(|node| {
                        KvConnectionProvider::from_node_config(
                            node,
                            bucket,
                            &self.ctx.pool_opts,
                            &self.ctx.timeouts,
                            self.ctx.builders.clone(),
                        )
                    })
                    .collect::<Result<_>>()?;
                let set = Arc::new(set);
                entry.insert(Arc::clone(&set));
                (set, true)
            }
        };

        if created {
            prewarm_pools(
                &providers,
                &self.ctx.nodes,
                self.ctx.pool_opts.num_kv_connections.get(),
            )
            .await?;
        }

        Ok(providers)
    }
}
