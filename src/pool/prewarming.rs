//! Connection pool prewarming functionality
//!
//! This module handles warming up connection pools by creating each pool's
//! minimum connection count concurrently at startup, so the live-count floor
//! holds before the first operation is issued.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::pool::KvConnectionProvider;

/// Prewarm a single pool by creating its minimum connections concurrently
async fn prewarm_single_pool(
    provider: KvConnectionProvider,
    node_name: String,
    min_connections: usize,
) -> Result<usize> {
    info!(
        "Prewarming pool for '{}' with {} connections",
        node_name, min_connections
    );

    // Create all connections concurrently
    let tasks: Vec<_> = (0..min_connections)
        .map(|i| {
            // Clone Arc references for each async task to satisfy Send + 'static bounds
            let provider = provider.clone();
            let node_name = node_name.clone();

            tokio::spawn(async move {
                provider
                    .acquire()
                    .await
                    .inspect(|_conn| {
                        debug!(
                            "Created connection {}/{} for '{}'",
                            i + 1,
                            min_connections,
                            node_name
                        );
                    })
                    .ok()
            })
        })
        .collect();

    // Wait for all connections and count successes; holding the leases until
    // every task finishes forces distinct connections rather than reuse
    let mut connections = Vec::with_capacity(min_connections);
    for task in tasks {
        if let Ok(Some(conn)) = task.await {
            connections.push(conn);
        }
    }

    let created = connections.len();

    // Drop all leases - they return to the pool as idle
    drop(connections);

    info!(
        "Pool '{}' ready: {}/{} connections created",
        node_name, created, min_connections
    );

    Ok(created)
}

/// Prewarm all node pools before the cluster accepts operations
/// Creates connections concurrently across all pools
pub async fn prewarm_pools(
    providers: &[KvConnectionProvider],
    nodes: &[NodeConfig],
    min_connections: usize,
) -> Result<()> {
    info!("Prewarming all connection pools...");

    // Prewarm all pools concurrently
    let tasks: Vec<_> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let provider = providers[i].clone();
            let node_name = node.name.to_string();

            tokio::spawn(prewarm_single_pool(provider, node_name, min_connections))
        })
        .collect();

    // Wait for all pools and collect results
    let mut total_created = 0;
    let total_expected = min_connections * nodes.len();

    for (task, node) in tasks.into_iter().zip(nodes.iter()) {
        match task.await {
            Ok(Ok(created)) => total_created += created,
            Ok(Err(e)) => warn!(
                "Failed to prewarm pool for '{}': {}",
                node.name.as_str(),
                e
            ),
            Err(e) => warn!(
                "Prewarming task panicked for '{}': {}",
                node.name.as_str(),
                e
            ),
        }
    }

    info!(
        "Prewarming complete: {}/{} connections ready across all pools",
        total_created, total_expected
    );

    Ok(())
}
