//! Configuration validation
//!
//! This module provides validation logic for the configuration to ensure
//! all settings are valid before the cluster facade is constructed.

use anyhow::Result;
use std::time::Duration;

use super::types::Config;

const MIN_RECOMMENDED_KEEPALIVE: Duration = Duration::from_secs(30);
const MAX_RECOMMENDED_KEEPALIVE: Duration = Duration::from_secs(300);

impl Config {
    /// Validate configuration for correctness
    ///
    /// Most constraints are already enforced by the type system (NonZero
    /// types, validated strings). This checks remaining semantic constraints:
    /// - At least one node configured
    /// - Pool bounds are ordered (min <= max)
    /// - Keep-alive intervals are in recommended ranges
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(anyhow::anyhow!("Configuration must have at least one node"));
        }

        let min = self.pool.num_kv_connections.get();
        let max = self.pool.max_kv_connections.get();
        if min > max {
            return Err(anyhow::anyhow!(
                "num_kv_connections ({}) cannot exceed max_kv_connections ({})",
                min,
                max
            ));
        }

        if self.pool.scale_interval.is_zero() {
            return Err(anyhow::anyhow!("scale_interval cannot be zero"));
        }

        if let Some(keepalive) = self.pool.connection_keepalive {
            if keepalive < MIN_RECOMMENDED_KEEPALIVE {
                tracing::warn!(
                    "connection_keepalive is {:?} (< {:?}). This may cause excessive \
                     probe traffic and connection churn. Consider at least {:?} or None \
                     to disable.",
                    keepalive,
                    MIN_RECOMMENDED_KEEPALIVE,
                    MIN_RECOMMENDED_KEEPALIVE
                );
            } else if keepalive > MAX_RECOMMENDED_KEEPALIVE {
                tracing::warn!(
                    "connection_keepalive is {:?} (> {:?} / 5 minutes). This may not \
                     detect stale connections quickly enough. Consider a lower value.",
                    keepalive,
                    MAX_RECOMMENDED_KEEPALIVE
                );
            }
        }

        Ok(())
    }
}
