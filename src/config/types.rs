//! Configuration type definitions
//!
//! This module contains all the core configuration structures consumed by the
//! cluster facade, the connection pools, and the operation builder pool at
//! construction time. There is no runtime reconfiguration.

use crate::types::{
    BuilderCapacity, HostName, MaxConnections, MinConnections, NodeName, Port, RetainedBuilders,
    duration_ms_serde, duration_serde, option_duration_serde,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level client configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    /// Data nodes of the cluster
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    /// Connection pool settings (shared by every node pool)
    #[serde(default)]
    pub pool: PoolOptions,
    /// Operation builder pool settings
    #[serde(default)]
    pub builders: BuilderOptions,
    /// Timeout budgets
    #[serde(default)]
    pub timeouts: TimeoutOptions,
    /// Tracing/metrics enable flags
    #[serde(default)]
    pub observability: ObservabilityOptions,
}

/// Configuration for a single data node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeConfig {
    pub host: HostName,
    pub port: Port,
    pub name: NodeName,
}

/// Connection pool settings
///
/// The pool keeps between `num_kv_connections` and `max_kv_connections`
/// live connections per node. Setting both to the same value fixes the pool
/// size and disables adaptive scaling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PoolOptions {
    /// Minimum (and warm-up target) connections per node
    pub num_kv_connections: MinConnections,
    /// Maximum connections per node
    pub max_kv_connections: MaxConnections,
    /// Interval between scaler samples of pool status
    #[serde(with = "duration_serde")]
    pub scale_interval: Duration,
    /// How long a connection must sit idle before it may be pruned
    #[serde(with = "duration_serde")]
    pub idle_timeout: Duration,
    /// Consecutive idle-surplus samples required before scaling down
    pub scale_down_after: u32,
    /// Interval for Noop keep-alive probes on idle connections
    /// None disables keep-alive (default)
    #[serde(
        with = "option_duration_serde",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub connection_keepalive: Option<Duration>,
}

impl PoolOptions {
    /// Check whether adaptive scaling is disabled (min == max)
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        self.num_kv_connections.get() == self.max_kv_connections.get()
    }
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            num_kv_connections: super::defaults::num_kv_connections(),
            max_kv_connections: super::defaults::max_kv_connections(),
            scale_interval: super::defaults::scale_interval(),
            idle_timeout: super::defaults::idle_timeout(),
            scale_down_after: super::defaults::scale_down_after(),
            connection_keepalive: None,
        }
    }
}

/// Operation builder pool settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BuilderOptions {
    /// Largest builder capacity that will be retained for reuse
    pub max_capacity: BuilderCapacity,
    /// Maximum number of builders retained (0 in a file = 4 x logical CPUs)
    pub max_retained: RetainedBuilders,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            max_capacity: super::defaults::builder_max_capacity(),
            max_retained: super::defaults::builder_max_retained(),
        }
    }
}

/// Timeout budgets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutOptions {
    /// Connection establishment timeout (seconds)
    #[serde(with = "duration_serde")]
    pub connect: Duration,
    /// Overall budget for a single key-value operation (milliseconds)
    #[serde(with = "duration_ms_serde")]
    pub key_value: Duration,
}

impl Default for TimeoutOptions {
    fn default() -> Self {
        Self {
            connect: super::defaults::connect_timeout(),
            key_value: super::defaults::key_value_timeout(),
        }
    }
}

/// Tracing/metrics enable flags
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityOptions {
    /// Emit per-operation debug spans
    pub tracing: bool,
    /// Record per-node and per-collection counters
    pub metrics: bool,
}

impl Default for ObservabilityOptions {
    fn default() -> Self {
        Self {
            tracing: super::defaults::tracing_enabled(),
            metrics: super::defaults::metrics_enabled(),
        }
    }
}

/// Builder for constructing `NodeConfig` instances
///
/// Provides a fluent API for creating node configurations, especially useful
/// in tests where the validated field types are verbose to construct.
///
/// # Examples
///
/// ```
/// use kvlink::config::NodeConfig;
///
/// let node = NodeConfig::builder("kv1.example.com", 11210)
///     .name("kv-node-1")
///     .build()
///     .unwrap();
/// assert_eq!(node.port.get(), 11210);
/// ```
pub struct NodeConfigBuilder {
    host: String,
    port: u16,
    name: Option<String>,
}

impl NodeConfigBuilder {
    /// Create a new builder with required parameters
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
        }
    }

    /// Set a friendly name for logging (defaults to "host:port")
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Build the NodeConfig
    ///
    /// # Errors
    ///
    /// Returns an error if the host is empty, the port is 0, or an
    /// explicitly-set name is empty.
    pub fn build(self) -> Result<NodeConfig, anyhow::Error> {
        let host = HostName::new(self.host.clone())?;

        let port = Port::new(self.port)
            .ok_or_else(|| anyhow::anyhow!("Invalid port: {} (must be 1-65535)", self.port))?;

        let name_str = self
            .name
            .unwrap_or_else(|| format!("{}:{}", self.host, self.port));
        let name = NodeName::new(name_str)?;

        Ok(NodeConfig { host, port, name })
    }
}

impl NodeConfig {
    /// Create a builder for constructing a NodeConfig
    #[must_use]
    pub fn builder(host: impl Into<String>, port: u16) -> NodeConfigBuilder {
        NodeConfigBuilder::new(host, port)
    }

    /// The "host:port" address of this node
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_options_defaults() {
        let options = PoolOptions::default();
        assert_eq!(options.num_kv_connections.get(), 2);
        assert_eq!(options.max_kv_connections.get(), 5);
        assert!(!options.is_fixed());
        assert!(options.connection_keepalive.is_none());
    }

    #[test]
    fn test_pool_options_fixed() {
        let options = PoolOptions {
            num_kv_connections: MinConnections::new(3).unwrap(),
            max_kv_connections: MaxConnections::new(3).unwrap(),
            ..Default::default()
        };
        assert!(options.is_fixed());
    }

    #[test]
    fn test_timeout_defaults() {
        let timeouts = TimeoutOptions::default();
        assert_eq!(timeouts.connect, Duration::from_secs(10));
        assert_eq!(timeouts.key_value, Duration::from_millis(2500));
    }

    #[test]
    fn test_observability_defaults_enabled() {
        let observability = ObservabilityOptions::default();
        assert!(observability.tracing);
        assert!(observability.metrics);
    }

    #[test]
    fn test_node_builder_minimal() {
        let node = NodeConfig::builder("kv1.example.com", 11210).build().unwrap();
        assert_eq!(node.host.as_str(), "kv1.example.com");
        assert_eq!(node.port.get(), 11210);
        // Default name is host:port
        assert_eq!(node.name.as_str(), "kv1.example.com:11210");
    }

    #[test]
    fn test_node_builder_with_name() {
        let node = NodeConfig::builder("kv1.example.com", 11210)
            .name("primary")
            .build()
            .unwrap();
        assert_eq!(node.name.as_str(), "primary");
    }

    #[test]
    fn test_node_builder_rejects_bad_input() {
        assert!(NodeConfig::builder("", 11210).build().is_err());
        assert!(NodeConfig::builder("kv1.example.com", 0).build().is_err());
        assert!(
            NodeConfig::builder("kv1.example.com", 11210)
                .name("  ")
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_node_address() {
        let node = NodeConfig::builder("10.0.0.1", 11210).build().unwrap();
        assert_eq!(node.address(), "10.0.0.1:11210");
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = Config {
            nodes: vec![
                NodeConfig::builder("kv1.example.com", 11210)
                    .name("kv-1")
                    .build()
                    .unwrap(),
                NodeConfig::builder("kv2.example.com", 11210)
                    .name("kv-2")
                    .build()
                    .unwrap(),
            ],
            ..Default::default()
        };

        let toml_string = toml::to_string_pretty(&config).unwrap();
        assert!(toml_string.contains("kv1.example.com"));
        assert!(toml_string.contains("num_kv_connections"));

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_config_partial_toml_uses_defaults() {
        let toml_str = r#"
            [[nodes]]
            host = "kv1.example.com"
            port = 11210
            name = "kv-1"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.nodes.len(), 1);
        assert_eq!(config.pool.num_kv_connections.get(), 2);
        assert_eq!(config.pool.max_kv_connections.get(), 5);
        assert_eq!(config.builders.max_capacity.get(), 1024 * 1024);
        assert!(config.observability.metrics);
    }

    #[test]
    fn test_config_rejects_zero_pool_bounds() {
        let toml_str = r#"
            [pool]
            num_kv_connections = 0
        "#;
        assert!(toml::from_str::<Config>(toml_str).is_err());

        let toml_str = r#"
            [pool]
            max_kv_connections = 0
        "#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn test_config_keepalive_seconds() {
        let toml_str = r#"
            [pool]
            connection_keepalive = 60
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.pool.connection_keepalive,
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_config_key_value_timeout_millis() {
        let toml_str = r#"
            [timeouts]
            key_value = 750
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.timeouts.key_value, Duration::from_millis(750));
    }
}
