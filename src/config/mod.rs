//! Configuration module
//!
//! This module handles all configuration types and loading
//! for the key-value client.

mod defaults;
mod loading;
mod types;
mod validation;

// Re-export public types
pub use loading::{create_default_config, load_config};
pub use types::{
    BuilderOptions, Config, NodeConfig, NodeConfigBuilder, ObservabilityOptions, PoolOptions,
    TimeoutOptions,
};

// Re-export default functions for use in tests and other modules
pub use defaults::{
    builder_max_capacity, builder_max_retained, connect_timeout, idle_timeout, key_value_timeout,
    max_kv_connections, num_kv_connections, scale_down_after, scale_interval,
};
