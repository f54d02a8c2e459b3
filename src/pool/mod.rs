//! Connection and operation builder pooling
//!
//! This module provides the per-node connection pools and the shared
//! operation builder pool used to serialize and deserialize key-value
//! traffic.

pub mod buffer;
mod connection_source;
pub mod health_check;
mod manager;
mod prewarming;
mod provider;
mod scaler;

pub use buffer::{OperationBuilder, OperationBuilderPool};
pub use connection_source::{ConnectionSource, MockConnectionSource, PoolStatus};
pub use health_check::{HealthCheckError, HealthCheckMetrics};
pub use manager::KvTcpManager;
pub use prewarming::prewarm_pools;
pub use provider::{Builder as ProviderBuilder, KvConnectionProvider, PooledConnection};
pub use scaler::{PoolScaler, ScalerState};
