//! Default values for configuration fields
//!
//! This module centralizes all default value functions used in serde deserialization.

use crate::constants::{pool, timeout};
use crate::types::{BuilderCapacity, MaxConnections, MinConnections, RetainedBuilders};
use std::time::Duration;

/// Default minimum key-value connections per node
#[inline]
pub fn num_kv_connections() -> MinConnections {
    MinConnections::DEFAULT
}

/// Default maximum key-value connections per node
#[inline]
pub fn max_kv_connections() -> MaxConnections {
    MaxConnections::DEFAULT
}

/// Default interval between pool scaler samples
#[inline]
pub fn scale_interval() -> Duration {
    pool::SCALE_INTERVAL
}

/// Default idle duration before a connection becomes prunable
#[inline]
pub fn idle_timeout() -> Duration {
    pool::IDLE_TIMEOUT
}

/// Default number of consecutive idle samples before scaling down
#[inline]
pub fn scale_down_after() -> u32 {
    pool::SCALE_DOWN_AFTER
}

/// Default capacity cap for retained operation builders (1 MiB)
#[inline]
pub fn builder_max_capacity() -> BuilderCapacity {
    BuilderCapacity::DEFAULT
}

/// Default retained-builder limit (4 x logical CPUs)
#[inline]
pub fn builder_max_retained() -> RetainedBuilders {
    RetainedBuilders::from_cpus()
}

/// Default connection establishment timeout
#[inline]
pub fn connect_timeout() -> Duration {
    timeout::CONNECT
}

/// Default overall key-value operation timeout
#[inline]
pub fn key_value_timeout() -> Duration {
    timeout::KEY_VALUE
}

/// Default for the tracing enable flag (enabled)
#[inline]
pub fn tracing_enabled() -> bool {
    true
}

/// Default for the metrics enable flag (enabled)
#[inline]
pub fn metrics_enabled() -> bool {
    true
}
