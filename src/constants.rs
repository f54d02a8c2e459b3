//! Constants used throughout the client
//!
//! This module centralizes magic numbers and default values
//! to improve maintainability and reduce duplication.

use std::time::Duration;

/// Operation builder pool constants
///
/// Builder sizes are chosen for key-value workloads:
/// - Requests are header (24 bytes) + key (< 250 bytes) + value
/// - Typical documents are a few KB; the capacity cap bounds retained memory
pub mod builder {
    /// Page size for memory alignment (4KB = standard OS page)
    pub const PAGE_SIZE: usize = 4096;

    /// Maximum capacity a builder may have and still be retained by the pool
    /// (1 MiB). Builders that grew past this are released instead of pooled,
    /// bounding retained memory at `MAX_CAPACITY * max_retained`.
    pub const MAX_CAPACITY: usize = 1024 * 1024;

    /// Initial capacity for freshly allocated builders (4KB, one page)
    /// Large enough for the header plus a typical small document.
    pub const INITIAL_CAPACITY: usize = 4096;

    /// Multiplier applied to the logical CPU count to derive the default
    /// retained-builder limit.
    pub const RETAINED_PER_CPU: usize = 4;

    // Compile-time validation

    /// Verify the capacity cap is page-aligned at compile time
    const _CAP_ALIGNED: () = assert!(
        MAX_CAPACITY % PAGE_SIZE == 0,
        "MAX_CAPACITY must be page-aligned"
    );

    /// Verify the initial capacity never exceeds the retention cap
    const _INITIAL_LE_CAP: () = assert!(
        INITIAL_CAPACITY <= MAX_CAPACITY,
        "INITIAL_CAPACITY must not exceed MAX_CAPACITY"
    );
}

/// Socket buffer size constants
pub mod socket {
    /// TCP socket receive buffer size for pooled connections (1MB)
    /// Sized for multi-document responses without exhausting memory when
    /// every pool is at its maximum size.
    pub const POOL_RECV_BUFFER: usize = 1024 * 1024;

    /// TCP socket send buffer size for pooled connections (1MB)
    pub const POOL_SEND_BUFFER: usize = 1024 * 1024;
}

/// Timeout constants
pub mod timeout {
    use super::Duration;

    /// Connection timeout for node connections
    pub const CONNECT: Duration = Duration::from_secs(10);

    /// Default overall timeout for a single key-value operation
    pub const KEY_VALUE: Duration = Duration::from_millis(2500);
}

/// Connection pool constants
pub mod pool {
    use super::Duration;

    /// Default minimum connections per node pool
    pub const DEFAULT_MIN_CONNECTIONS: usize = 2;

    /// Default maximum connections per node pool
    pub const DEFAULT_MAX_CONNECTIONS: usize = 5;

    /// Interval between scaler samples of pool status
    pub const SCALE_INTERVAL: Duration = Duration::from_secs(1);

    /// How long a connection must sit idle before the scaler may prune it
    pub const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Consecutive idle-surplus samples required before scaling down
    pub const SCALE_DOWN_AFTER: u32 = 5;

    /// Buffer size for TCP peek during health checks
    /// Only 1 byte needed to detect if connection is readable/closed
    pub const TCP_PEEK_BUFFER_SIZE: usize = 1;

    /// Health check timeout - how long to wait for a Noop response
    pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

    /// Maximum number of idle connections to check per health check cycle
    /// Checking too many at once can temporarily starve the pool
    pub const MAX_CONNECTIONS_PER_HEALTH_CHECK_CYCLE: usize = 3;

    /// Timeout when attempting to get a connection for health checking or
    /// pruning (milliseconds). Short so background tasks never block callers.
    pub const MAINTENANCE_POOL_TIMEOUT_MS: u64 = 100;

    // Compile-time validation

    /// Verify the default bounds are ordered at compile time
    const _BOUNDS_ORDERED: () = assert!(
        DEFAULT_MIN_CONNECTIONS <= DEFAULT_MAX_CONNECTIONS,
        "default min must not exceed default max"
    );
}
