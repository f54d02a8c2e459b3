//! Connection pool metric newtypes
//!
//! Type-safe wrappers for pool statistics so different counts cannot be
//! mixed up when reporting status. Unlike a fixed-size pool, a scaling pool
//! distinguishes the configured maximum from the current live count.

use std::fmt;

/// Number of idle connections ready to be leased
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdleConnections(usize);

impl IdleConnections {
    /// Create a new idle connections count
    #[inline]
    pub const fn new(count: usize) -> Self {
        Self(count)
    }

    /// Get the raw value
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Create zero idle connections
    #[inline]
    pub const fn zero() -> Self {
        Self(0)
    }
}

impl fmt::Display for IdleConnections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for IdleConnections {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

/// Configured maximum size of the connection pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaxPoolSize(usize);

impl MaxPoolSize {
    /// Create a new maximum pool size
    #[inline]
    pub const fn new(size: usize) -> Self {
        Self(size)
    }

    /// Get the raw value
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for MaxPoolSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for MaxPoolSize {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

/// Number of connections currently open (idle + in use)
///
/// For a scaling pool this moves between the configured minimum and maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LiveConnections(usize);

impl LiveConnections {
    /// Create a new live connections count
    #[inline]
    pub const fn new(count: usize) -> Self {
        Self(count)
    }

    /// Get the raw value
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Create zero live connections (initial state)
    #[inline]
    pub const fn zero() -> Self {
        Self(0)
    }
}

impl fmt::Display for LiveConnections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for LiveConnections {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

/// Number of connections currently leased to operations
///
/// Calculated as: live - idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InUseConnections(usize);

impl InUseConnections {
    /// Create a new in-use connections count
    #[inline]
    pub const fn new(count: usize) -> Self {
        Self(count)
    }

    /// Get the raw value
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Calculate from live and idle counts
    #[inline]
    pub fn from_pool_stats(live: LiveConnections, idle: IdleConnections) -> Self {
        Self(live.get().saturating_sub(idle.get()))
    }

    /// Create zero in-use connections
    #[inline]
    pub const fn zero() -> Self {
        Self(0)
    }
}

impl fmt::Display for InUseConnections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for InUseConnections {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

/// Pool utilization as a percentage (0-100) of the configured maximum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolUtilization(f64);

impl PoolUtilization {
    /// Create a new pool utilization percentage
    ///
    /// # Panics
    /// Panics if percentage is not in range [0.0, 100.0]
    #[inline]
    pub fn new(percentage: f64) -> Self {
        assert!(
            (0.0..=100.0).contains(&percentage),
            "Utilization must be 0-100%, got {}",
            percentage
        );
        Self(percentage)
    }

    /// Calculate utilization from pool stats
    #[inline]
    pub fn from_pool_stats(max: MaxPoolSize, live: LiveConnections, idle: IdleConnections) -> Self {
        let max_size = max.get();
        if max_size == 0 {
            return Self(0.0);
        }

        let in_use = live.get().saturating_sub(idle.get()).min(max_size);
        let utilization = (in_use as f64 / max_size as f64) * 100.0;
        Self(utilization)
    }

    /// Get the percentage value
    #[inline]
    #[must_use]
    pub fn as_percentage(self) -> f64 {
        self.0
    }

    /// Check if every connection slot is leased (100%)
    #[inline]
    #[must_use]
    pub fn is_full(self) -> bool {
        self.0 >= 100.0
    }

    /// Check if no connection is leased (0%)
    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0.0
    }

    /// Check if pool is under high load (>= 80%)
    #[inline]
    #[must_use]
    pub fn is_high_load(self) -> bool {
        self.0 >= 80.0
    }
}

impl fmt::Display for PoolUtilization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_connections() {
        let idle = IdleConnections::new(5);
        assert_eq!(idle.get(), 5);
        assert_eq!(format!("{}", idle), "5");

        let zero = IdleConnections::zero();
        assert_eq!(zero.get(), 0);
    }

    #[test]
    fn test_max_pool_size() {
        let max = MaxPoolSize::new(5);
        assert_eq!(max.get(), 5);
        assert_eq!(format!("{}", max), "5");
    }

    #[test]
    fn test_live_connections() {
        let live = LiveConnections::new(3);
        assert_eq!(live.get(), 3);
        assert_eq!(LiveConnections::zero().get(), 0);
    }

    #[test]
    fn test_in_use_connections() {
        let live = LiveConnections::new(4);
        let idle = IdleConnections::new(1);
        let in_use = InUseConnections::from_pool_stats(live, idle);
        assert_eq!(in_use.get(), 3);
    }

    #[test]
    fn test_in_use_saturating() {
        // idle > live should clamp to zero rather than underflow
        let live = LiveConnections::new(2);
        let idle = IdleConnections::new(10);
        let in_use = InUseConnections::from_pool_stats(live, idle);
        assert_eq!(in_use.get(), 0);
    }

    #[test]
    fn test_pool_utilization() {
        let max = MaxPoolSize::new(5);
        let live = LiveConnections::new(5);
        let idle = IdleConnections::new(1);
        let utilization = PoolUtilization::from_pool_stats(max, live, idle);
        assert_eq!(utilization.as_percentage(), 80.0);
        assert_eq!(format!("{}", utilization), "80.0%");
        assert!(utilization.is_high_load());
    }

    #[test]
    fn test_pool_utilization_full() {
        let max = MaxPoolSize::new(5);
        let live = LiveConnections::new(5);
        let idle = IdleConnections::new(0);
        let utilization = PoolUtilization::from_pool_stats(max, live, idle);
        assert!(utilization.is_full());
        assert!(!utilization.is_empty());
    }

    #[test]
    fn test_pool_utilization_empty() {
        let max = MaxPoolSize::new(5);
        let live = LiveConnections::new(2);
        let idle = IdleConnections::new(2);
        let utilization = PoolUtilization::from_pool_stats(max, live, idle);
        assert!(utilization.is_empty());
        assert!(!utilization.is_full());
        assert!(!utilization.is_high_load());
    }

    #[test]
    fn test_pool_utilization_zero_max() {
        let utilization = PoolUtilization::from_pool_stats(
            MaxPoolSize::new(0),
            LiveConnections::zero(),
            IdleConnections::zero(),
        );
        assert_eq!(utilization.as_percentage(), 0.0);
    }

    #[test]
    #[should_panic(expected = "Utilization must be 0-100%")]
    fn test_pool_utilization_invalid() {
        PoolUtilization::new(150.0);
    }

    #[test]
    fn test_ordering() {
        let small = IdleConnections::new(1);
        let large = IdleConnections::new(10);
        assert!(small < large);
        assert_eq!(small, small);
    }

    #[test]
    fn test_from_conversions() {
        let idle: IdleConnections = 5usize.into();
        assert_eq!(idle.get(), 5);

        let max: MaxPoolSize = 10usize.into();
        assert_eq!(max.get(), 10);

        let live: LiveConnections = 3usize.into();
        assert_eq!(live.get(), 3);
    }
}
