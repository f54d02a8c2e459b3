//! Adaptive pool scaling
//!
//! The scaler adjusts the live connection count of a node pool between its
//! configured minimum and maximum. Scaling decisions are expressed as an
//! explicit state machine rather than ad hoc counters:
//!
//! - `Fixed` - min == max; scaling is disabled and the state never changes
//! - `Idle` - supply matches demand, nothing to do
//! - `ScalingUp` - demand pressure observed; pre-establish one connection
//! - `ScalingDown` - sustained idle surplus; prune one idle connection
//!
//! A background task samples pool status every `scale_interval`. Scale-down
//! requires `scale_down_after` consecutive surplus samples and only prunes
//! connections idle longer than `idle_timeout`, so a brief lull never tears
//! down warm capacity. Both directions move one connection per sample, which
//! lets the pool converge without oscillating.

use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use deadpool::managed::{self, Timeouts};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::constants::pool::MAINTENANCE_POOL_TIMEOUT_MS;
use crate::pool::manager::KvTcpManager;

type Pool = managed::Pool<KvTcpManager>;

/// Scaling states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ScalerState {
    /// min == max; adaptive scaling is disabled
    Fixed = 0,
    /// Supply matches demand
    Idle = 1,
    /// Demand pressure; the pool is growing toward max
    ScalingUp = 2,
    /// Sustained surplus; the pool is shrinking toward min
    ScalingDown = 3,
}

impl ScalerState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Fixed,
            1 => Self::Idle,
            2 => Self::ScalingUp,
            _ => Self::ScalingDown,
        }
    }
}

impl std::fmt::Display for ScalerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fixed => "fixed",
            Self::Idle => "idle",
            Self::ScalingUp => "scaling-up",
            Self::ScalingDown => "scaling-down",
        };
        f.write_str(name)
    }
}

/// Pool scaling state machine
///
/// `decide` is a pure transition on one status sample; the background task
/// applies the corresponding action to the pool.
#[derive(Debug)]
pub struct PoolScaler {
    state: AtomicU8,
    min: usize,
    max: usize,
    idle_timeout: Duration,
    scale_down_after: u32,
    idle_streak: AtomicU32,
    scale_ups: AtomicU64,
    scale_downs: AtomicU64,
}

impl PoolScaler {
    /// Create a scaler for a pool bounded by `[min, max]`
    #[must_use]
    pub fn new(min: usize, max: usize, idle_timeout: Duration, scale_down_after: u32) -> Self {
        let initial = if min == max {
            ScalerState::Fixed
        } else {
            ScalerState::Idle
        };
        Self {
            state: AtomicU8::new(initial as u8),
            min,
            max,
            idle_timeout,
            scale_down_after,
            idle_streak: AtomicU32::new(0),
            scale_ups: AtomicU64::new(0),
            scale_downs: AtomicU64::new(0),
        }
    }

    /// Current state of the machine
    #[must_use]
    pub fn state(&self) -> ScalerState {
        ScalerState::from_u8(self.state.load(Ordering::Relaxed))
    }

    /// Number of scale-up corrections applied so far
    #[must_use]
    pub fn scale_ups(&self) -> u64 {
        self.scale_ups.load(Ordering::Relaxed)
    }

    /// Number of scale-down corrections applied so far
    #[must_use]
    pub fn scale_downs(&self) -> u64 {
        self.scale_downs.load(Ordering::Relaxed)
    }

    /// The configured lower bound
    #[must_use]
    #[inline]
    pub fn min(&self) -> usize {
        self.min
    }

    /// The configured upper bound
    #[must_use]
    #[inline]
    pub fn max(&self) -> usize {
        self.max
    }

    /// Evaluate one status sample and transition the state machine
    ///
    /// * `live` - connections currently open (idle + leased)
    /// * `idle` - connections sitting in the pool
    /// * `waiting` - callers queued for a lease
    pub fn decide(&self, live: usize, idle: usize, waiting: usize) -> ScalerState {
        if self.state() == ScalerState::Fixed {
            return ScalerState::Fixed;
        }

        let next = if live < self.max && (waiting > 0 || idle == 0) {
            // Demand pressure: every connection is leased (or callers are
            // queued) and there is headroom to grow
            self.idle_streak.store(0, Ordering::Relaxed);
            ScalerState::ScalingUp
        } else if live > self.min && idle > 0 {
            // Surplus capacity; require it to persist before shrinking
            let streak = self.idle_streak.fetch_add(1, Ordering::Relaxed) + 1;
            if streak >= self.scale_down_after {
                ScalerState::ScalingDown
            } else {
                ScalerState::Idle
            }
        } else {
            self.idle_streak.store(0, Ordering::Relaxed);
            ScalerState::Idle
        };

        let previous = ScalerState::from_u8(self.state.swap(next as u8, Ordering::Relaxed));
        if previous != next {
            debug!(from = %previous, to = %next, live, idle, waiting, "Scaler transition");
        }
        next
    }

    /// Record that a scale-down correction completed and reset the streak
    fn settle_after_scale_down(&self) {
        self.idle_streak.store(0, Ordering::Relaxed);
        self.scale_downs.fetch_add(1, Ordering::Relaxed);
    }

    /// Run the scaling loop until a shutdown signal arrives
    ///
    /// Spawned once per non-fixed pool. Each tick samples the pool status,
    /// runs `decide`, and applies at most one corrective action.
    pub async fn run(
        self: std::sync::Arc<Self>,
        pool: Pool,
        name: String,
        interval: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        info!(
            pool = %name,
            min = self.min,
            max = self.max,
            interval_secs = interval.as_secs(),
            "Starting adaptive pool scaler"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    // Time to sample the pool
                }
                _ = shutdown_rx.recv() => {
                    info!(pool = %name, "Shutting down pool scaler");
                    break;
                }
            }

            let status = pool.status();
            match self.decide(status.size, status.available, status.waiting) {
                ScalerState::ScalingUp => {
                    self.scale_up(&pool, &name).await;
                }
                ScalerState::ScalingDown => {
                    self.scale_down(&pool, &name);
                }
                ScalerState::Idle | ScalerState::Fixed => {}
            }
        }

        info!(pool = %name, "Pool scaler terminated");
    }

    /// Pre-establish one connection ahead of demand
    async fn scale_up(&self, pool: &Pool, name: &str) {
        let mut timeouts = Timeouts::new();
        timeouts.wait = Some(Duration::from_millis(MAINTENANCE_POOL_TIMEOUT_MS));

        // Leasing and immediately releasing forces creation when nothing is
        // idle, and is a no-op when demand drained in the meantime
        match pool.timeout_get(&timeouts).await {
            Ok(conn) => {
                drop(conn);
                self.scale_ups.fetch_add(1, Ordering::Relaxed);
                debug!(pool = %name, live = pool.status().size, "Scaled up one connection");
            }
            Err(e) => {
                warn!(pool = %name, error = %e, "Scale-up connection attempt failed");
            }
        }
    }

    /// Prune at most one connection that has idled past the timeout
    fn scale_down(&self, pool: &Pool, name: &str) {
        let status = pool.status();
        if status.size <= self.min {
            return;
        }

        let pruned = std::sync::atomic::AtomicBool::new(false);
        let idle_timeout = self.idle_timeout;
        pool.retain(|_, metrics| {
            if pruned.load(Ordering::Relaxed) {
                return true;
            }
            if metrics.last_used() >= idle_timeout {
                pruned.store(true, Ordering::Relaxed);
                return false;
            }
            true
        });

        if pruned.load(Ordering::Relaxed) {
            self.settle_after_scale_down();
            debug!(pool = %name, live = pool.status().size, "Scaled down one connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_when_bounds_equal() {
        let scaler = PoolScaler::new(3, 3, Duration::from_secs(60), 5);
        assert_eq!(scaler.state(), ScalerState::Fixed);

        // Fixed pools never leave the Fixed state, whatever the sample says
        assert_eq!(scaler.decide(3, 0, 10), ScalerState::Fixed);
        assert_eq!(scaler.decide(3, 3, 0), ScalerState::Fixed);
        assert_eq!(scaler.state(), ScalerState::Fixed);
    }

    #[test]
    fn test_starts_idle_when_scaling_enabled() {
        let scaler = PoolScaler::new(2, 5, Duration::from_secs(60), 5);
        assert_eq!(scaler.state(), ScalerState::Idle);
    }

    #[test]
    fn test_waiters_trigger_scale_up() {
        let scaler = PoolScaler::new(2, 5, Duration::from_secs(60), 5);
        assert_eq!(scaler.decide(2, 0, 3), ScalerState::ScalingUp);
        assert_eq!(scaler.state(), ScalerState::ScalingUp);
    }

    #[test]
    fn test_zero_idle_below_max_triggers_scale_up() {
        let scaler = PoolScaler::new(2, 5, Duration::from_secs(60), 5);
        // All live connections are leased but there is headroom
        assert_eq!(scaler.decide(3, 0, 0), ScalerState::ScalingUp);
    }

    #[test]
    fn test_at_max_does_not_scale_up() {
        let scaler = PoolScaler::new(2, 5, Duration::from_secs(60), 5);
        // Demand exists but the pool is at its ceiling; callers queue
        assert_eq!(scaler.decide(5, 0, 10), ScalerState::Idle);
    }

    #[test]
    fn test_scale_down_requires_sustained_surplus() {
        let scaler = PoolScaler::new(2, 5, Duration::from_secs(60), 3);

        // Two surplus samples are not enough
        assert_eq!(scaler.decide(4, 2, 0), ScalerState::Idle);
        assert_eq!(scaler.decide(4, 2, 0), ScalerState::Idle);
        // Third consecutive sample crosses the threshold
        assert_eq!(scaler.decide(4, 2, 0), ScalerState::ScalingDown);
    }

    #[test]
    fn test_demand_resets_idle_streak() {
        let scaler = PoolScaler::new(2, 5, Duration::from_secs(60), 2);

        assert_eq!(scaler.decide(4, 2, 0), ScalerState::Idle);
        // Demand pressure interrupts the surplus streak
        assert_eq!(scaler.decide(4, 0, 1), ScalerState::ScalingUp);
        // The streak starts over
        assert_eq!(scaler.decide(4, 2, 0), ScalerState::Idle);
        assert_eq!(scaler.decide(4, 2, 0), ScalerState::ScalingDown);
    }

    #[test]
    fn test_never_scales_below_min() {
        let scaler = PoolScaler::new(2, 5, Duration::from_secs(60), 1);

        // Surplus exists but live == min, so the pool must not shrink
        assert_eq!(scaler.decide(2, 2, 0), ScalerState::Idle);
        assert_eq!(scaler.decide(2, 2, 0), ScalerState::Idle);
    }

    #[test]
    fn test_balanced_pool_stays_idle() {
        let scaler = PoolScaler::new(2, 5, Duration::from_secs(60), 5);
        // Some leased, some idle, no waiters, above min: surplus streak grows
        // but a demand-free balanced sample with idle == 0 resets below
        assert_eq!(scaler.decide(5, 0, 0), ScalerState::Idle);
        assert_eq!(scaler.state(), ScalerState::Idle);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(ScalerState::Fixed.to_string(), "fixed");
        assert_eq!(ScalerState::Idle.to_string(), "idle");
        assert_eq!(ScalerState::ScalingUp.to_string(), "scaling-up");
        assert_eq!(ScalerState::ScalingDown.to_string(), "scaling-down");
    }
}
