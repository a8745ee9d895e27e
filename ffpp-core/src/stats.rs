//! Pool lifecycle metrics
//!
//! Lock-free counters updated on every create and free, so a long-running
//! process can report how many pools it has churned through and how much
//! native memory is currently reserved.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Counters for one environment's pool activity
#[derive(Debug, Default)]
pub struct PoolMetrics {
    pub pools_created: AtomicU64,
    pub pool_create_time_ns: AtomicU64,
    pub pools_freed: AtomicU64,
    pub pool_free_time_ns: AtomicU64,
    pub creation_failures: AtomicU64,
    /// Bytes held by live pools.
    pub bytes_reserved: AtomicU64,
}

impl PoolMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record a successful pool creation and the memory it reserved
    pub fn record_create(&self, duration: Duration, footprint: u64) {
        self.pools_created.fetch_add(1, Ordering::Relaxed);
        self.pool_create_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
        self.bytes_reserved.fetch_add(footprint, Ordering::Relaxed);
    }

    /// Record a pool release
    pub fn record_free(&self, duration: Duration, footprint: u64) {
        self.pools_freed.fetch_add(1, Ordering::Relaxed);
        self.pool_free_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
        // Saturate: reset() may have zeroed the gauge while pools were live.
        let _ = self
            .bytes_reserved
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |held| {
                Some(held.saturating_sub(footprint))
            });
    }

    pub fn record_failure(&self) {
        self.creation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Pools created and not yet freed.
    pub fn live_pools(&self) -> u64 {
        let created = self.pools_created.load(Ordering::Relaxed);
        let freed = self.pools_freed.load(Ordering::Relaxed);
        created.saturating_sub(freed)
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pools_created: self.pools_created.load(Ordering::Relaxed),
            avg_create_us: avg_duration_us(&self.pools_created, &self.pool_create_time_ns),
            pools_freed: self.pools_freed.load(Ordering::Relaxed),
            avg_free_us: avg_duration_us(&self.pools_freed, &self.pool_free_time_ns),
            creation_failures: self.creation_failures.load(Ordering::Relaxed),
            live_pools: self.live_pools(),
            bytes_reserved: self.bytes_reserved.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.pools_created.store(0, Ordering::Relaxed);
        self.pool_create_time_ns.store(0, Ordering::Relaxed);
        self.pools_freed.store(0, Ordering::Relaxed);
        self.pool_free_time_ns.store(0, Ordering::Relaxed);
        self.creation_failures.store(0, Ordering::Relaxed);
        self.bytes_reserved.store(0, Ordering::Relaxed);
    }
}

fn avg_duration_us(count: &AtomicU64, total_ns: &AtomicU64) -> f64 {
    let c = count.load(Ordering::Relaxed);
    if c == 0 {
        return 0.0;
    }
    let total = total_ns.load(Ordering::Relaxed);
    (total as f64) / (c as f64) / 1_000.0
}

/// A point-in-time copy of [`PoolMetrics`]
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub pools_created: u64,
    pub avg_create_us: f64,
    pub pools_freed: u64,
    pub avg_free_us: f64,
    pub creation_failures: u64,
    pub live_pools: u64,
    pub bytes_reserved: u64,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mempool metrics")?;
        writeln!(
            f,
            "  created:  {:>8} (avg: {:>10.3} us)",
            self.pools_created, self.avg_create_us
        )?;
        writeln!(
            f,
            "  freed:    {:>8} (avg: {:>10.3} us)",
            self.pools_freed, self.avg_free_us
        )?;
        writeln!(f, "  failed:   {:>8}", self.creation_failures)?;
        write!(
            f,
            "  live:     {:>8} ({:.2} MiB reserved)",
            self.live_pools,
            self.bytes_reserved as f64 / (1024.0 * 1024.0)
        )
    }
}

/// Records elapsed time into [`PoolMetrics`] when dropped
pub struct ScopedTimer<'a> {
    start: Instant,
    metrics: &'a PoolMetrics,
    timer_type: TimerType,
    footprint: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerType {
    PoolCreate,
    PoolFree,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(metrics: &'a PoolMetrics, timer_type: TimerType, footprint: u64) -> Self {
        Self {
            start: Instant::now(),
            metrics,
            timer_type,
            footprint,
        }
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        match self.timer_type {
            TimerType::PoolCreate => self.metrics.record_create(duration, self.footprint),
            TimerType::PoolFree => self.metrics.record_free(duration, self.footprint),
        }
    }
}
