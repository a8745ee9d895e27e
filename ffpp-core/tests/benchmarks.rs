//! Performance benchmarks for FFPP Core.
//!
//! These tests measure timing for pool and environment operations and check
//! that they stay within generous bounds. Run with:
//!
//! ```sh
//! cargo test -p ffpp-core --test benchmarks -- --ignored --nocapture
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use ffpp_core::{validate_params, EalConfig, Environment, MempoolConfig, PoolMetrics, SocketSelector};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

fn report(label: &str, iterations: usize, elapsed: Duration) -> f64 {
    let per_op_us = elapsed.as_secs_f64() * 1e6 / iterations as f64;
    println!("{label}: {iterations} iterations in {elapsed:?} ({per_op_us:.2} us/op)");
    per_op_us
}

// ---------------------------------------------------------------------------
// Pool lifecycle
// ---------------------------------------------------------------------------

#[test]
#[ignore]
fn bench_pool_create_free() {
    const ITERATIONS: usize = 1000;
    let _guard = env_lock();
    let env = Environment::from_config(&EalConfig::minimal()).unwrap();
    let config = MempoolConfig::new("bench").count(4096);

    let start = Instant::now();
    for _ in 0..ITERATIONS {
        env.create_pool_with(&config).unwrap().free();
    }
    let per_op = report("pool create/free", ITERATIONS, start.elapsed());

    let snapshot = env.metrics().snapshot();
    println!("{snapshot}");
    assert_eq!(snapshot.pools_created, ITERATIONS as u64);
    assert!(per_op < 50_000.0, "pool churn too slow: {per_op:.2} us/op");
    env.cleanup();
}

#[test]
#[ignore]
fn bench_rejected_creation() {
    const ITERATIONS: usize = 100_000;
    let _guard = env_lock();
    let env = Environment::from_config(&EalConfig::minimal()).unwrap();

    let start = Instant::now();
    for _ in 0..ITERATIONS {
        let result = env.create_pool("reject", 4096, 4096, 0, 2176, SocketSelector::Any);
        assert!(result.is_err());
    }
    let per_op = report("rejected creation", ITERATIONS, start.elapsed());

    // Rejections never reach native code, so they must stay cheap.
    assert!(per_op < 100.0, "rejection too slow: {per_op:.2} us/op");
    env.cleanup();
}

// ---------------------------------------------------------------------------
// Environment lifecycle
// ---------------------------------------------------------------------------

#[test]
#[ignore]
fn bench_init_cleanup() {
    const ITERATIONS: usize = 200;
    let _guard = env_lock();
    let config = EalConfig::minimal();

    let start = Instant::now();
    for _ in 0..ITERATIONS {
        Environment::from_config(&config).unwrap().cleanup();
    }
    report("init/cleanup", ITERATIONS, start.elapsed());
}

// ---------------------------------------------------------------------------
// Hot-path helpers
// ---------------------------------------------------------------------------

#[test]
#[ignore]
fn bench_validate_params() {
    const ITERATIONS: usize = 1_000_000;

    let start = Instant::now();
    for i in 0..ITERATIONS {
        let count = (i as u32 % 8192) + 1;
        let _ = std::hint::black_box(validate_params("bench", count, 256, 0, 2176));
    }
    let per_op = report("validate_params", ITERATIONS, start.elapsed());
    assert!(per_op < 1.0, "validation too slow: {per_op:.4} us/op");
}

#[test]
#[ignore]
fn bench_metrics_recording() {
    const ITERATIONS: usize = 1_000_000;
    let metrics = PoolMetrics::new();

    let start = Instant::now();
    for _ in 0..ITERATIONS {
        metrics.record_create(Duration::from_nanos(100), 64);
        metrics.record_free(Duration::from_nanos(100), 64);
    }
    let per_op = report("metrics record", ITERATIONS, start.elapsed());

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.pools_created, ITERATIONS as u64);
    assert_eq!(snapshot.bytes_reserved, 0);
    assert!(per_op < 1.0, "metrics overhead too high: {per_op:.4} us/op");
}
