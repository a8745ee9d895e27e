//! Mempool churn benchmark
//!
//! Measures how fast pools can be created and freed, which bounds how
//! quickly a data plane can reconfigure its buffer layout:
//! - repeated create/free of one pool
//! - many live pools at once
//! - environment init/cleanup cycles
//!
//! Run with `cargo run --release --example pool_churn`.

use std::time::Instant;

use ffpp_core::{EalConfig, Environment, MempoolConfig, SocketSelector};

fn main() -> anyhow::Result<()> {
    ffpp_core::init_logging();

    println!("Mempool churn benchmark");
    println!("=======================\n");

    let env = Environment::from_config(&EalConfig::minimal())?;
    println!("backend: {}\n", env.backend());

    println!("1. Create/free the same pool");
    churn_single_pool(&env)?;
    println!();

    println!("2. Many live pools");
    many_live_pools(&env)?;
    println!();

    println!("{}\n", env.metrics().snapshot());
    env.cleanup();

    println!("3. Environment init/cleanup cycles");
    init_cleanup_cycles()?;

    Ok(())
}

fn churn_single_pool(env: &Environment) -> anyhow::Result<()> {
    const ITERATIONS: usize = 1_000;
    let config = MempoolConfig::new("churn").count(4096);

    let start = Instant::now();
    for _ in 0..ITERATIONS {
        env.create_pool_with(&config)?.free();
    }
    let elapsed = start.elapsed();

    println!("   {} cycles in {:?}", ITERATIONS, elapsed);
    println!("   {:.2} us per cycle", elapsed.as_secs_f64() * 1e6 / ITERATIONS as f64);
    Ok(())
}

fn many_live_pools(env: &Environment) -> anyhow::Result<()> {
    const POOLS: usize = 64;

    let start = Instant::now();
    let pools = (0..POOLS)
        .map(|i| env.create_default_pool(&format!("live_{}", i), 1024, SocketSelector::Any))
        .collect::<Result<Vec<_>, _>>()?;
    let created = start.elapsed();

    let reserved: u64 = pools.iter().map(|pool| pool.footprint()).sum();

    let start = Instant::now();
    drop(pools);
    let freed = start.elapsed();

    println!("   {} pools created in {:?}, freed in {:?}", POOLS, created, freed);
    println!("   {:.2} MiB held at peak", reserved as f64 / (1024.0 * 1024.0));
    Ok(())
}

fn init_cleanup_cycles() -> anyhow::Result<()> {
    const CYCLES: usize = 100;
    let config = EalConfig::minimal();

    let start = Instant::now();
    for _ in 0..CYCLES {
        Environment::from_config(&config)?.cleanup();
    }
    let elapsed = start.elapsed();

    println!("   {} cycles in {:?}", CYCLES, elapsed);
    println!("   {:.2} us per cycle", elapsed.as_secs_f64() * 1e6 / CYCLES as f64);
    Ok(())
}
