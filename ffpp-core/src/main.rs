//! ffpp - bring up the packet-processing environment and its buffer pools
//!
//! Initializes the environment, creates the configured pools, reports on
//! them and tears everything down again. Useful as a smoke test on a new
//! host before running the data plane.

use anyhow::{Context, Result};
use ffpp_core::{init_logging, AppConfig, Environment};
use tracing::{info, warn};

fn print_help() {
    println!("ffpp - packet buffer pool bring-up v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("USAGE:");
    println!("  ffpp [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help            Print this help message");
    println!("  -v, --version         Print version information");
    println!("  -c, --config <FILE>   Load environment and pools from a JSON file");
    println!("      --hold            Keep pools alive until Ctrl-C");
    println!();
    println!("Without --config, a single-core environment with two null ports");
    println!("and one pool named 'test' is used. Set RUST_LOG to adjust logging.");
}

fn usage_error(message: &str) -> ! {
    eprintln!("error: {}", message);
    eprintln!("Run 'ffpp --help' for usage information.");
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut hold = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            "-v" | "--version" => {
                println!("ffpp {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "-c" | "--config" => match iter.next() {
                Some(path) => config_path = Some(path.clone()),
                None => usage_error("--config requires a file argument"),
            },
            "--hold" => hold = true,
            other => usage_error(&format!("unrecognized argument '{}'", other)),
        }
    }

    init_logging();

    let config = match &config_path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    let env = Environment::from_config(&config.eal).context("Failed to initialize environment")?;
    info!(
        backend = env.backend(),
        lcores = env.lcore_count(),
        sockets = env.socket_count(),
        ports = env.port_count(),
        "Environment ready"
    );

    let mut pools = Vec::with_capacity(config.pools.len());
    for pool_config in &config.pools {
        let pool = env
            .create_pool_with(pool_config)
            .with_context(|| format!("Failed to create pool '{}'", pool_config.name))?;
        info!(
            name = pool.name(),
            buffers = pool.size(),
            available = pool.avail_count(),
            elt_size = pool.elt_size(),
            "Pool ready"
        );
        pools.push(pool);
    }

    if hold {
        info!("Holding {} pool(s); press Ctrl-C to tear down", pools.len());
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl-C, tearing down now");
        }
    }

    for pool in pools {
        pool.free();
    }
    println!("{}", env.metrics().snapshot());
    env.cleanup();

    Ok(())
}
