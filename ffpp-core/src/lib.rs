//! FFPP Core - Environment and Packet-Buffer Pools
//!
//! The resource layer of a userspace, zero-copy packet-processing runtime.
//! It brings the native execution environment (a DPDK-style EAL) up and down,
//! manages named pools of packet buffers carved from environment memory, and
//! turns native error codes into descriptive errors.
//!
//! # Lifecycle
//! - [`Environment::init`] claims the process-wide environment
//! - [`Environment::create_pool`] hands out [`Mempool`] handles that borrow it
//! - pools are freed (explicitly or on drop) before [`Environment::cleanup`]
//!
//! Builds link a system DPDK when the `dpdk` feature is on and libdpdk is
//! installed; otherwise a software EAL with the same contract is used.

pub mod config;
pub mod eal;
pub mod error;
pub mod ffi;
pub mod mempool;
pub mod stats;

pub use config::{AppConfig, EalConfig, MempoolConfig, SocketSelector};
pub use eal::{ready_signal, state, EnvState, Environment};
pub use error::{Error, NativeError, Result, Violation};
pub use mempool::{
    validate_params, Mempool, DEFAULT_BUF_SIZE, DEFAULT_CACHE_SIZE, MAX_CACHE_SIZE,
    MEMPOOL_NAMESIZE, PRIV_SIZE_ALIGN,
};
pub use stats::{MetricsSnapshot, PoolMetrics};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Calling this more
/// than once, or after another subscriber was installed, is a no-op.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
