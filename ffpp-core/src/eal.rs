//! Environment Manager
//!
//! Brings the native execution environment (cores, huge-page memory,
//! attached devices) up and down. The environment is a process singleton:
//! [`Environment::init`] claims it, and the returned value is the only way to
//! create pools. Pools borrow the environment, so it cannot be cleaned up
//! while any of them is alive.
//!
//! ```rust,no_run
//! use ffpp_core::{Environment, SocketSelector, DEFAULT_BUF_SIZE};
//!
//! # fn main() -> ffpp_core::Result<()> {
//! let env = Environment::init(["-l", "0", "-m", "5", "--no-pci"])?;
//! let pool = env.create_pool("rx", 4096, 256, 0, DEFAULT_BUF_SIZE, SocketSelector::Any)?;
//! pool.free();
//! env.cleanup();
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::ffi::CString;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::{EalConfig, DEFAULT_PROGRAM_NAME};
use crate::error::{Error, NativeError, Result, Violation};
use crate::ffi;
use crate::stats::PoolMetrics;

const UNINIT: u8 = 0;
const INITIALIZING: u8 = 1;
const INITIALIZED: u8 = 2;
const CLEANED: u8 = 3;

static STATE: AtomicU8 = AtomicU8::new(UNINIT);
static READY: OnceLock<watch::Sender<bool>> = OnceLock::new();

/// Process-wide lifecycle of the native environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvState {
    /// Never initialized, or an initialization is still in progress.
    Uninitialized,
    Initialized,
    /// Torn down. A new [`Environment::init`] is allowed.
    Cleaned,
}

impl fmt::Display for EnvState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Cleaned => "cleaned",
        };
        f.write_str(text)
    }
}

/// Current state of the process environment.
pub fn state() -> EnvState {
    match STATE.load(Ordering::SeqCst) {
        INITIALIZED => EnvState::Initialized,
        CLEANED => EnvState::Cleaned,
        _ => EnvState::Uninitialized,
    }
}

fn ready_sender() -> &'static watch::Sender<bool> {
    READY.get_or_init(|| watch::channel(false).0)
}

/// Subscribe to environment readiness.
///
/// The value is `true` between a successful init and the matching cleanup.
/// Observers outside this crate (a control plane, a health endpoint) should
/// use this rather than polling [`state`].
pub fn ready_signal() -> watch::Receiver<bool> {
    ready_sender().subscribe()
}

/// Exclusive right to run the native initializer.
///
/// Dropping the claim without [`InitClaim::commit`] restores the previous
/// state, whether bring-up returned an error or panicked.
struct InitClaim {
    previous: u8,
    committed: bool,
}

impl InitClaim {
    fn acquire() -> std::result::Result<Self, Violation> {
        let previous = STATE
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| match current {
                UNINIT | CLEANED => Some(INITIALIZING),
                _ => None,
            })
            .map_err(|_| {
                warn!("Environment initialization requested while one is live");
                Violation::AlreadyInitialized
            })?;
        Ok(Self {
            previous,
            committed: false,
        })
    }

    fn commit(mut self) {
        STATE.store(INITIALIZED, Ordering::SeqCst);
        self.committed = true;
    }
}

impl Drop for InitClaim {
    fn drop(&mut self) {
        if !self.committed {
            STATE.store(self.previous, Ordering::SeqCst);
        }
    }
}

/// A live native environment.
///
/// Owns the marshalled argument strings for its whole life, since the native
/// parser may keep pointers into them.
pub struct Environment {
    program: String,
    args: Vec<String>,
    _argv: Vec<CString>,
    consumed: usize,
    /// Names of live pools. Also the lock held around every native call
    /// that can fail, so the error slot is read before anyone else writes it.
    registry: Mutex<BTreeSet<String>>,
    metrics: Arc<PoolMetrics>,
    cleaned: bool,
}

impl Environment {
    /// Initialize the environment with the default program name.
    pub fn init<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::init_named(DEFAULT_PROGRAM_NAME, args)
    }

    /// Initialize the environment from a typed configuration.
    pub fn from_config(config: &EalConfig) -> Result<Self> {
        Self::init_named(&config.program_name, config.to_args())
    }

    /// Initialize the environment, passing `program` as `argv[0]`.
    ///
    /// Fails with [`Violation::AlreadyInitialized`] if another environment
    /// is live, and with [`Error::EnvironmentInit`] if the native
    /// initializer rejects the arguments.
    pub fn init_named<I, S>(program: &str, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();

        let claim = InitClaim::acquire()?;
        let env = Self::bring_up(program, args)?;
        claim.commit();
        ready_sender().send_replace(true);
        Ok(env)
    }

    fn bring_up(program: &str, args: Vec<String>) -> Result<Self> {
        info!(backend = ffi::BACKEND, program, args = ?args, "Initializing environment");

        let argv = std::iter::once(program)
            .chain(args.iter().map(String::as_str))
            .map(CString::new)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                error!(error = %e, "Environment argument contains a NUL byte");
                Error::EnvironmentInit(NativeError::from_code(libc::EINVAL))
            })?;

        // The INITIALIZING claim keeps every other native caller out, so the
        // error slot still holds this call's code when it is read.
        let ret = ffi::eal_init(&argv);
        if ret < 0 {
            let err = NativeError::current();
            error!(error = %err, "Environment initialization failed");
            return Err(Error::EnvironmentInit(err));
        }

        let env = Self {
            program: program.to_string(),
            args,
            _argv: argv,
            consumed: ret as usize,
            registry: Mutex::new(BTreeSet::new()),
            metrics: PoolMetrics::new(),
            cleaned: false,
        };
        info!(
            consumed = env.consumed,
            lcores = env.lcore_count(),
            sockets = env.socket_count(),
            ports = env.port_count(),
            "Environment initialized"
        );
        Ok(env)
    }

    /// Tear the environment down.
    ///
    /// Pools must have been freed first, which the borrow checker enforces.
    /// A failing native cleanup is logged and otherwise ignored.
    ///
    /// Cleaning up while a pool is alive does not compile:
    ///
    /// ```compile_fail
    /// use ffpp_core::{Environment, SocketSelector};
    ///
    /// let env = Environment::init(["-l", "0"]).unwrap();
    /// let pool = env.create_default_pool("rx", 1024, SocketSelector::Any).unwrap();
    /// env.cleanup();
    /// pool.free();
    /// ```
    ///
    /// Neither does creating a pool after cleanup:
    ///
    /// ```compile_fail
    /// use ffpp_core::{Environment, SocketSelector};
    ///
    /// let env = Environment::init(["-l", "0"]).unwrap();
    /// env.cleanup();
    /// let _pool = env.create_default_pool("rx", 1024, SocketSelector::Any);
    /// ```
    pub fn cleanup(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;

        let registry = self.lock_registry();
        if !registry.is_empty() {
            // Only reachable when a pool handle was leaked with mem::forget.
            warn!(leaked = registry.len(), "Cleaning up with leaked mempools");
        }
        let ret = ffi::eal_cleanup();
        if ret < 0 {
            warn!(error = %NativeError::current(), "Environment cleanup reported a failure");
        }
        drop(registry);

        STATE.store(CLEANED, Ordering::SeqCst);
        ready_sender().send_replace(false);
        info!(metrics = ?self.metrics.snapshot(), "Environment cleaned up");
    }

    /// `argv[0]` passed to the native initializer.
    pub fn program_name(&self) -> &str {
        &self.program
    }

    /// Initialization arguments, program name excluded.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Number of arguments the native parser consumed, program name
    /// excluded.
    pub fn consumed_args(&self) -> usize {
        self.consumed
    }

    pub fn lcore_count(&self) -> u32 {
        ffi::lcore_count()
    }

    pub fn socket_count(&self) -> u32 {
        ffi::socket_count()
    }

    /// Ethernet devices attached and available.
    pub fn port_count(&self) -> u16 {
        ffi::eth_dev_count_avail()
    }

    /// Names of the live pools, sorted.
    pub fn live_pools(&self) -> Vec<String> {
        self.lock_registry().iter().cloned().collect()
    }

    pub fn pool_exists(&self, name: &str) -> bool {
        self.lock_registry().contains(name)
    }

    pub fn metrics(&self) -> &Arc<PoolMetrics> {
        &self.metrics
    }

    /// Which native backend this build links: `"dpdk"` or `"soft"`.
    pub fn backend(&self) -> &'static str {
        ffi::BACKEND
    }

    pub(crate) fn lock_registry(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        if !self.cleaned {
            debug!("Environment dropped without cleanup");
            self.teardown();
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("consumed", &self.consumed)
            .field("live_pools", &*self.lock_registry())
            .field("backend", &ffi::BACKEND)
            .finish()
    }
}
