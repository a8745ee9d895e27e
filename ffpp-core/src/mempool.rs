//! Buffer Pool Manager
//!
//! Named, fixed-capacity pools of packet buffers carved out of environment
//! memory. A [`Mempool`] is a move-only handle: it frees the native pool
//! exactly once, either through [`Mempool::free`] or when dropped.
//!
//! Parameters are checked here before any native allocation, so the common
//! mistakes (oversized cache, duplicate name, unaligned private area) fail
//! cheaply and with a precise code.

use std::ffi::CString;
use std::fmt;
use std::os::raw::c_int;
use std::ptr::NonNull;
use std::time::Instant;

use tracing::{debug, error, info};

use crate::config::{MempoolConfig, SocketSelector};
use crate::eal::Environment;
use crate::error::{Error, NativeError, Result};
use crate::ffi::{self, RteMempool};
use crate::stats::{ScopedTimer, TimerType};

/// Largest per-lcore cache a pool may have.
pub const MAX_CACHE_SIZE: u32 = ffi::RTE_MEMPOOL_CACHE_MAX_SIZE;

/// Default data room: a standard Ethernet frame plus headroom.
pub const DEFAULT_BUF_SIZE: u16 = ffi::RTE_MBUF_DEFAULT_BUF_SIZE;

/// Pool name buffer size; names must be strictly shorter.
pub const MEMPOOL_NAMESIZE: usize = ffi::RTE_MEMPOOL_NAMESIZE;

/// The private area must be a multiple of this.
pub const PRIV_SIZE_ALIGN: u16 = ffi::RTE_MBUF_PRIV_ALIGN;

/// Cache size used by [`Environment::create_default_pool`].
pub const DEFAULT_CACHE_SIZE: u32 = 256;

/// Check pool parameters without touching the environment.
///
/// Returns the errno the native constructor would report. Name uniqueness is
/// not checked here since it depends on the live registry.
pub fn validate_params(
    name: &str,
    count: u32,
    cache_size: u32,
    priv_size: u16,
    data_room_size: u16,
) -> std::result::Result<(), c_int> {
    if name.is_empty() || name.contains('\0') {
        return Err(libc::EINVAL);
    }
    if name.len() >= MEMPOOL_NAMESIZE {
        return Err(libc::ENAMETOOLONG);
    }
    if count == 0 || data_room_size == 0 {
        return Err(libc::EINVAL);
    }
    if cache_size > MAX_CACHE_SIZE {
        return Err(libc::EINVAL);
    }
    if priv_size % PRIV_SIZE_ALIGN != 0 {
        return Err(libc::EINVAL);
    }
    Ok(())
}

impl Environment {
    /// Create a packet-buffer pool.
    ///
    /// `count` buffers of `data_room_size` bytes each (headroom included),
    /// with `priv_size` application bytes per buffer and a per-lcore cache
    /// of `cache_size` buffers, placed on `socket`.
    ///
    /// Failure leaves every existing pool untouched.
    pub fn create_pool(
        &self,
        name: &str,
        count: u32,
        cache_size: u32,
        priv_size: u16,
        data_room_size: u16,
        socket: SocketSelector,
    ) -> Result<Mempool<'_>> {
        debug!(
            name,
            count, cache_size, priv_size, data_room_size, %socket, "Creating mempool"
        );

        if let Err(code) = validate_params(name, count, cache_size, priv_size, data_room_size) {
            return Err(self.reject(name, NativeError::from_code(code)));
        }
        let c_name =
            CString::new(name).map_err(|_| self.reject(name, NativeError::from_code(libc::EINVAL)))?;

        let start = Instant::now();
        let mut registry = self.lock_registry();
        if registry.contains(name) {
            drop(registry);
            return Err(self.reject(name, NativeError::from_code(libc::EEXIST)));
        }

        let created = ffi::pktmbuf_pool_create(
            &c_name,
            count,
            cache_size,
            priv_size,
            data_room_size,
            socket.as_raw(),
        );
        let raw = match created {
            Some(raw) => raw,
            None => {
                // Read under the lock, before any other native call can run.
                let err = NativeError::current();
                drop(registry);
                return Err(self.reject(name, err));
            }
        };
        registry.insert(name.to_string());
        drop(registry);

        let pool = Mempool {
            env: self,
            raw,
            name: name.to_string(),
            size: count,
            cache_size,
            priv_size,
            data_room_size,
            socket,
            elt_size: unsafe { ffi::mempool_elt_size(raw) },
        };
        self.metrics().record_create(start.elapsed(), pool.footprint());
        info!(
            name,
            count,
            elt_size = pool.elt_size,
            footprint = pool.footprint(),
            %socket,
            "Mempool created"
        );
        Ok(pool)
    }

    /// Create a pool from a typed configuration.
    pub fn create_pool_with(&self, config: &MempoolConfig) -> Result<Mempool<'_>> {
        self.create_pool(
            &config.name,
            config.count,
            config.cache_size,
            config.priv_size,
            config.data_room_size,
            config.socket,
        )
    }

    /// Create a pool with the default cache, no private area and
    /// [`DEFAULT_BUF_SIZE`] data room.
    pub fn create_default_pool(
        &self,
        name: &str,
        count: u32,
        socket: SocketSelector,
    ) -> Result<Mempool<'_>> {
        self.create_pool(name, count, DEFAULT_CACHE_SIZE, 0, DEFAULT_BUF_SIZE, socket)
    }

    fn reject(&self, name: &str, source: NativeError) -> Error {
        self.metrics().record_failure();
        error!(name, error = %source, "Cannot create mempool");
        Error::pool(name, source)
    }
}

/// A live packet-buffer pool.
///
/// Freeing consumes the handle, so a freed pool cannot be touched again:
///
/// ```compile_fail
/// use ffpp_core::{Environment, SocketSelector};
///
/// let env = Environment::init(["-l", "0"]).unwrap();
/// let pool = env.create_default_pool("rx", 1024, SocketSelector::Any).unwrap();
/// pool.free();
/// let _ = pool.avail_count();
/// ```
///
/// Pools only come from a live [`Environment`]; there is no constructor that
/// works without one:
///
/// ```compile_fail
/// use ffpp_core::Mempool;
///
/// let _pool = Mempool::new("rx", 1024);
/// ```
pub struct Mempool<'env> {
    env: &'env Environment,
    raw: NonNull<RteMempool>,
    name: String,
    size: u32,
    cache_size: u32,
    priv_size: u16,
    data_room_size: u16,
    socket: SocketSelector,
    elt_size: u32,
}

// SAFETY: native pools are safe to query from any thread, and the only
// mutating call (free) runs under the environment's registry lock.
unsafe impl Send for Mempool<'_> {}
unsafe impl Sync for Mempool<'_> {}

impl<'env> Mempool<'env> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of buffers.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn cache_size(&self) -> u32 {
        self.cache_size
    }

    pub fn priv_size(&self) -> u16 {
        self.priv_size
    }

    pub fn data_room_size(&self) -> u16 {
        self.data_room_size
    }

    /// Socket requested at creation.
    pub fn socket(&self) -> SocketSelector {
        self.socket
    }

    /// Bytes one buffer occupies in the pool, headers included.
    pub fn elt_size(&self) -> u32 {
        self.elt_size
    }

    /// Bytes reserved for the buffers.
    pub fn footprint(&self) -> u64 {
        u64::from(self.elt_size) * u64::from(self.size)
    }

    /// Free buffers, per-lcore caches included.
    pub fn avail_count(&self) -> u32 {
        unsafe { ffi::mempool_avail_count(self.raw) }
    }

    /// Buffers currently handed out.
    pub fn in_use_count(&self) -> u32 {
        unsafe { ffi::mempool_in_use_count(self.raw) }
    }

    pub fn is_full(&self) -> bool {
        self.avail_count() == self.size
    }

    /// The environment this pool lives in.
    pub fn environment(&self) -> &'env Environment {
        self.env
    }

    /// Raw native pointer, for layers that hand pools to native APIs.
    ///
    /// Valid only while `self` is alive.
    pub fn as_ptr(&self) -> *mut RteMempool {
        self.raw.as_ptr()
    }

    /// Release the pool.
    pub fn free(self) {
        debug!(name = %self.name, "Freeing mempool");
        drop(self);
    }
}

impl Drop for Mempool<'_> {
    fn drop(&mut self) {
        let _timer = ScopedTimer::new(self.env.metrics(), TimerType::PoolFree, self.footprint());
        let mut registry = self.env.lock_registry();
        unsafe { ffi::mempool_free(self.raw) };
        registry.remove(&self.name);
        drop(registry);
        info!(name = %self.name, "Mempool freed");
    }
}

impl fmt::Debug for Mempool<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mempool")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("cache_size", &self.cache_size)
            .field("priv_size", &self.priv_size)
            .field("data_room_size", &self.data_room_size)
            .field("socket", &self.socket)
            .field("elt_size", &self.elt_size)
            .finish()
    }
}
