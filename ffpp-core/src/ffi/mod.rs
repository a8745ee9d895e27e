//! FFI Bridge - Native Environment Abstraction Layer
//!
//! This module exposes the small slice of the DPDK C API the crate needs:
//! EAL bring-up/teardown, packet-mbuf pool construction and release, and the
//! ambient `rte_errno` error slot.
//!
//! Two backends satisfy the same surface:
//! - `dpdk`: extern declarations linked against a system DPDK (plus a C shim
//!   for `rte_errno`, which is a thread-local macro in C). Selected by
//!   `build.rs` when the `dpdk` feature is on and pkg-config finds libdpdk.
//! - `soft`: an in-process software EAL with the same error semantics, used
//!   everywhere else (CI, unit tests, hosts without huge pages).
//!
//! The wrappers here are thin: they marshal arguments, never interpret
//! failures, and leave error translation to [`crate::error`].

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr::NonNull;

#[cfg(dpdk_available)]
mod dpdk;
#[cfg(dpdk_available)]
use dpdk as backend;

#[cfg(not(dpdk_available))]
pub mod soft;
#[cfg(not(dpdk_available))]
use soft as backend;

pub use backend::RteMempool;

/// Name of the backend compiled into this build.
pub const BACKEND: &str = backend::NAME;

/// Generic failure sentinel returned by native calls.
pub const FFI_ERROR: c_int = -1;

/// `SOCKET_ID_ANY`: no NUMA constraint for the reserved zone.
pub const SOCKET_ID_ANY: c_int = -1;

/// Maximum NUMA nodes the environment can address.
pub const RTE_MAX_NUMA_NODES: c_int = 8;

/// Upper bound for a mempool's per-lcore cache.
pub const RTE_MEMPOOL_CACHE_MAX_SIZE: u32 = 512;

/// Size of the mempool name buffer, terminator included.
pub const RTE_MEMPOOL_NAMESIZE: usize = 26;

/// Headroom reserved in front of the packet data of every mbuf.
pub const RTE_PKTMBUF_HEADROOM: u16 = 128;

/// Default data room: 2KB for a standard Ethernet frame plus headroom.
pub const RTE_MBUF_DEFAULT_BUF_SIZE: u16 = 2048 + RTE_PKTMBUF_HEADROOM;

/// Required alignment of the per-mbuf private area.
pub const RTE_MBUF_PRIV_ALIGN: u16 = 8;

/// First error code owned by the environment rather than the C library.
pub const RTE_MIN_ERRNO: c_int = 1000;
/// Operation not allowed in a secondary process.
pub const E_RTE_SECONDARY: c_int = RTE_MIN_ERRNO + 1;
/// Missing rte_config structure (environment not initialized).
pub const E_RTE_NO_CONFIG: c_int = RTE_MIN_ERRNO + 2;

/// Run the native EAL initializer over an already marshalled `argv`.
///
/// `argv[0]` is the program name. Returns the number of consumed arguments,
/// or a negative value on failure with the cause left in the error slot.
///
/// The strings must outlive the environment: the native parser may keep
/// pointers into them.
pub fn eal_init(argv: &[CString]) -> c_int {
    let mut ptrs: Vec<*mut c_char> = argv.iter().map(|s| s.as_ptr() as *mut c_char).collect();
    let argc = ptrs.len() as c_int;
    // The parser may permute the pointer array but never writes the strings.
    unsafe { backend::rte_eal_init(argc, ptrs.as_mut_ptr()) }
}

/// Release every resource the EAL holds (memory, devices, lcores).
pub fn eal_cleanup() -> c_int {
    unsafe { backend::rte_eal_cleanup() }
}

/// Create a packet-mbuf pool. `None` means failure; consult the error slot.
pub fn pktmbuf_pool_create(
    name: &CStr,
    n: u32,
    cache_size: u32,
    priv_size: u16,
    data_room_size: u16,
    socket_id: c_int,
) -> Option<NonNull<RteMempool>> {
    let raw = unsafe {
        backend::rte_pktmbuf_pool_create(
            name.as_ptr(),
            n,
            cache_size,
            priv_size,
            data_room_size,
            socket_id,
        )
    };
    NonNull::new(raw)
}

/// Release a pool and its backing memory.
///
/// # Safety
/// `mp` must come from [`pktmbuf_pool_create`] and must not have been freed.
pub unsafe fn mempool_free(mp: NonNull<RteMempool>) {
    backend::rte_mempool_free(mp.as_ptr());
}

/// Number of free objects in the pool, per-lcore caches included.
///
/// # Safety
/// `mp` must reference a live pool.
pub unsafe fn mempool_avail_count(mp: NonNull<RteMempool>) -> u32 {
    backend::rte_mempool_avail_count(mp.as_ptr())
}

/// Number of objects currently handed out.
///
/// # Safety
/// `mp` must reference a live pool.
pub unsafe fn mempool_in_use_count(mp: NonNull<RteMempool>) -> u32 {
    backend::rte_mempool_in_use_count(mp.as_ptr())
}

/// Total bytes one object occupies in the pool, headers included.
///
/// # Safety
/// `mp` must reference a live pool.
pub unsafe fn mempool_elt_size(mp: NonNull<RteMempool>) -> u32 {
    backend::ffpp_mempool_elt_size(mp.as_ptr())
}

/// Read the ambient error slot.
pub fn errno() -> c_int {
    unsafe { backend::ffpp_rte_errno() }
}

/// Look up the description of an error code in the subsystem string table.
pub fn strerror(code: c_int) -> String {
    backend::describe(code)
}

/// Number of lcores the EAL manages.
pub fn lcore_count() -> u32 {
    unsafe { backend::rte_lcore_count() }
}

/// Number of NUMA sockets detected by the EAL.
pub fn socket_count() -> u32 {
    unsafe { backend::rte_socket_count() }
}

/// Number of ethernet ports attached and available.
pub fn eth_dev_count_avail() -> u16 {
    unsafe { backend::rte_eth_dev_count_avail() }
}

/// Describe a C library errno through `strerror_r`.
#[cfg_attr(dpdk_available, allow(dead_code))]
pub(crate) fn libc_strerror(code: c_int) -> String {
    let mut buf = [0 as c_char; 256];
    let ret = unsafe { libc::strerror_r(code, buf.as_mut_ptr(), buf.len()) };
    if ret != 0 {
        return format!("Unknown error {}", code);
    }
    unsafe { CStr::from_ptr(buf.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}
