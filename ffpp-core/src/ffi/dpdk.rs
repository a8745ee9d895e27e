//! Extern declarations for a system DPDK.
//!
//! Linked by `build.rs` from pkg-config's libdpdk flags. `rte_errno` is a
//! per-lcore variable behind a macro in C, so it is read through the
//! `ffpp_rte_errno` accessor compiled from `csrc/rte_shim.c`.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_uint};

pub const NAME: &str = "dpdk";

/// Opaque `struct rte_mempool`.
#[repr(C)]
pub struct RteMempool {
    _private: [u8; 0],
}

extern "C" {
    pub fn rte_eal_init(argc: c_int, argv: *mut *mut c_char) -> c_int;
    pub fn rte_eal_cleanup() -> c_int;

    pub fn rte_pktmbuf_pool_create(
        name: *const c_char,
        n: c_uint,
        cache_size: c_uint,
        priv_size: u16,
        data_room_size: u16,
        socket_id: c_int,
    ) -> *mut RteMempool;
    pub fn rte_mempool_free(mp: *mut RteMempool);
    pub fn rte_mempool_avail_count(mp: *const RteMempool) -> c_uint;
    pub fn rte_mempool_in_use_count(mp: *const RteMempool) -> c_uint;

    pub fn rte_strerror(errnum: c_int) -> *const c_char;
    pub fn rte_lcore_count() -> c_uint;
    pub fn rte_socket_count() -> c_uint;
    pub fn rte_eth_dev_count_avail() -> u16;

    pub fn ffpp_rte_errno() -> c_int;
    pub fn ffpp_mempool_elt_size(mp: *const RteMempool) -> u32;
}

/// Description from `rte_strerror`, copied out of its static buffer.
pub fn describe(code: c_int) -> String {
    let text = unsafe { rte_strerror(code) };
    if text.is_null() {
        return format!("Unknown error {}", code);
    }
    unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
}
