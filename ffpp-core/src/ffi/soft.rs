//! Software EAL
//!
//! An in-process stand-in for the DPDK environment with the same calling
//! contract as the C API: functions report failure through a sentinel return
//! value and leave the cause in a single ambient error slot, which, like the
//! contract the crate is written against, is process-global rather than
//! thread-local.
//!
//! What is modelled:
//! - the EAL argument grammar (cores, memory, devices, process type)
//! - per-socket memory capacity, so oversized pools fail with `ENOMEM`
//! - virtual device attachment with driver-prefix matching
//! - the `rte_pktmbuf_pool_create` parameter checks and name registry
//!
//! Pool memory is really allocated (lazily zeroed) so that pool footprints
//! are honest, but no mbuf allocation API exists on top of it.

use std::collections::HashMap;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_uint};
use std::ptr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{
    E_RTE_NO_CONFIG, E_RTE_SECONDARY, FFI_ERROR, RTE_MAX_NUMA_NODES, RTE_MBUF_PRIV_ALIGN,
    RTE_MEMPOOL_CACHE_MAX_SIZE, RTE_MEMPOOL_NAMESIZE, SOCKET_ID_ANY,
};

pub const NAME: &str = "soft";

/// Memory available per socket when `--socket-limit` does not say otherwise.
pub const DEFAULT_SOCKET_CAPACITY_MB: u64 = 1024;

/// Highest lcore id + 1 the EAL accepts.
pub const MAX_LCORE: u32 = 128;

const MB: u64 = 1024 * 1024;
const CACHE_LINE_SIZE: u32 = 64;
/// `sizeof(struct rte_mbuf)`.
const MBUF_HEADER_SIZE: u32 = 128;
/// `sizeof(struct rte_mempool_objhdr)`, cache-line padded.
const MEMPOOL_OBJ_HEADER_SIZE: u32 = 64;

/// Virtual device drivers that can be attached with `--vdev`.
const VDEV_DRIVERS: &[&str] = &[
    "net_null",
    "net_ring",
    "net_tap",
    "net_pcap",
    "net_af_packet",
    "net_af_xdp",
    "net_memif",
    "net_vhost",
    "net_virtio_user",
    "net_bonding",
    "crypto_null",
    "crypto_scheduler",
];

static ERRNO: AtomicI32 = AtomicI32::new(0);
static EAL: Mutex<Option<SoftEal>> = Mutex::new(None);

fn set_errno(code: c_int) {
    ERRNO.store(code, Ordering::SeqCst);
}

fn eal() -> MutexGuard<'static, Option<SoftEal>> {
    EAL.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A software mempool: geometry plus the backing allocation.
#[derive(Debug)]
pub struct RteMempool {
    name: String,
    size: u32,
    elt_size: u32,
    socket: usize,
    footprint: u64,
    _mem: Box<[u8]>,
}

/// Options recognized on the EAL command line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EalArgs {
    pub lcores: Option<Vec<u32>>,
    pub main_lcore: Option<u32>,
    pub channels: Option<u32>,
    pub memory_mb: Option<u64>,
    pub socket_mem: Vec<u64>,
    pub socket_limit: Vec<u64>,
    pub no_pci: bool,
    pub no_huge: bool,
    pub in_memory: bool,
    pub vdevs: Vec<String>,
    pub allow: Vec<String>,
    pub block: Vec<String>,
    pub file_prefix: Option<String>,
    pub proc_type: Option<String>,
    /// Arguments consumed after `argv[0]`, a terminating `--` included.
    pub consumed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arity {
    Flag,
    Value,
}

fn short_option(c: char) -> Option<Arity> {
    match c {
        'l' | 'c' | 'n' | 'm' | 'a' | 'b' | 'd' | 'r' => Some(Arity::Value),
        'v' => Some(Arity::Flag),
        _ => None,
    }
}

fn long_option(name: &str) -> Option<Arity> {
    match name {
        "lcores" | "main-lcore" | "socket-mem" | "socket-limit" | "vdev" | "allow" | "block"
        | "file-prefix" | "proc-type" | "log-level" | "huge-dir" | "iova-mode" => {
            Some(Arity::Value)
        }
        "no-pci" | "no-huge" | "in-memory" | "no-shconf" | "no-telemetry" => Some(Arity::Flag),
        _ => None,
    }
}

/// Parse an lcore list such as `0`, `0-3` or `0,2,4-5`.
///
/// Cores come back sorted and deduplicated. Ids at or above [`MAX_LCORE`]
/// are rejected before any range is expanded.
pub fn parse_core_list(list: &str) -> Result<Vec<u32>, c_int> {
    let mut mask = 0u128;
    for part in list.split(',') {
        let part = part.trim();
        let (lo, hi): (u32, u32) = match part.split_once('-') {
            Some((lo, hi)) => (parse_num(lo)?, parse_num(hi)?),
            None => {
                let core = parse_num(part)?;
                (core, core)
            }
        };
        if lo > hi || hi >= MAX_LCORE {
            return Err(libc::EINVAL);
        }
        for core in lo..=hi {
            mask |= 1u128 << core;
        }
    }
    Ok(mask_to_cores(mask))
}

fn mask_to_cores(mask: u128) -> Vec<u32> {
    (0..MAX_LCORE).filter(|&core| mask & (1u128 << core) != 0).collect()
}

/// Parse a hexadecimal core mask (`0x3`, `f`).
pub fn parse_core_mask(mask: &str) -> Result<Vec<u32>, c_int> {
    let digits = mask
        .strip_prefix("0x")
        .or_else(|| mask.strip_prefix("0X"))
        .unwrap_or(mask);
    let bits = u128::from_str_radix(digits, 16).map_err(|_| libc::EINVAL)?;
    let cores = mask_to_cores(bits);
    if cores.is_empty() {
        return Err(libc::EINVAL);
    }
    Ok(cores)
}

fn parse_num<T: std::str::FromStr>(text: &str) -> Result<T, c_int> {
    text.trim().parse().map_err(|_| libc::EINVAL)
}

/// Megabytes to bytes; `None` when the amount is not addressable.
fn mb_to_bytes(mb: u64) -> Option<u64> {
    mb.checked_mul(MB)
}

fn parse_mb_list(text: &str) -> Result<Vec<u64>, c_int> {
    text.split(',').map(parse_num).collect()
}

/// Parse the EAL command line. `argv[0]` is the program name and is skipped.
///
/// Parsing stops at `--` (which is consumed) or at the first token that is
/// not an option; everything after belongs to the application.
pub fn parse_args(argv: &[String]) -> Result<EalArgs, c_int> {
    let mut parsed = EalArgs::default();
    let mut i = 1;

    while i < argv.len() {
        let token = argv[i].as_str();
        if token == "--" {
            i += 1;
            break;
        }

        let (name, arity, inline) = if let Some(long) = token.strip_prefix("--") {
            let (name, inline) = match long.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (long, None),
            };
            let arity = long_option(name).ok_or(libc::EINVAL)?;
            (name.to_string(), arity, inline)
        } else if let Some(short) = token.strip_prefix('-') {
            let mut chars = short.chars();
            let flag = chars.next().ok_or(libc::EINVAL)?;
            let arity = short_option(flag).ok_or(libc::EINVAL)?;
            let rest: String = chars.collect();
            let inline = if rest.is_empty() { None } else { Some(rest) };
            (flag.to_string(), arity, inline)
        } else {
            break;
        };

        let value = match arity {
            Arity::Flag => {
                if inline.is_some() {
                    return Err(libc::EINVAL);
                }
                None
            }
            Arity::Value => match inline {
                Some(value) => Some(value),
                None => {
                    i += 1;
                    Some(argv.get(i).ok_or(libc::EINVAL)?.clone())
                }
            },
        };
        i += 1;

        apply_option(&mut parsed, &name, value.as_deref().unwrap_or(""))?;
    }

    parsed.consumed = i.saturating_sub(1);
    Ok(parsed)
}

fn apply_option(parsed: &mut EalArgs, name: &str, value: &str) -> Result<(), c_int> {
    match name {
        "l" | "lcores" => parsed.lcores = Some(parse_core_list(value)?),
        "c" => parsed.lcores = Some(parse_core_mask(value)?),
        "main-lcore" => parsed.main_lcore = Some(parse_num(value)?),
        "n" => parsed.channels = Some(parse_num(value)?),
        "m" => parsed.memory_mb = Some(parse_num(value)?),
        "socket-mem" => parsed.socket_mem = parse_mb_list(value)?,
        "socket-limit" => parsed.socket_limit = parse_mb_list(value)?,
        "vdev" => parsed.vdevs.push(value.to_string()),
        "a" | "allow" => parsed.allow.push(value.to_string()),
        "b" | "block" => parsed.block.push(value.to_string()),
        "file-prefix" => parsed.file_prefix = Some(value.to_string()),
        "proc-type" => match value {
            "primary" | "auto" | "secondary" => parsed.proc_type = Some(value.to_string()),
            _ => return Err(libc::EINVAL),
        },
        "no-pci" => parsed.no_pci = true,
        "no-huge" => parsed.no_huge = true,
        "in-memory" => parsed.in_memory = true,
        // Accepted and ignored: logging, driver loading, hugepage mounts.
        _ => {}
    }
    Ok(())
}

fn configured_cpus() -> u32 {
    let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_CONF) };
    if n <= 0 {
        1
    } else {
        (n as u32).min(MAX_LCORE)
    }
}

fn align_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

/// Bytes one mbuf occupies in a pool: object header plus the aligned mbuf.
pub fn element_size(priv_size: u16, data_room_size: u16) -> u32 {
    let elt = MBUF_HEADER_SIZE + priv_size as u32 + data_room_size as u32;
    MEMPOOL_OBJ_HEADER_SIZE + align_up(elt, CACHE_LINE_SIZE)
}

#[derive(Debug)]
struct SocketMemory {
    capacity: u64,
    used: u64,
}

impl SocketMemory {
    fn available(&self) -> u64 {
        self.capacity.saturating_sub(self.used)
    }
}

#[derive(Debug)]
struct SoftEal {
    lcores: Vec<u32>,
    sockets: Vec<SocketMemory>,
    ports: Vec<String>,
    /// Live pools by name, pointing at their leaked boxes.
    pools: HashMap<String, *mut RteMempool>,
}

// The raw pointers are owned boxes; access is serialized by `EAL`.
unsafe impl Send for SoftEal {}

impl SoftEal {
    fn bring_up(args: &EalArgs) -> Result<Self, c_int> {
        if args.proc_type.as_deref() == Some("secondary") {
            return Err(E_RTE_SECONDARY);
        }
        if args.memory_mb.is_some() && !args.socket_mem.is_empty() {
            return Err(libc::EINVAL);
        }
        if !args.allow.is_empty() && !args.block.is_empty() {
            return Err(libc::EINVAL);
        }

        let cpus = configured_cpus();
        let lcores = match &args.lcores {
            Some(lcores) => lcores.clone(),
            None => (0..cpus).collect(),
        };
        if lcores.is_empty() || lcores.iter().any(|&core| core >= cpus) {
            return Err(libc::EINVAL);
        }
        if let Some(main) = args.main_lcore {
            if !lcores.contains(&main) {
                return Err(libc::EINVAL);
            }
        }

        let socket_count = args.socket_mem.len().max(args.socket_limit.len()).max(1);
        if socket_count > RTE_MAX_NUMA_NODES as usize {
            return Err(libc::EINVAL);
        }
        let sockets = (0..socket_count)
            .map(|socket| -> Result<SocketMemory, c_int> {
                let limit = args.socket_limit.get(socket).copied().unwrap_or(0);
                // A zero limit means unlimited, which we cap at the default.
                let capacity_mb = if limit == 0 {
                    DEFAULT_SOCKET_CAPACITY_MB
                } else {
                    limit
                };
                Ok(SocketMemory {
                    capacity: mb_to_bytes(capacity_mb).ok_or(libc::EINVAL)?,
                    used: 0,
                })
            })
            .collect::<Result<Vec<_>, c_int>>()?;

        // -m / --socket-mem preallocate; they must fit but stay usable by pools.
        let total = sockets
            .iter()
            .fold(0u64, |total, s| total.saturating_add(s.capacity));
        if let Some(mb) = args.memory_mb {
            match mb_to_bytes(mb) {
                Some(bytes) if bytes <= total => {}
                _ => return Err(libc::ENOMEM),
            }
        }
        for (socket, &mb) in args.socket_mem.iter().enumerate() {
            match mb_to_bytes(mb) {
                Some(bytes) if bytes <= sockets[socket].capacity => {}
                _ => return Err(libc::ENOMEM),
            }
        }

        let mut ports: Vec<String> = Vec::new();
        let mut attached: Vec<String> = Vec::new();
        for vdev in &args.vdevs {
            let name = vdev.split(',').next().unwrap_or("").trim();
            if name.is_empty() {
                return Err(libc::EINVAL);
            }
            if !VDEV_DRIVERS.iter().any(|driver| name.starts_with(driver)) {
                return Err(libc::ENODEV);
            }
            if attached.iter().any(|dev| dev == name) {
                return Err(libc::EEXIST);
            }
            attached.push(name.to_string());
            if name.starts_with("net_") {
                ports.push(name.to_string());
            }
        }

        Ok(Self {
            lcores,
            sockets,
            ports,
            pools: HashMap::new(),
        })
    }

    fn create_pool(
        &mut self,
        name: String,
        n: u32,
        cache_size: u32,
        priv_size: u16,
        data_room_size: u16,
        socket_id: c_int,
    ) -> Result<*mut RteMempool, c_int> {
        if priv_size % RTE_MBUF_PRIV_ALIGN != 0 {
            return Err(libc::EINVAL);
        }
        // Cache flush threshold is 1.5x the cache size and must fit the pool.
        if cache_size > RTE_MEMPOOL_CACHE_MAX_SIZE || cache_size as u64 * 3 / 2 > n as u64 {
            return Err(libc::EINVAL);
        }
        if name.len() >= RTE_MEMPOOL_NAMESIZE {
            return Err(libc::ENAMETOOLONG);
        }
        if !(SOCKET_ID_ANY..RTE_MAX_NUMA_NODES).contains(&socket_id) {
            return Err(libc::EINVAL);
        }
        if self.pools.contains_key(&name) {
            return Err(libc::EEXIST);
        }

        let elt_size = element_size(priv_size, data_room_size);
        let footprint = elt_size as u64 * n as u64;

        let socket = if socket_id == SOCKET_ID_ANY {
            self.sockets
                .iter()
                .position(|s| s.available() >= footprint)
                .ok_or(libc::ENOMEM)?
        } else {
            let socket = socket_id as usize;
            match self.sockets.get(socket) {
                Some(mem) if mem.available() >= footprint => socket,
                _ => return Err(libc::ENOMEM),
            }
        };

        let len = usize::try_from(footprint).map_err(|_| libc::ENOMEM)?;
        let mem = vec![0u8; len].into_boxed_slice();
        self.sockets[socket].used += footprint;

        let raw = Box::into_raw(Box::new(RteMempool {
            name: name.clone(),
            size: n,
            elt_size,
            socket,
            footprint,
            _mem: mem,
        }));
        self.pools.insert(name, raw);
        Ok(raw)
    }

    fn free_pool(&mut self, mp: *mut RteMempool) {
        let Some(name) = self
            .pools
            .iter()
            .find(|(_, raw)| **raw == mp)
            .map(|(name, _)| name.clone())
        else {
            return;
        };
        self.pools.remove(&name);
        let pool = unsafe { Box::from_raw(mp) };
        debug_assert_eq!(pool.name, name);
        self.sockets[pool.socket].used -= pool.footprint;
    }
}

impl Drop for SoftEal {
    fn drop(&mut self) {
        for (_, raw) in self.pools.drain() {
            drop(unsafe { Box::from_raw(raw) });
        }
    }
}

/// # Safety
/// `argv` must point to `argc` valid C strings.
pub unsafe fn rte_eal_init(argc: c_int, argv: *mut *mut c_char) -> c_int {
    let mut guard = eal();
    if guard.is_some() {
        set_errno(libc::EALREADY);
        return FFI_ERROR;
    }
    if argv.is_null() || argc < 1 {
        set_errno(libc::EINVAL);
        return FFI_ERROR;
    }

    let args: Vec<String> = (0..argc as usize)
        .map(|i| {
            let arg = *argv.add(i);
            if arg.is_null() {
                String::new()
            } else {
                CStr::from_ptr(arg).to_string_lossy().into_owned()
            }
        })
        .collect();

    let result = parse_args(&args).and_then(|parsed| {
        SoftEal::bring_up(&parsed).map(|state| (state, parsed.consumed))
    });
    match result {
        Ok((state, consumed)) => {
            *guard = Some(state);
            consumed as c_int
        }
        Err(code) => {
            set_errno(code);
            FFI_ERROR
        }
    }
}

/// # Safety
/// Pools created under this environment must not be used afterwards.
pub unsafe fn rte_eal_cleanup() -> c_int {
    match eal().take() {
        Some(state) => {
            drop(state);
            0
        }
        None => {
            set_errno(libc::EALREADY);
            FFI_ERROR
        }
    }
}

/// # Safety
/// `name` must be a valid C string.
pub unsafe fn rte_pktmbuf_pool_create(
    name: *const c_char,
    n: c_uint,
    cache_size: c_uint,
    priv_size: u16,
    data_room_size: u16,
    socket_id: c_int,
) -> *mut RteMempool {
    let mut guard = eal();
    let Some(state) = guard.as_mut() else {
        set_errno(E_RTE_NO_CONFIG);
        return ptr::null_mut();
    };
    if name.is_null() {
        set_errno(libc::EINVAL);
        return ptr::null_mut();
    }
    let name = CStr::from_ptr(name).to_string_lossy().into_owned();
    match state.create_pool(name, n, cache_size, priv_size, data_room_size, socket_id) {
        Ok(raw) => raw,
        Err(code) => {
            set_errno(code);
            ptr::null_mut()
        }
    }
}

/// # Safety
/// `mp` must be null or a pool returned by [`rte_pktmbuf_pool_create`].
pub unsafe fn rte_mempool_free(mp: *mut RteMempool) {
    if mp.is_null() {
        return;
    }
    if let Some(state) = eal().as_mut() {
        state.free_pool(mp);
    }
}

/// # Safety
/// `mp` must reference a live pool.
pub unsafe fn rte_mempool_avail_count(mp: *const RteMempool) -> c_uint {
    (*mp).size
}

/// # Safety
/// `mp` must reference a live pool.
pub unsafe fn rte_mempool_in_use_count(_mp: *const RteMempool) -> c_uint {
    0
}

/// # Safety
/// `mp` must reference a live pool.
pub unsafe fn ffpp_mempool_elt_size(mp: *const RteMempool) -> u32 {
    (*mp).elt_size
}

/// # Safety
/// Always safe; `unsafe` only to match the native signature.
pub unsafe fn ffpp_rte_errno() -> c_int {
    ERRNO.load(Ordering::SeqCst)
}

/// # Safety
/// Always safe; `unsafe` only to match the native signature.
pub unsafe fn rte_lcore_count() -> c_uint {
    eal().as_ref().map_or(0, |state| state.lcores.len() as c_uint)
}

/// # Safety
/// Always safe; `unsafe` only to match the native signature.
pub unsafe fn rte_socket_count() -> c_uint {
    eal().as_ref().map_or(0, |state| state.sockets.len() as c_uint)
}

/// # Safety
/// Always safe; `unsafe` only to match the native signature.
pub unsafe fn rte_eth_dev_count_avail() -> u16 {
    eal().as_ref().map_or(0, |state| state.ports.len() as u16)
}

/// Environment-owned codes first, then the C library table.
pub fn describe(code: c_int) -> String {
    match code {
        E_RTE_SECONDARY => "Invalid call in secondary process".to_string(),
        E_RTE_NO_CONFIG => "Missing rte_config structure".to_string(),
        _ => super::libc_strerror(code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(tokens: &[&str]) -> Vec<String> {
        std::iter::once("test")
            .chain(tokens.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_reference_arguments() {
        let parsed = parse_args(&argv(&[
            "-l",
            "0",
            "-m",
            "5",
            "--no-pci",
            "--vdev=net_null0",
            "--vdev=net_null1",
        ]))
        .unwrap();

        assert_eq!(parsed.lcores, Some(vec![0]));
        assert_eq!(parsed.memory_mb, Some(5));
        assert!(parsed.no_pci);
        assert_eq!(parsed.vdevs, vec!["net_null0", "net_null1"]);
        assert_eq!(parsed.consumed, 7);
    }

    #[test]
    fn test_parse_inline_and_separate_values() {
        let parsed = parse_args(&argv(&["-l0-2", "--vdev", "net_tap0,iface=t0", "-n", "4"])).unwrap();
        assert_eq!(parsed.lcores, Some(vec![0, 1, 2]));
        assert_eq!(parsed.vdevs, vec!["net_tap0,iface=t0"]);
        assert_eq!(parsed.channels, Some(4));
    }

    #[test]
    fn test_parse_stops_at_double_dash() {
        let parsed = parse_args(&argv(&["-l", "0", "--", "--app-flag"])).unwrap();
        assert_eq!(parsed.consumed, 3);
    }

    #[test]
    fn test_parse_stops_at_positional() {
        let parsed = parse_args(&argv(&["--no-pci", "app-arg", "-l", "0"])).unwrap();
        assert_eq!(parsed.consumed, 1);
        assert_eq!(parsed.lcores, None);
    }

    #[test]
    fn test_parse_rejects_unknown_and_incomplete_options() {
        assert_eq!(parse_args(&argv(&["--bogus"])), Err(libc::EINVAL));
        assert_eq!(parse_args(&argv(&["-z"])), Err(libc::EINVAL));
        assert_eq!(parse_args(&argv(&["-l"])), Err(libc::EINVAL));
        assert_eq!(parse_args(&argv(&["--no-pci=yes"])), Err(libc::EINVAL));
        assert_eq!(parse_args(&argv(&["-m", "lots"])), Err(libc::EINVAL));
        assert_eq!(parse_args(&argv(&["--proc-type", "tertiary"])), Err(libc::EINVAL));
    }

    #[test]
    fn test_core_list_forms() {
        assert_eq!(parse_core_list("0"), Ok(vec![0]));
        assert_eq!(parse_core_list("0-3"), Ok(vec![0, 1, 2, 3]));
        assert_eq!(parse_core_list("0,2,4-5"), Ok(vec![0, 2, 4, 5]));
        assert_eq!(parse_core_list("1,1"), Ok(vec![1]));
        assert_eq!(parse_core_list("3-1"), Err(libc::EINVAL));
        assert_eq!(parse_core_list(""), Err(libc::EINVAL));
        assert_eq!(parse_core_list("4,0-1"), Ok(vec![0, 1, 4]));
    }

    #[test]
    fn test_core_list_bounds_checked_before_expansion() {
        assert_eq!(parse_core_list("0-127").map(|c| c.len()), Ok(128));
        assert_eq!(parse_core_list("128"), Err(libc::EINVAL));
        assert_eq!(parse_core_list("0-200000"), Err(libc::EINVAL));
        assert_eq!(parse_core_list("0-4294967295"), Err(libc::EINVAL));
        assert_eq!(parse_args(&argv(&["-l", "0-4294967295"])), Err(libc::EINVAL));
    }

    #[test]
    fn test_core_mask() {
        assert_eq!(parse_core_mask("0x5"), Ok(vec![0, 2]));
        assert_eq!(parse_core_mask("3"), Ok(vec![0, 1]));
        assert_eq!(parse_core_mask("0x0"), Err(libc::EINVAL));
        assert_eq!(parse_core_mask("zz"), Err(libc::EINVAL));
    }

    #[test]
    fn test_bring_up_conflicts_and_limits() {
        let both = parse_args(&argv(&["-m", "5", "--socket-mem", "5"])).unwrap();
        assert_eq!(SoftEal::bring_up(&both).unwrap_err(), libc::EINVAL);

        let too_big = parse_args(&argv(&["-m", "4096"])).unwrap();
        assert_eq!(SoftEal::bring_up(&too_big).unwrap_err(), libc::ENOMEM);

        let limited = parse_args(&argv(&["--socket-limit", "8", "--socket-mem", "16"])).unwrap();
        assert_eq!(SoftEal::bring_up(&limited).unwrap_err(), libc::ENOMEM);

        let bad_core = parse_args(&argv(&["-l", "127"])).unwrap();
        if configured_cpus() <= 127 {
            assert_eq!(SoftEal::bring_up(&bad_core).unwrap_err(), libc::EINVAL);
        }

        // Amounts whose byte count does not fit in 64 bits.
        let huge_m = parse_args(&argv(&["-m", "20000000000000"])).unwrap();
        assert_eq!(SoftEal::bring_up(&huge_m).unwrap_err(), libc::ENOMEM);

        let huge_socket = parse_args(&argv(&["--socket-mem", "20000000000000"])).unwrap();
        assert_eq!(SoftEal::bring_up(&huge_socket).unwrap_err(), libc::ENOMEM);

        let huge_limit = parse_args(&argv(&["--socket-limit", "20000000000000"])).unwrap();
        assert_eq!(SoftEal::bring_up(&huge_limit).unwrap_err(), libc::EINVAL);

        let secondary = parse_args(&argv(&["--proc-type", "secondary"])).unwrap();
        assert_eq!(SoftEal::bring_up(&secondary).unwrap_err(), E_RTE_SECONDARY);
    }

    #[test]
    fn test_bring_up_devices() {
        let parsed = parse_args(&argv(&[
            "-l",
            "0",
            "--vdev=net_null0",
            "--vdev=net_ring0",
            "--vdev=crypto_null0",
        ]))
        .unwrap();
        let state = SoftEal::bring_up(&parsed).unwrap();
        assert_eq!(state.ports, vec!["net_null0", "net_ring0"]);

        let unknown = parse_args(&argv(&["-l", "0", "--vdev=net_warp0"])).unwrap();
        assert_eq!(SoftEal::bring_up(&unknown).unwrap_err(), libc::ENODEV);

        let dup = parse_args(&argv(&["-l", "0", "--vdev=net_null0", "--vdev=net_null0"])).unwrap();
        assert_eq!(SoftEal::bring_up(&dup).unwrap_err(), libc::EEXIST);
    }

    #[test]
    fn test_pool_checks_without_global_state() {
        let parsed = parse_args(&argv(&["-l", "0", "--socket-limit", "16"])).unwrap();
        let mut state = SoftEal::bring_up(&parsed).unwrap();

        let err = |r: Result<*mut RteMempool, c_int>| r.unwrap_err();
        assert_eq!(err(state.create_pool("p".into(), 4096, 256, 4, 2176, -1)), libc::EINVAL);
        assert_eq!(err(state.create_pool("p".into(), 4096, 513, 0, 2176, -1)), libc::EINVAL);
        assert_eq!(err(state.create_pool("p".into(), 100, 256, 0, 2176, -1)), libc::EINVAL);
        assert_eq!(
            err(state.create_pool("x".repeat(26), 64, 0, 0, 2176, -1)),
            libc::ENAMETOOLONG
        );
        assert_eq!(err(state.create_pool("p".into(), 64, 0, 0, 2176, 8)), libc::EINVAL);
        assert_eq!(err(state.create_pool("p".into(), 64, 0, 0, 2176, 1)), libc::ENOMEM);

        let raw = state.create_pool("p".into(), 4096, 256, 0, 2176, -1).unwrap();
        assert_eq!(err(state.create_pool("p".into(), 64, 0, 0, 2176, -1)), libc::EEXIST);
        // 16 MB socket cannot host a second 9 MB pool.
        assert_eq!(err(state.create_pool("q".into(), 4096, 256, 0, 2176, 0)), libc::ENOMEM);

        state.free_pool(raw);
        assert!(state.pools.is_empty());
        assert_eq!(state.sockets[0].used, 0);
        let again = state.create_pool("q".into(), 4096, 256, 0, 2176, 0);
        assert!(again.is_ok());
    }

    #[test]
    fn test_element_size() {
        // 128 + 2176 = 2304, already cache aligned, plus the object header.
        assert_eq!(element_size(0, 2176), 2368);
        assert_eq!(element_size(8, 100), 64 + 256);
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(E_RTE_NO_CONFIG), "Missing rte_config structure");
        assert_eq!(describe(E_RTE_SECONDARY), "Invalid call in secondary process");
        assert!(!describe(libc::EINVAL).is_empty());
    }
}
