//! Configuration for environment bring-up and mempool creation
//!
//! The environment itself takes a flat token list (the EAL command line).
//! [`EalConfig`] is a typed front-end that renders that list, and
//! [`MempoolConfig`] captures one pool's parameters, so a whole deployment
//! can be described in a JSON file and loaded with [`AppConfig::load`].

use std::fmt;
use std::os::raw::c_int;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ffi;

/// `argv[0]` handed to the native initializer.
pub const DEFAULT_PROGRAM_NAME: &str = "ffpp";

/// NUMA placement for a pool's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketSelector {
    /// No NUMA constraint.
    #[default]
    Any,
    /// Memory local to the given socket.
    Id(u32),
}

impl SocketSelector {
    /// The native socket id (`SOCKET_ID_ANY` for [`SocketSelector::Any`]).
    pub fn as_raw(self) -> c_int {
        match self {
            Self::Any => ffi::SOCKET_ID_ANY,
            Self::Id(id) => c_int::try_from(id).unwrap_or(c_int::MAX),
        }
    }
}

impl fmt::Display for SocketSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Id(id) => write!(f, "{}", id),
        }
    }
}

/// Typed EAL command line.
///
/// ```rust
/// # use ffpp_core::config::EalConfig;
/// let config = EalConfig::new()
///     .core_list("0-1")
///     .memory_mb(64)
///     .no_pci()
///     .vdev("net_null0");
/// assert_eq!(
///     config.to_args(),
///     ["-l", "0-1", "-m", "64", "--no-pci", "--vdev=net_null0"]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EalConfig {
    /// Program name placed in `argv[0]`.
    pub program_name: String,
    /// Lcore list (`-l`), e.g. `"0"` or `"0-3"`.
    pub core_list: Option<String>,
    /// Memory to preallocate in MB (`-m`).
    pub memory_mb: Option<u32>,
    /// Per-socket memory in MB (`--socket-mem`).
    pub socket_mem: Vec<u32>,
    /// Skip the PCI bus (`--no-pci`).
    pub no_pci: bool,
    /// Use anonymous memory instead of huge pages (`--no-huge`).
    pub no_huge: bool,
    /// Virtual devices (`--vdev=`).
    pub vdevs: Vec<String>,
    /// Runtime file prefix (`--file-prefix`), needed to run two primaries.
    pub file_prefix: Option<String>,
    /// Appended verbatim.
    pub extra_args: Vec<String>,
}

impl Default for EalConfig {
    fn default() -> Self {
        Self {
            program_name: DEFAULT_PROGRAM_NAME.to_string(),
            core_list: None,
            memory_mb: None,
            socket_mem: Vec::new(),
            no_pci: false,
            no_huge: false,
            vdevs: Vec::new(),
            file_prefix: None,
            extra_args: Vec::new(),
        }
    }
}

impl EalConfig {
    /// An empty command line.
    pub fn new() -> Self {
        Self::default()
    }

    /// One lcore, 5 MB, no PCI bus and two null ethernet devices.
    ///
    /// Enough to exercise pools and ports without any hardware.
    pub fn minimal() -> Self {
        Self::new()
            .core_list("0")
            .memory_mb(5)
            .no_pci()
            .vdev("net_null0")
            .vdev("net_null1")
    }

    pub fn core_list(mut self, list: impl Into<String>) -> Self {
        self.core_list = Some(list.into());
        self
    }

    pub fn memory_mb(mut self, mb: u32) -> Self {
        self.memory_mb = Some(mb);
        self
    }

    pub fn socket_mem(mut self, per_socket_mb: impl IntoIterator<Item = u32>) -> Self {
        self.socket_mem = per_socket_mb.into_iter().collect();
        self
    }

    pub fn no_pci(mut self) -> Self {
        self.no_pci = true;
        self
    }

    pub fn no_huge(mut self) -> Self {
        self.no_huge = true;
        self
    }

    pub fn vdev(mut self, device: impl Into<String>) -> Self {
        self.vdevs.push(device.into());
        self
    }

    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = Some(prefix.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Render the command line, `argv[0]` excluded.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(list) = &self.core_list {
            args.push("-l".to_string());
            args.push(list.clone());
        }
        if let Some(mb) = self.memory_mb {
            args.push("-m".to_string());
            args.push(mb.to_string());
        }
        if !self.socket_mem.is_empty() {
            let per_socket: Vec<String> = self.socket_mem.iter().map(u32::to_string).collect();
            args.push("--socket-mem".to_string());
            args.push(per_socket.join(","));
        }
        if self.no_pci {
            args.push("--no-pci".to_string());
        }
        if self.no_huge {
            args.push("--no-huge".to_string());
        }
        for vdev in &self.vdevs {
            args.push(format!("--vdev={}", vdev));
        }
        if let Some(prefix) = &self.file_prefix {
            args.push("--file-prefix".to_string());
            args.push(prefix.clone());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Parameters of one packet-buffer pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    pub name: String,
    /// Total number of buffers.
    pub count: u32,
    /// Buffers cached per lcore.
    pub cache_size: u32,
    /// Application-private bytes per buffer, a multiple of 8.
    pub priv_size: u16,
    /// Packet data capacity per buffer, headroom included.
    pub data_room_size: u16,
    pub socket: SocketSelector,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            name: "mbuf_pool".to_string(),
            count: 4096,
            cache_size: crate::mempool::DEFAULT_CACHE_SIZE,
            priv_size: 0,
            data_room_size: ffi::RTE_MBUF_DEFAULT_BUF_SIZE,
            socket: SocketSelector::Any,
        }
    }
}

impl MempoolConfig {
    /// Default geometry under a given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn cache_size(mut self, cache_size: u32) -> Self {
        self.cache_size = cache_size;
        self
    }

    pub fn priv_size(mut self, priv_size: u16) -> Self {
        self.priv_size = priv_size;
        self
    }

    pub fn data_room_size(mut self, data_room_size: u16) -> Self {
        self.data_room_size = data_room_size;
        self
    }

    pub fn socket(mut self, socket: SocketSelector) -> Self {
        self.socket = socket;
        self
    }
}

/// Environment plus the pools to create in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "EalConfig::minimal")]
    pub eal: EalConfig,
    #[serde(default)]
    pub pools: Vec<MempoolConfig>,
}

impl Default for AppConfig {
    /// The minimal environment with one default pool named `test`.
    fn default() -> Self {
        Self {
            eal: EalConfig::minimal(),
            pools: vec![MempoolConfig::new("test")],
        }
    }
}

impl AppConfig {
    /// Load a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration from {:?}", path))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("Invalid configuration in {:?}", path))?;
        debug!(path = ?path, pools = config.pools.len(), "Configuration loaded");
        Ok(config)
    }

    /// Parse a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse configuration JSON")
    }
}
