use std::env;
use std::path::Path;
use std::process::Command;

/// This build script decides which native environment backs the crate:
/// 1. A system DPDK, located through pkg-config, when the `dpdk` feature is on
/// 2. The in-process software EAL otherwise
///
/// When DPDK is found, a small C shim exposing `rte_errno` and a few mempool
/// fields is compiled and linked next to the DPDK libraries.
fn main() {
    // Tell Cargo about our custom cfg flag
    println!("cargo:rustc-check-cfg=cfg(dpdk_available)");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=csrc/");
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");

    if env::var_os("CARGO_FEATURE_DPDK").is_none() {
        return;
    }

    match probe_dpdk() {
        Some(flags) => {
            build_shim(&flags);
            for dir in &flags.link_dirs {
                println!("cargo:rustc-link-search=native={}", dir);
            }
            for lib in &flags.libs {
                println!("cargo:rustc-link-lib=dylib={}", lib);
            }
            println!("cargo:rustc-cfg=dpdk_available");
        }
        None => {
            println!("cargo:warning=DPDK not found through pkg-config");
            println!("cargo:warning=Building with the software EAL instead");
        }
    }
}

/// Compiler and linker flags reported by `pkg-config libdpdk`.
struct DpdkFlags {
    include_dirs: Vec<String>,
    defines: Vec<String>,
    link_dirs: Vec<String>,
    libs: Vec<String>,
}

/// Queries pkg-config for libdpdk.
///
/// Returns: None if pkg-config is missing or libdpdk is not installed
fn probe_dpdk() -> Option<DpdkFlags> {
    let output = Command::new("pkg-config")
        .args(["--cflags", "--libs", "libdpdk"])
        .output();

    let output = match output {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            println!(
                "cargo:warning=pkg-config libdpdk failed with status: {}",
                output.status
            );
            return None;
        }
        Err(e) => {
            println!(
                "cargo:warning=Failed to execute pkg-config: {}. Is it installed?",
                e
            );
            return None;
        }
    };

    let text = String::from_utf8_lossy(&output.stdout);
    let mut flags = DpdkFlags {
        include_dirs: Vec::new(),
        defines: Vec::new(),
        link_dirs: Vec::new(),
        libs: Vec::new(),
    };

    for token in text.split_whitespace() {
        if let Some(dir) = token.strip_prefix("-I") {
            flags.include_dirs.push(dir.to_string());
        } else if let Some(def) = token.strip_prefix("-D") {
            flags.defines.push(def.to_string());
        } else if let Some(dir) = token.strip_prefix("-L") {
            flags.link_dirs.push(dir.to_string());
        } else if let Some(lib) = token.strip_prefix("-l") {
            flags.libs.push(lib.to_string());
        }
    }

    Some(flags)
}

/// Compiles `csrc/rte_shim.c` into a static library.
fn build_shim(flags: &DpdkFlags) {
    let mut build = cc::Build::new();
    build.file(Path::new("csrc").join("rte_shim.c"));
    build.flag_if_supported("-march=native");

    for dir in &flags.include_dirs {
        build.include(dir);
    }
    for def in &flags.defines {
        match def.split_once('=') {
            Some((name, value)) => build.define(name, Some(value)),
            None => build.define(def, None),
        };
    }

    build.compile("ffpp_rte_shim");
}
