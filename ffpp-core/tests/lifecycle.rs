//! End-to-end lifecycle tests for the environment and its pools.
//!
//! The environment is a process singleton, so every test here takes
//! `ENV_LOCK` first.

use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ffpp_core::{
    ready_signal, state, AppConfig, EalConfig, EnvState, Environment, Error, MempoolConfig,
    SocketSelector, Violation, DEFAULT_BUF_SIZE, MAX_CACHE_SIZE,
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

const SCENARIO_ARGS: [&str; 7] = [
    "-l",
    "0",
    "-m",
    "5",
    "--no-pci",
    "--vdev=net_null0",
    "--vdev=net_null1",
];

#[test]
fn test_reference_scenario() {
    let _guard = env_lock();

    let env = Environment::init(SCENARIO_ARGS).unwrap();
    let pool = env
        .create_pool("test", 4096, 256, 0, DEFAULT_BUF_SIZE, SocketSelector::Any)
        .unwrap();
    assert_eq!(pool.size(), 4096);
    pool.free();
    env.cleanup();
}

#[test]
fn test_reinit_after_cleanup() {
    let _guard = env_lock();

    for _ in 0..5 {
        let env = Environment::init(SCENARIO_ARGS).unwrap();
        assert_eq!(state(), EnvState::Initialized);
        env.create_default_pool("cycle", 4096, SocketSelector::Any)
            .unwrap()
            .free();
        env.cleanup();
        assert_eq!(state(), EnvState::Cleaned);
    }
}

#[test]
fn test_repeated_create_free() {
    let _guard = env_lock();
    let env = Environment::init(SCENARIO_ARGS).unwrap();

    for _ in 0..200 {
        let pool = env
            .create_pool("churn", 4096, 256, 0, DEFAULT_BUF_SIZE, SocketSelector::Any)
            .unwrap();
        pool.free();
    }

    let snapshot = env.metrics().snapshot();
    assert_eq!(snapshot.pools_created, 200);
    assert_eq!(snapshot.pools_freed, 200);
    assert_eq!(snapshot.live_pools, 0);
    assert_eq!(snapshot.creation_failures, 0);
    env.cleanup();
}

#[test]
fn test_duplicate_name_rejected() {
    let _guard = env_lock();
    let env = Environment::init(SCENARIO_ARGS).unwrap();

    let pool = env.create_default_pool("rx", 4096, SocketSelector::Any).unwrap();
    let err = env
        .create_default_pool("rx", 4096, SocketSelector::Any)
        .unwrap_err();
    match &err {
        Error::PoolCreation { name, source } => {
            assert_eq!(name, "rx");
            assert_eq!(source.code(), libc::EEXIST);
            assert!(!source.description().is_empty());
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // The original pool is still usable.
    assert_eq!(pool.avail_count(), 4096);
    pool.free();
    env.cleanup();
}

#[test]
fn test_oversized_cache_rejected() {
    let _guard = env_lock();
    let env = Environment::init(SCENARIO_ARGS).unwrap();

    let err = env
        .create_pool(
            "cache",
            1 << 20,
            MAX_CACHE_SIZE + 1,
            0,
            DEFAULT_BUF_SIZE,
            SocketSelector::Any,
        )
        .unwrap_err();
    assert_eq!(err.code(), Some(libc::EINVAL));
    assert!(!env.pool_exists("cache"));
    assert_eq!(env.metrics().snapshot().bytes_reserved, 0);
    env.cleanup();
}

#[test]
fn test_second_init_is_a_violation() {
    let _guard = env_lock();
    let env = Environment::init(SCENARIO_ARGS).unwrap();

    match Environment::init(SCENARIO_ARGS) {
        Err(Error::Precondition(Violation::AlreadyInitialized)) => {}
        other => panic!("expected AlreadyInitialized, got {:?}", other),
    }
    env.cleanup();
}

#[cfg(not(dpdk_available))]
#[test]
fn test_out_of_memory_leaves_existing_pool() {
    let _guard = env_lock();
    let env = Environment::init(["-l", "0", "--no-pci", "--socket-limit", "16"]).unwrap();

    let small = env.create_default_pool("small", 1024, SocketSelector::Any).unwrap();
    let err = env
        .create_default_pool("huge", 1 << 16, SocketSelector::Any)
        .unwrap_err();
    assert_eq!(err.code(), Some(libc::ENOMEM));
    assert!(err.is_recoverable());

    assert!(small.is_full());
    assert_eq!(env.live_pools(), vec!["small".to_string()]);
    small.free();
    env.cleanup();
}

#[cfg(not(dpdk_available))]
#[test]
fn test_init_failures_carry_native_codes() {
    let _guard = env_lock();

    let cases: [(&[&str], i32); 4] = [
        (&["--no-such-option"], libc::EINVAL),
        (&["-l", "0", "--vdev=net_bogus0"], libc::ENODEV),
        (&["-l", "0", "--proc-type=secondary"], ffpp_core::ffi::E_RTE_SECONDARY),
        (&["-l", "0", "-m", "4", "--socket-mem", "4"], libc::EINVAL),
    ];
    for (args, code) in cases {
        let err = Environment::init(args.iter().copied()).unwrap_err();
        assert!(matches!(err, Error::EnvironmentInit(_)), "{:?}", args);
        assert_eq!(err.code(), Some(code), "{:?}", args);
        assert!(!err.is_recoverable());
    }
    assert_ne!(state(), EnvState::Initialized);
}

#[cfg(not(dpdk_available))]
#[test]
fn test_unaddressable_init_amounts_do_not_block_later_init() {
    let _guard = env_lock();

    for args in [
        ["-l", "0", "-m", "20000000000000"],
        ["-l", "0", "--socket-mem", "20000000000000"],
        ["-l", "0-4294967295", "-m", "5"],
    ] {
        let err = Environment::init(args).unwrap_err();
        assert!(matches!(err, Error::EnvironmentInit(_)), "{:?}", args);
        assert_ne!(state(), EnvState::Initialized);
    }

    Environment::init(["-l", "0", "-m", "5"]).unwrap().cleanup();
}

#[tokio::test]
async fn test_ready_signal_follows_lifecycle() {
    let _guard = env_lock();
    let mut ready = ready_signal();
    assert!(!*ready.borrow_and_update());

    let env = Environment::init(SCENARIO_ARGS).unwrap();
    ready.changed().await.unwrap();
    assert!(*ready.borrow_and_update());

    env.cleanup();
    ready.changed().await.unwrap();
    assert!(!*ready.borrow());
}

#[test]
fn test_from_config_file() {
    let _guard = env_lock();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "eal": {{ "core_list": "0", "memory_mb": 5, "no_pci": true }},
            "pools": [
                {{ "name": "rx", "count": 2048, "cache_size": 128 }},
                {{ "name": "tx", "count": 1024, "priv_size": 64, "socket": {{ "id": 0 }} }}
            ]
        }}"#
    )
    .unwrap();

    let config = AppConfig::load(file.path()).unwrap();
    let env = Environment::from_config(&config.eal).unwrap();
    let pools: Vec<_> = config
        .pools
        .iter()
        .map(|pool| env.create_pool_with(pool).unwrap())
        .collect();

    assert_eq!(env.live_pools(), vec!["rx".to_string(), "tx".to_string()]);
    assert_eq!(pools[1].priv_size(), 64);
    assert_eq!(pools[1].socket(), SocketSelector::Id(0));

    drop(pools);
    assert!(env.live_pools().is_empty());
    env.cleanup();
}

#[test]
fn test_default_app_config_runs() {
    let _guard = env_lock();

    let config = AppConfig::default();
    assert_eq!(config.eal, EalConfig::minimal());
    assert_eq!(config.pools, vec![MempoolConfig::new("test")]);

    let env = Environment::from_config(&config.eal).unwrap();
    for pool_config in &config.pools {
        env.create_pool_with(pool_config).unwrap().free();
    }
    env.cleanup();
}
