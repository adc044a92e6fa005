use crate::fixtures::*;
use alloy::primitives::address;
use blockpost_core::application::{MonitorSettings, PollerSettings, RegistrationSettings, SubmitterSettings};
use blockpost_core::foundation::OperatorError;
use blockpost_core::infrastructure::config::{load_app_config_from_path, KeySource, StartBlock};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::Duration;
use tempfile::TempDir;

fn lock_env() -> MutexGuard<'static, ()> {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Sets variables for the life of the guard and removes them afterwards.
struct EnvVars(Vec<&'static str>);

impl EnvVars {
    fn set(pairs: &[(&'static str, &str)]) -> Self {
        for (key, value) in pairs {
            std::env::set_var(key, value);
        }
        Self(pairs.iter().map(|(key, _)| *key).collect())
    }
}

impl Drop for EnvVars {
    fn drop(&mut self) {
        for key in &self.0 {
            std::env::remove_var(key);
        }
    }
}

fn write_config(body: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("blockpost.toml");
    std::fs::write(&path, body).expect("write config");
    (dir, path)
}

fn base_config() -> String {
    format!(
        r#"
[ledger]
rpc_url = "http://file-node:8545"

[contracts]
service_manager = "{}"
stake_registry = "{}"
avs_directory = "{}"

[monitor]
max_concurrency = 2
start_block = 1200

[submission]
max_attempts = 4
initial_backoff_ms = 250
max_backoff_ms = 4000

[profiles.holesky.ledger]
rpc_url = "https://holesky.example.org"

[profiles.holesky.monitor]
start_block = "latest"
"#,
        SERVICE_MANAGER, STAKE_REGISTRY, AVS_DIRECTORY
    )
}

#[test]
fn file_values_flow_into_component_settings() {
    let _lock = lock_env();
    let (dir, path) = write_config(&base_config());

    let config = load_app_config_from_path(&path, dir.path(), None).expect("config");

    assert_eq!(config.ledger.rpc_url, "http://file-node:8545");
    assert_eq!(config.contracts.service_manager, SERVICE_MANAGER);
    assert_eq!(config.operator.key_source, KeySource::Env);

    let submitter = SubmitterSettings::from_config(&config);
    assert_eq!(submitter.policy.max_attempts, 4);
    assert_eq!(submitter.policy.backoff_for(1), Duration::from_millis(250));
    assert_eq!(submitter.policy.backoff_for(10), Duration::from_secs(4));

    let poller = PollerSettings::from_config(&config);
    assert_eq!(poller.start_block, StartBlock::Number(1200));
    assert_eq!(poller.service_manager, SERVICE_MANAGER);

    assert_eq!(MonitorSettings::from_config(&config).max_concurrency, 2);
    let registration = RegistrationSettings::from_config(&config);
    assert_eq!(registration.stake_registry, STAKE_REGISTRY);
    assert_eq!(registration.avs_directory, AVS_DIRECTORY);
}

#[test]
fn environment_overrides_file_and_legacy_names() {
    let _lock = lock_env();
    let (dir, path) = write_config(&base_config());
    let legacy_manager = address!("00000000000000000000000000000000000000aa");
    let _env = EnvVars::set(&[
        ("BLOCKPOST_MONITOR__MAX_CONCURRENCY", "9"),
        ("CONTRACT_ADDRESS", "0x00000000000000000000000000000000000000aa"),
        ("RPC_URL", "http://legacy-node:8545"),
        ("BLOCKPOST_LEDGER__RPC_URL", "http://prefixed-node:8545"),
        ("BLOCKPOST_SECRET__operator__private_key", "never read by the config loader"),
    ]);

    let config = load_app_config_from_path(&path, dir.path(), None).expect("config");

    assert_eq!(config.monitor.max_concurrency, 9);
    assert_eq!(config.contracts.service_manager, legacy_manager);
    // Prefixed variables win over legacy ones.
    assert_eq!(config.ledger.rpc_url, "http://prefixed-node:8545");
    assert_eq!(config.contracts.stake_registry, STAKE_REGISTRY);
}

#[test]
fn profile_overrides_apply_on_top_of_the_file() {
    let _lock = lock_env();
    let (dir, path) = write_config(&base_config());

    let config = load_app_config_from_path(&path, dir.path(), Some("holesky")).expect("config");

    assert_eq!(config.service.active_profile.as_deref(), Some("holesky"));
    assert_eq!(config.ledger.rpc_url, "https://holesky.example.org");
    assert_eq!(config.monitor.start_block, StartBlock::Latest);
    assert_eq!(config.monitor.max_concurrency, 2);
}

#[test]
fn missing_contract_addresses_fail_validation() {
    let _lock = lock_env();
    let (dir, path) = write_config("[ledger]\nrpc_url = \"http://127.0.0.1:8545\"\n");

    let err = load_app_config_from_path(&path, dir.path(), None).expect_err("invalid");
    let OperatorError::ConfigError(details) = err else {
        panic!("expected a configuration error, got {}", err);
    };
    assert!(details.contains("contracts.service_manager"), "{}", details);
    assert!(details.contains("contracts.stake_registry"), "{}", details);
    assert!(details.contains("contracts.avs_directory"), "{}", details);
}

#[test]
fn file_key_source_requires_a_key_file() {
    let _lock = lock_env();
    let (dir, path) = write_config(&format!("{}\n[operator]\nkey_source = \"file\"\n", base_config()));

    let err = load_app_config_from_path(&path, dir.path(), None).expect_err("invalid");
    assert!(err.is_fatal());
    assert!(err.to_string().contains("operator.key_file"), "{}", err);
}

#[test]
fn malformed_file_is_a_fatal_config_error() {
    let _lock = lock_env();
    let (dir, path) = write_config(&format!("{}\n[monitor\nmax_concurrency = 3\n", base_config()));

    let err = load_app_config_from_path(&path, dir.path(), None).expect_err("malformed");
    assert!(err.is_fatal());
    let OperatorError::ConfigError(details) = err else {
        panic!("expected a configuration error, got {}", err);
    };
    assert!(details.starts_with("config extraction failed"), "{}", details);
}
