//! Configuration loader using Figment for layered config management.
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. TOML config file
//! 3. Profile overrides from `[profiles.<name>]`
//! 4. Legacy unprefixed environment variables (`RPC_URL`, `CONTRACT_ADDRESS`, ...)
//! 5. Environment variables (BLOCKPOST_* prefix)

use crate::foundation::{OperatorError, DEFAULT_COMPLETED_CAPACITY, DEFAULT_REGISTRATION_EXPIRY_SECS};
use crate::infrastructure::config::types::AppConfig;
use crate::infrastructure::rpc::redact_url;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::value::Dict;
use figment::{Figment, Profile};
use log::{debug, info};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "blockpost.toml";

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_RECEIPT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_READ_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
const DEFAULT_MAX_BLOCK_RANGE: u64 = 1_000;
const DEFAULT_MAX_CONCURRENCY: usize = 4;
const DEFAULT_QUEUE_CAPACITY: usize = 256;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;
const DEFAULT_MAX_BACKOFF_MS: u64 = 10_000;
const DEFAULT_MAX_SEQUENCE_RESYNCS: u32 = 3;
const DEFAULT_LOG_FILTERS: &str = "info";
const DEFAULT_STATUS_INTERVAL_SECS: u64 = 60;

/// Environment variable prefix for config overrides.
///
/// Example: `BLOCKPOST_LEDGER__RPC_URL` -> `ledger.rpc_url`
const ENV_PREFIX: &str = "BLOCKPOST_";

/// Unprefixed variables accepted for compatibility with existing operator deployments.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("RPC_URL", "ledger.rpc_url"),
    ("CONTRACT_ADDRESS", "contracts.service_manager"),
    ("STAKE_REGISTRY_ADDRESS", "contracts.stake_registry"),
    ("AVS_DIRECTORY_ADDRESS", "contracts.avs_directory"),
    ("DELEGATION_MANAGER_ADDRESS", "contracts.delegation_manager"),
];

/// Load configuration from the default file in `data_dir` (`blockpost.toml`).
pub fn load_config(data_dir: &Path) -> Result<AppConfig, OperatorError> {
    let config_path = data_dir.join(DEFAULT_CONFIG_FILE);
    load_config_from_file(&config_path, data_dir)
}

/// Load configuration from a specific file path.
pub fn load_config_from_file(path: &Path, data_dir: &Path) -> Result<AppConfig, OperatorError> {
    info!("loading configuration path={} data_dir={}", path.display(), data_dir.display());
    let figment = with_env(figment_base(path));
    let mut config: AppConfig = figment.extract()?;
    postprocess(&mut config, data_dir);
    debug!(
        "configuration loaded rpc_url={} service_manager={} max_concurrency={}",
        redact_url(&config.ledger.rpc_url),
        config.contracts.service_manager,
        config.monitor.max_concurrency
    );
    Ok(config)
}

/// Load configuration from a specific file path with profile overrides.
pub fn load_config_from_file_with_profile(path: &Path, data_dir: &Path, profile: &str) -> Result<AppConfig, OperatorError> {
    info!("loading configuration with profile path={} data_dir={} profile={}", path.display(), data_dir.display(), profile);

    // Extract once to access `profiles.<name>` overrides from the file.
    let base_config: AppConfig = figment_base(path).extract()?;
    let overrides = profile_overrides(&base_config, profile)?;

    let figment = with_env(figment_base(path).merge(Serialized::from(overrides, Profile::Default)));
    let mut config: AppConfig = figment
        .extract()
        .map_err(|err| OperatorError::ConfigError(format!("config extraction failed for profile '{}': {}", profile, err)))?;
    config.service.active_profile = Some(profile.to_string());
    postprocess(&mut config, data_dir);

    debug!("configuration loaded with profile profile={} rpc_url={}", profile, redact_url(&config.ledger.rpc_url));
    Ok(config)
}

fn figment_base(path: &Path) -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
    if path.exists() {
        figment = figment.merge(Toml::file(path));
    } else {
        debug!("configuration file missing; using defaults and env only path={}", path.display());
    }
    figment
}

fn with_env(figment: Figment) -> Figment {
    figment.merge(legacy_env()).merge(
        Env::prefixed(ENV_PREFIX)
            .ignore(&["config_path", "data_dir", "profile"])
            .filter(|key| !key.as_str().to_ascii_lowercase().starts_with("secret"))
            .split("__"),
    )
}

fn legacy_env() -> Env {
    Env::raw().filter_map(|key| {
        let upper = key.as_str().to_ascii_uppercase();
        LEGACY_ENV_KEYS.iter().find(|(name, _)| *name == upper).map(|(_, path)| (*path).into())
    })
}

fn profile_overrides(config: &AppConfig, profile: &str) -> Result<Dict, OperatorError> {
    let profiles = config.profiles.as_ref().ok_or_else(|| OperatorError::ConfigError("no profiles section in config".to_string()))?;
    profiles.get(profile).cloned().ok_or_else(|| OperatorError::ConfigError(format!("profile '{}' not found in config", profile)))
}

fn postprocess(config: &mut AppConfig, data_dir: &Path) {
    if config.service.data_dir.trim().is_empty() {
        config.service.data_dir = data_dir.to_string_lossy().to_string();
    }
    if config.service.status_interval_secs == 0 {
        config.service.status_interval_secs = DEFAULT_STATUS_INTERVAL_SECS;
    }

    if config.ledger.rpc_url.trim().is_empty() {
        config.ledger.rpc_url = DEFAULT_RPC_URL.to_string();
    }
    if config.ledger.confirmation_timeout_secs == 0 {
        config.ledger.confirmation_timeout_secs = DEFAULT_CONFIRMATION_TIMEOUT_SECS;
    }
    if config.ledger.receipt_poll_interval_ms == 0 {
        config.ledger.receipt_poll_interval_ms = DEFAULT_RECEIPT_POLL_INTERVAL_MS;
    }

    if config.registration.expiry_window_secs == 0 {
        config.registration.expiry_window_secs = DEFAULT_REGISTRATION_EXPIRY_SECS;
    }
    if config.registration.read_max_attempts == 0 {
        config.registration.read_max_attempts = DEFAULT_READ_MAX_ATTEMPTS;
    }

    if config.monitor.poll_interval_ms == 0 {
        config.monitor.poll_interval_ms = DEFAULT_POLL_INTERVAL_MS;
    }
    if config.monitor.max_block_range == 0 {
        config.monitor.max_block_range = DEFAULT_MAX_BLOCK_RANGE;
    }
    if config.monitor.max_concurrency == 0 {
        config.monitor.max_concurrency = DEFAULT_MAX_CONCURRENCY;
    }
    if config.monitor.queue_capacity == 0 {
        config.monitor.queue_capacity = DEFAULT_QUEUE_CAPACITY;
    }
    if config.monitor.shutdown_grace_secs == 0 {
        config.monitor.shutdown_grace_secs = DEFAULT_SHUTDOWN_GRACE_SECS;
    }
    if config.monitor.completed_capacity == 0 {
        config.monitor.completed_capacity = DEFAULT_COMPLETED_CAPACITY;
    }

    if config.submission.max_attempts == 0 {
        config.submission.max_attempts = DEFAULT_MAX_ATTEMPTS;
    }
    if config.submission.initial_backoff_ms == 0 {
        config.submission.initial_backoff_ms = DEFAULT_INITIAL_BACKOFF_MS;
    }
    if config.submission.max_backoff_ms == 0 {
        config.submission.max_backoff_ms = DEFAULT_MAX_BACKOFF_MS;
    }
    if config.submission.max_sequence_resyncs == 0 {
        config.submission.max_sequence_resyncs = DEFAULT_MAX_SEQUENCE_RESYNCS;
    }

    if config.logging.filters.trim().is_empty() {
        config.logging.filters = DEFAULT_LOG_FILTERS.to_string();
    }
}
