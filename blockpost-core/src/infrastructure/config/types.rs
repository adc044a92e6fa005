use crate::infrastructure::rpc::RetryPolicy;
use alloy::primitives::Address;
use figment::value::{Dict, Map};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Top-level operator configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub operator: OperatorConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default, skip_serializing)]
    pub profiles: Option<Map<String, Dict>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Active profile to load from `[profiles.<name>]`. CLI `--profile` takes precedence.
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub data_dir: String,
    /// Interval of the periodic status log line. 0 disables it.
    #[serde(default)]
    pub status_interval_secs: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub rpc_url: String,
    #[serde(default)]
    pub confirmation_timeout_secs: u64,
    #[serde(default)]
    pub receipt_poll_interval_ms: u64,
}

impl LedgerConfig {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

/// Addresses of the contracts the operator talks to.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// Blockpost service manager: emits requests, accepts responses. Also the AVS address.
    #[serde(default)]
    pub service_manager: Address,
    /// ECDSA stake registry exposing `registerOperatorWithSignature`.
    #[serde(default)]
    pub stake_registry: Address,
    /// AVS directory computing the registration digest.
    #[serde(default)]
    pub avs_directory: Address,
    /// EigenLayer delegation manager; only needed when registering as an EL operator.
    #[serde(default)]
    pub delegation_manager: Option<Address>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    /// `BLOCKPOST_SECRET__operator__private_key` (or legacy `PRIVATE_KEY`).
    #[default]
    Env,
    /// Hex key file at `operator.key_file`.
    File,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env => write!(f, "env"),
            Self::File => write!(f, "file"),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OperatorConfig {
    #[serde(default)]
    pub key_source: KeySource,
    #[serde(default)]
    pub key_file: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Skip the handshake entirely (the operator must already be registered).
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub expiry_window_secs: u64,
    /// Also register with the delegation manager before the AVS handshake.
    #[serde(default)]
    pub register_with_delegation_manager: bool,
    #[serde(default)]
    pub metadata_uri: String,
    /// Attempts for the directory digest read.
    #[serde(default)]
    pub read_max_attempts: u32,
}

/// Where the request poller starts reading events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StartBlock {
    /// Ledger head at startup, inclusive.
    #[default]
    Latest,
    /// Explicit block number, inclusive (backfill).
    Number(u64),
}

impl FromStr for StartBlock {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }
        trimmed.parse::<u64>().map(Self::Number).map_err(|_| format!("invalid start block '{}': expected 'latest' or a block number", trimmed))
    }
}

impl fmt::Display for StartBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

impl Serialize for StartBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Latest => serializer.serialize_str("latest"),
            Self::Number(n) => serializer.serialize_u64(*n),
        }
    }
}

impl<'de> Deserialize<'de> for StartBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self::Number(n)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub start_block: StartBlock,
    #[serde(default)]
    pub poll_interval_ms: u64,
    /// Upper bound on blocks covered by a single `eth_getLogs` call.
    #[serde(default)]
    pub max_block_range: u64,
    /// Requests signed/submitted concurrently.
    #[serde(default)]
    pub max_concurrency: usize,
    /// Capacity of the queue between poller and workers.
    #[serde(default)]
    pub queue_capacity: usize,
    #[serde(default)]
    pub shutdown_grace_secs: u64,
    /// Completed request ids remembered to skip redelivered events.
    #[serde(default)]
    pub completed_capacity: usize,
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Attempts per submission counting transient failures.
    #[serde(default)]
    pub max_attempts: u32,
    #[serde(default)]
    pub initial_backoff_ms: u64,
    #[serde(default)]
    pub max_backoff_ms: u64,
    /// Re-acquire-and-resubmit cycles allowed after sequence conflicts.
    #[serde(default)]
    pub max_sequence_resyncs: u32,
}

impl SubmissionConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.initial_backoff_ms), Duration::from_millis(self.max_backoff_ms))
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter expression, e.g. `info` or `info,alloy_transport_http=debug`.
    #[serde(default)]
    pub filters: String,
    #[serde(default)]
    pub log_dir: Option<String>,
}
