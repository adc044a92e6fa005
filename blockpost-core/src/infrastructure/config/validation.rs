use crate::infrastructure::config::types::{AppConfig, KeySource};
use alloy::primitives::Address;

const MAX_REGISTRATION_EXPIRY_SECS: u64 = 7 * 24 * 60 * 60;
const MAX_CONCURRENCY: usize = 256;

impl AppConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let rpc_url = self.ledger.rpc_url.trim();
        if rpc_url.is_empty() {
            errors.push("ledger.rpc_url must not be empty".to_string());
        } else if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
            errors.push("ledger.rpc_url must be an http(s) url".to_string());
        }
        if self.ledger.confirmation_timeout_secs == 0 {
            errors.push("ledger.confirmation_timeout_secs must be > 0".to_string());
        }

        for (field, address) in [
            ("contracts.service_manager", self.contracts.service_manager),
            ("contracts.stake_registry", self.contracts.stake_registry),
            ("contracts.avs_directory", self.contracts.avs_directory),
        ] {
            if address == Address::ZERO {
                errors.push(format!("{} must be set to a non-zero address", field));
            }
        }

        if self.registration.register_with_delegation_manager {
            match self.contracts.delegation_manager {
                None => errors.push(
                    "contracts.delegation_manager is required when registration.register_with_delegation_manager=true".to_string(),
                ),
                Some(addr) if addr == Address::ZERO => {
                    errors.push("contracts.delegation_manager must be a non-zero address".to_string())
                }
                Some(_) => {}
            }
        }

        if self.operator.key_source == KeySource::File && self.operator.key_file.as_deref().map(str::trim).unwrap_or("").is_empty() {
            errors.push("operator.key_file is required when operator.key_source=file".to_string());
        }

        if self.registration.expiry_window_secs == 0 {
            errors.push("registration.expiry_window_secs must be > 0".to_string());
        }
        if self.registration.expiry_window_secs > MAX_REGISTRATION_EXPIRY_SECS {
            errors.push(format!("registration.expiry_window_secs should not exceed {}", MAX_REGISTRATION_EXPIRY_SECS));
        }

        if self.monitor.poll_interval_ms == 0 {
            errors.push("monitor.poll_interval_ms must be > 0".to_string());
        }
        if self.monitor.max_block_range == 0 {
            errors.push("monitor.max_block_range must be > 0".to_string());
        }
        if self.monitor.max_concurrency == 0 || self.monitor.max_concurrency > MAX_CONCURRENCY {
            errors.push(format!("monitor.max_concurrency must be within 1..={}", MAX_CONCURRENCY));
        }
        if self.monitor.queue_capacity == 0 {
            errors.push("monitor.queue_capacity must be > 0".to_string());
        }
        if self.monitor.completed_capacity == 0 {
            errors.push("monitor.completed_capacity must be > 0".to_string());
        }

        if self.submission.max_attempts == 0 {
            errors.push("submission.max_attempts must be > 0".to_string());
        }
        if self.submission.initial_backoff_ms > self.submission.max_backoff_ms {
            errors.push("submission.initial_backoff_ms cannot exceed submission.max_backoff_ms".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
