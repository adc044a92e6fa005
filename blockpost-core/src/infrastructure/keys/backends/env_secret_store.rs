//! Secrets from process environment variables.
//!
//! `BLOCKPOST_SECRET__<namespace>__<key>=<value>` maps to the secret `<namespace>.<key>`. Values
//! may carry a `hex:` or `b64:` prefix; anything else is taken as UTF-8 text. The legacy
//! `PRIVATE_KEY` variable fills `operator.private_key` when the prefixed form is absent.

use crate::foundation::OperatorError;
use crate::infrastructure::keys::secret_store::{SecretBytes, SecretName, SecretStore, OPERATOR_KEY_SECRET};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::{debug, info, warn};
use std::collections::HashMap;

pub const ENV_PREFIX: &str = "BLOCKPOST_SECRET__";

pub const LEGACY_PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

/// Snapshot of the environment's secrets, taken at construction.
pub struct EnvSecretStore {
    secrets: HashMap<SecretName, SecretBytes>,
}

impl EnvSecretStore {
    pub fn new() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut secrets = HashMap::new();
        let mut legacy_key = None;

        for (key, value) in vars {
            if key == LEGACY_PRIVATE_KEY_ENV {
                legacy_key = Some(value.trim().to_string()).filter(|v| !v.is_empty());
                continue;
            }
            let Some(suffix) = key.strip_prefix(ENV_PREFIX) else { continue };
            let Some(name) = secret_name_from_env(suffix) else {
                warn!("ignoring malformed secret variable name={}", key);
                continue;
            };
            match decode_value(&name, &value) {
                Ok(bytes) => {
                    debug!("secret loaded from environment name={}", name);
                    secrets.insert(name, bytes);
                }
                Err(err) => warn!("secret variable could not be decoded name={} error={}", name, err),
            }
        }

        let operator_key = SecretName::operator_key();
        if let Some(legacy) = legacy_key {
            if !secrets.contains_key(&operator_key) {
                info!("using legacy {} variable for {}", LEGACY_PRIVATE_KEY_ENV, OPERATOR_KEY_SECRET);
                secrets.insert(operator_key, SecretBytes::new(legacy.into_bytes()));
            }
        }
        Self { secrets }
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

/// `operator__private_key` -> `operator.private_key`; `None` without at least two segments.
fn secret_name_from_env(suffix: &str) -> Option<SecretName> {
    let segments: Vec<&str> = suffix.split("__").map(str::trim).filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 || suffix.starts_with("__") {
        return None;
    }
    Some(SecretName::new(segments.join(".")))
}

fn decode_value(name: &SecretName, value: &str) -> Result<SecretBytes, OperatorError> {
    let bytes = if let Some(encoded) = value.strip_prefix("hex:") {
        hex::decode(encoded.trim()).map_err(|err| OperatorError::secret_decode_failed(name.as_str(), "hex", err.to_string()))?
    } else if let Some(encoded) = value.strip_prefix("b64:") {
        BASE64.decode(encoded.trim()).map_err(|err| OperatorError::secret_decode_failed(name.as_str(), "base64", err.to_string()))?
    } else {
        value.trim().as_bytes().to_vec()
    };
    Ok(SecretBytes::new(bytes))
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    fn backend(&self) -> &'static str {
        "env"
    }

    async fn get(&self, name: &SecretName) -> Result<SecretBytes, OperatorError> {
        self.secrets.get(name).cloned().ok_or_else(|| OperatorError::secret_not_found(name.as_str(), "env"))
    }
}
