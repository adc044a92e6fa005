//! Secret lookup seam. The operator key is the only secret the node needs.

use crate::foundation::OperatorError;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretVec};
use std::fmt;

/// Name under which every backend exposes the operator's secp256k1 private key.
pub const OPERATOR_KEY_SECRET: &str = "operator.private_key";

/// Dotted secret identifier, e.g. `operator.private_key`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SecretName(String);

impl SecretName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn operator_key() -> Self {
        Self::new(OPERATOR_KEY_SECRET)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecretName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key material that is zeroized on drop and never printed.
pub struct SecretBytes(SecretVec<u8>);

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(SecretVec::new(bytes))
    }

    pub fn expose_secret(&self) -> &[u8] {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for SecretBytes {
    fn clone(&self) -> Self {
        Self::new(self.expose_secret().to_vec())
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes(<{} bytes redacted>)", self.len())
    }
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Short backend label for logs, e.g. `env` or `file`.
    fn backend(&self) -> &'static str;

    async fn get(&self, name: &SecretName) -> Result<SecretBytes, OperatorError>;
}
