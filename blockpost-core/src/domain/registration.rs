use crate::foundation::{OperatorError, Result, DEFAULT_REGISTRATION_EXPIRY_SECS, REGISTRATION_SALT_LEN};
use alloy::primitives::{Address, Bytes, B256};
use rand::rngs::OsRng;
use rand::RngCore;

/// Inputs to the directory's registration digest. One instance per registration attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationParams {
    pub operator: Address,
    pub service: Address,
    pub salt: B256,
    pub expiry: u64,
}

impl RegistrationParams {
    /// Fresh salt from the OS RNG and an expiry `window_secs` after `now_secs`.
    pub fn fresh(operator: Address, service: Address, now_secs: u64, window_secs: u64) -> Result<Self> {
        Ok(Self { operator, service, salt: generate_salt(), expiry: expiry_after(now_secs, window_secs)? })
    }

    pub fn into_signature(self, signature: Bytes) -> OperatorSignature {
        OperatorSignature { signature, salt: self.salt, expiry: self.expiry }
    }
}

/// `{signature, salt, expiry}` as accepted by `registerOperatorWithSignature`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorSignature {
    pub signature: Bytes,
    pub salt: B256,
    pub expiry: u64,
}

pub fn generate_salt() -> B256 {
    let mut salt = [0u8; REGISTRATION_SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    B256::from(salt)
}

/// Expiry strictly after `now_secs`. A zero window falls back to the default.
pub fn expiry_after(now_secs: u64, window_secs: u64) -> Result<u64> {
    let window = if window_secs == 0 { DEFAULT_REGISTRATION_EXPIRY_SECS } else { window_secs };
    now_secs
        .checked_add(window)
        .ok_or_else(|| OperatorError::Registration(format!("expiry overflow now_secs={} window_secs={}", now_secs, window)))
}
