use crate::domain::hashes::evm_address_from_uncompressed;
use crate::foundation::{OperatorError, EVM_RECOVERY_OFFSET, SIGNATURE_LEN};
use crate::infrastructure::keys::secret_store::{SecretBytes, SecretName, SecretStore};
use alloy::primitives::{Address, Bytes, B256};
use alloy::signers::local::PrivateKeySigner;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
use std::fmt;
use zeroize::Zeroizing;

/// The operator's signing key and the EVM address derived from it.
///
/// Built once at startup and shared read-only. The key never leaves this type except as the
/// transaction signer handed to the ledger client.
pub struct OperatorIdentity {
    secret: SecretKey,
    address: Address,
}

impl OperatorIdentity {
    /// Accepts either 32 raw key bytes or hex text (with or without `0x`).
    pub fn from_secret_bytes(secret: &SecretBytes) -> Result<Self, OperatorError> {
        let raw = secret.expose_secret();
        let key_bytes = if raw.len() == 32 {
            Zeroizing::new(raw.to_vec())
        } else {
            let text = std::str::from_utf8(raw)
                .map_err(|_| OperatorError::SigningKey("operator key is neither 32 raw bytes nor hex text".to_string()))?;
            let trimmed = text.trim();
            let hex_part = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed);
            Zeroizing::new(
                hex::decode(hex_part).map_err(|err| OperatorError::SigningKey(format!("operator key hex decode failed: {}", err)))?,
            )
        };
        let secret = SecretKey::from_slice(&key_bytes)?;
        Ok(Self::from_secret_key(secret))
    }

    pub async fn load(store: &dyn SecretStore) -> Result<Self, OperatorError> {
        let name = SecretName::operator_key();
        let secret = store.get(&name).await?;
        let identity = Self::from_secret_bytes(&secret)?;
        log::info!("operator identity loaded backend={} address={}", store.backend(), identity.address);
        Ok(identity)
    }

    /// Fresh random identity. Intended for tests and local devnets.
    pub fn random() -> Self {
        Self::from_secret_key(SecretKey::new(&mut secp256k1::rand::thread_rng()))
    }

    fn from_secret_key(secret: SecretKey) -> Self {
        let public = PublicKey::from_secret_key(SECP256K1, &secret);
        let address = evm_address_from_uncompressed(&public.serialize_uncompressed());
        Self { secret, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Signs `digest` as-is (no prefixing or re-hashing) and returns `r || s || v` with `v` in {27, 28}.
    pub fn sign_digest(&self, digest: &B256) -> Result<Bytes, OperatorError> {
        let msg = Message::from_digest(digest.0);
        let signature = SECP256K1.sign_ecdsa_recoverable(&msg, &self.secret);
        let (rec_id, compact) = signature.serialize_compact();
        let v = u8::try_from(rec_id.to_i32())
            .map_err(|_| OperatorError::SigningKey(format!("unexpected recovery id {}", rec_id.to_i32())))?;
        let mut out = Vec::with_capacity(SIGNATURE_LEN);
        out.extend_from_slice(&compact);
        out.push(v + EVM_RECOVERY_OFFSET);
        Ok(Bytes::from(out))
    }

    /// Local signer used by the ledger client to sign outgoing transactions.
    pub fn tx_signer(&self) -> Result<PrivateKeySigner, OperatorError> {
        let bytes = Zeroizing::new(self.secret.secret_bytes());
        PrivateKeySigner::from_slice(bytes.as_slice()).map_err(|err| OperatorError::SigningKey(err.to_string()))
    }
}

impl fmt::Debug for OperatorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorIdentity").field("address", &self.address).field("secret", &"[REDACTED]").finish()
    }
}

/// Recovers the EVM address that produced `signature` (`r || s || v`) over `digest`.
pub fn recover_address(digest: &B256, signature: &[u8]) -> Result<Address, OperatorError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(OperatorError::EncodingError(format!(
            "signature must be {} bytes, got {}",
            SIGNATURE_LEN,
            signature.len()
        )));
    }
    let v = signature[SIGNATURE_LEN - 1];
    let rec = if v >= EVM_RECOVERY_OFFSET { v - EVM_RECOVERY_OFFSET } else { v };
    let rec_id = RecoveryId::from_i32(i32::from(rec))
        .map_err(|err| OperatorError::EncodingError(format!("invalid recovery id v={}: {}", v, err)))?;
    let recoverable = RecoverableSignature::from_compact(&signature[..SIGNATURE_LEN - 1], rec_id)
        .map_err(|err| OperatorError::EncodingError(format!("invalid signature: {}", err)))?;
    let public = SECP256K1
        .recover_ecdsa(&Message::from_digest(digest.0), &recoverable)
        .map_err(|err| OperatorError::EncodingError(format!("signature recovery failed: {}", err)))?;
    Ok(evm_address_from_uncompressed(&public.serialize_uncompressed()))
}
