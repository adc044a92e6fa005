use crate::domain::{response_signing_hash, Request, Response};
use crate::foundation::OperatorError;
use crate::infrastructure::keys::{recover_address, OperatorIdentity};
use alloy::primitives::Address;
use log::trace;
use std::sync::Arc;

/// Signs requests with the operator key.
///
/// The signature covers the EIP-191 personal-message hash of `keccak256(message)`, which is what
/// the service manager recovers against the caller.
#[derive(Clone)]
pub struct ResponseSigner {
    identity: Arc<OperatorIdentity>,
}

impl ResponseSigner {
    pub fn new(identity: Arc<OperatorIdentity>) -> Self {
        Self { identity }
    }

    pub fn operator(&self) -> Address {
        self.identity.address()
    }

    pub fn sign(&self, request: &Request) -> Result<Response, OperatorError> {
        let hash = response_signing_hash(&request.message);
        let signature = self.identity.sign_digest(&hash)?;
        trace!("response signature computed request_id={} hash={}", request.id, hash);
        Ok(Response::for_request(request, signature))
    }
}

/// True when `signature` over `message` recovers to `expected`.
pub fn verify_response_signature(message: &str, signature: &[u8], expected: Address) -> Result<bool, OperatorError> {
    Ok(recover_address(&response_signing_hash(message), signature)? == expected)
}
