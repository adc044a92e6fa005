use crate::foundation::RequestId;
use alloy::primitives::{Bytes, B256};
use serde::{Deserialize, Serialize};

/// A work request as emitted by `MessageRequestCreated`. Immutable once observed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub block_number: u32,
    pub message: String,
}

impl Request {
    pub fn new(id: impl Into<RequestId>, block_number: u32, message: impl Into<String>) -> Self {
        Self { id: id.into(), block_number, message: message.into() }
    }
}

/// A decoded request together with where it was observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestEvent {
    pub request: Request,
    pub observed_block: u64,
    pub tx_hash: Option<B256>,
    pub log_index: Option<u64>,
}

impl RequestEvent {
    pub fn new(request: Request, observed_block: u64) -> Self {
        Self { request, observed_block, tx_hash: None, log_index: None }
    }

    pub fn request_id(&self) -> RequestId {
        self.request.id
    }
}

/// The signed answer submitted back to the service manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub request_id: RequestId,
    pub block_number: u32,
    pub message: String,
    pub signature: Bytes,
}

impl Response {
    pub fn for_request(request: &Request, signature: Bytes) -> Self {
        Self { request_id: request.id, block_number: request.block_number, message: request.message.clone(), signature }
    }
}
