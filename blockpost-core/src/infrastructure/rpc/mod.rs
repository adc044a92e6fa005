//! Ledger access: the `LedgerClient` seam, its JSON-RPC implementation, contract bindings and an in-memory double.

use crate::foundation::{Nonce, OperatorError};
use alloy::primitives::{Address, Bytes, TxHash, B256};
use async_trait::async_trait;
use std::time::Duration;

pub mod alloy_client;
pub mod contracts;
pub mod mock;
pub mod retry;

pub use alloy_client::AlloyLedgerClient;
pub use mock::{MockLedger, ScriptedFailure};
pub use retry::{retry_transient, RetryPolicy};

/// A write call with an explicitly assigned sequence number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerTransaction {
    pub from: Address,
    pub to: Address,
    pub input: Bytes,
    pub nonce: Nonce,
}

/// Receipt summary for a mined transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// `false` when the transaction was mined but reverted.
    pub success: bool,
}

/// Inclusive block range query for logs of a single event at a single address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogQuery {
    pub address: Address,
    pub topic0: B256,
    pub from_block: u64,
    pub to_block: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<B256>,
    pub log_index: Option<u64>,
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current chain head.
    async fn block_number(&self) -> Result<u64, OperatorError>;

    /// Next sequence number for `account`, counting pending transactions.
    async fn pending_nonce(&self, account: Address) -> Result<Nonce, OperatorError>;

    /// Next sequence number for `account` as of the latest mined block.
    async fn confirmed_nonce(&self, account: Address) -> Result<Nonce, OperatorError>;

    /// Read-only contract call; returns the raw ABI-encoded result.
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, OperatorError>;

    /// Broadcast a write. The nonce in `tx` is used verbatim.
    async fn send_transaction(&self, tx: LedgerTransaction) -> Result<TxHash, OperatorError>;

    /// Wait until `tx_hash` is mined. Exceeding `timeout` yields `OperatorError::Timeout`.
    async fn wait_for_confirmation(&self, tx_hash: TxHash, timeout: Duration) -> Result<Confirmation, OperatorError>;

    /// Receipt of `tx_hash` if it has been mined, without waiting.
    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<Confirmation>, OperatorError>;

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<LedgerLog>, OperatorError>;
}

pub fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let (scheme, rest) = url.split_at(scheme_end + 3);
    let Some(at) = rest.find('@') else {
        return url.to_string();
    };
    format!("{scheme}<redacted>@{}", &rest[at + 1..])
}
