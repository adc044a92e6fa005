//! Maps raw node/contract failure text onto the operator's error taxonomy.
//!
//! JSON-RPC nodes report nonce problems, reverts and network trouble as free-form strings, so
//! classification is marker based. Markers are matched case-insensitively.

use crate::foundation::OperatorError;
use alloy::primitives::keccak256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerFailure {
    /// The ledger already holds the intended effect.
    Duplicate,
    /// The sequence number was stale or already used.
    SequenceConflict,
    /// Network trouble or an overloaded node.
    Transient,
    /// Anything else the ledger refused.
    Rejected,
}

const DUPLICATE_MARKERS: &[&str] = &[
    "already responded",
    "already registered",
    "operatoralreadyregistered",
    "already recorded",
    "already an operator",
];

const SEQUENCE_MARKERS: &[&str] = &[
    "nonce too low",
    "nonce too high",
    "invalid nonce",
    "nonce has already been used",
    "noncetoolow",
    "replacement transaction underpriced",
    "already known",
];

const TRANSIENT_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "connection refused",
    "connection reset",
    "connection closed",
    "error sending request",
    "temporarily unavailable",
    "service unavailable",
    "bad gateway",
    "too many requests",
    "rate limit",
    "broken pipe",
    "unexpected eof",
    "http error 429",
    "http error 502",
    "http error 503",
    "http error 504",
];

/// Hex selector of `error OperatorAlreadyRegistered()`, as it appears in revert data.
pub fn operator_already_registered_selector() -> String {
    hex::encode(&keccak256(b"OperatorAlreadyRegistered()")[..4])
}

pub fn classify_ledger_failure(message: &str) -> LedgerFailure {
    let lowered = message.to_ascii_lowercase();
    if DUPLICATE_MARKERS.iter().any(|m| lowered.contains(m)) || lowered.contains(&operator_already_registered_selector()) {
        return LedgerFailure::Duplicate;
    }
    if SEQUENCE_MARKERS.iter().any(|m| lowered.contains(m)) {
        return LedgerFailure::SequenceConflict;
    }
    if TRANSIENT_MARKERS.iter().any(|m| lowered.contains(m)) {
        return LedgerFailure::Transient;
    }
    LedgerFailure::Rejected
}

/// Builds the typed error for a failed ledger `operation` from the node's message.
pub fn ledger_error(operation: &str, message: impl Into<String>) -> OperatorError {
    let message = message.into();
    match classify_ledger_failure(&message) {
        LedgerFailure::Duplicate => OperatorError::AlreadyRecorded { operation: operation.to_string(), details: message },
        LedgerFailure::SequenceConflict => OperatorError::SequenceConflict { operation: operation.to_string(), details: message },
        LedgerFailure::Transient => OperatorError::Transport { operation: operation.to_string(), details: message },
        LedgerFailure::Rejected => OperatorError::Rejected { operation: operation.to_string(), reason: message },
    }
}
