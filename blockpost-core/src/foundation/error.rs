use secp256k1::Error as SecpError;
use std::io;
use thiserror::Error;

/// How a failure should be handled by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Process-terminating: bad configuration, unusable key, irrecoverable registration.
    Fatal,
    /// Dropped for this request only; logged and the pending entry released.
    Terminal,
    /// Network or timeout failure; retried with backoff up to a cap.
    Transient,
    /// The ledger rejected the sequence number; re-acquire and resubmit.
    SequenceConflict,
    /// The ledger already holds the intended effect ("already registered", "already responded").
    IdempotentSuccess,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorClass::Fatal => "fatal",
            ErrorClass::Terminal => "terminal",
            ErrorClass::Transient => "transient",
            ErrorClass::SequenceConflict => "sequence_conflict",
            ErrorClass::IdempotentSuccess => "idempotent_success",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum OperatorError {
    // === Configuration / startup ===
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("missing required configuration: {field}")]
    MissingConfig { field: String },

    #[error("secret not found: {name} (backend: {backend})")]
    SecretNotFound { name: String, backend: String },

    #[error("secret decode failed: {name} (encoding: {encoding}): {details}")]
    SecretDecodeFailed { name: String, encoding: String, details: String },

    #[error("signing key error: {0}")]
    SigningKey(String),

    // === Ledger interaction ===
    #[error("ledger transport error during {operation}: {details}")]
    Transport { operation: String, details: String },

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("malformed ledger response for {operation}: {details}")]
    MalformedResponse { operation: String, details: String },

    #[error("sequence number conflict during {operation}: {details}")]
    SequenceConflict { operation: String, details: String },

    #[error("{operation} rejected by ledger: {reason}")]
    Rejected { operation: String, reason: String },

    #[error("transaction reverted tx_hash={tx_hash}")]
    Reverted { tx_hash: String },

    #[error("{operation} already recorded on ledger: {details}")]
    AlreadyRecorded { operation: String, details: String },

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { operation: String, attempts: u32, last_error: String },

    // === Registration ===
    #[error("operator registration failed: {0}")]
    Registration(String),

    // === Plumbing ===
    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("io error during {operation}: {details}")]
    Io { operation: String, details: String },

    #[error("shutdown requested")]
    Shutdown,

    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, OperatorError>;

impl OperatorError {
    pub fn class(&self) -> ErrorClass {
        match self {
            OperatorError::ConfigError(_)
            | OperatorError::MissingConfig { .. }
            | OperatorError::SecretNotFound { .. }
            | OperatorError::SecretDecodeFailed { .. }
            | OperatorError::SigningKey(_)
            | OperatorError::MalformedResponse { .. }
            | OperatorError::Registration(_)
            | OperatorError::Io { .. } => ErrorClass::Fatal,
            OperatorError::Transport { .. } | OperatorError::Timeout { .. } | OperatorError::RetriesExhausted { .. } => {
                ErrorClass::Transient
            }
            OperatorError::SequenceConflict { .. } => ErrorClass::SequenceConflict,
            OperatorError::AlreadyRecorded { .. } => ErrorClass::IdempotentSuccess,
            OperatorError::Rejected { .. }
            | OperatorError::Reverted { .. }
            | OperatorError::EncodingError(_)
            | OperatorError::Shutdown
            | OperatorError::Message(_) => ErrorClass::Terminal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Fatal
    }

    pub fn transport(operation: impl Into<String>, details: impl ToString) -> Self {
        OperatorError::Transport { operation: operation.into(), details: details.to_string() }
    }

    pub fn malformed(operation: impl Into<String>, details: impl Into<String>) -> Self {
        OperatorError::MalformedResponse { operation: operation.into(), details: details.into() }
    }

    pub fn rejected(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        OperatorError::Rejected { operation: operation.into(), reason: reason.into() }
    }

    pub fn secret_not_found(name: impl Into<String>, backend: impl Into<String>) -> Self {
        OperatorError::SecretNotFound { name: name.into(), backend: backend.into() }
    }

    pub fn secret_decode_failed(name: impl Into<String>, encoding: impl Into<String>, details: impl Into<String>) -> Self {
        OperatorError::SecretDecodeFailed { name: name.into(), encoding: encoding.into(), details: details.into() }
    }

    pub fn io(operation: impl Into<String>, err: io::Error) -> Self {
        OperatorError::Io { operation: operation.into(), details: err.to_string() }
    }
}

impl From<hex::FromHexError> for OperatorError {
    fn from(err: hex::FromHexError) -> Self {
        OperatorError::EncodingError(format!("hex decode error: {}", err))
    }
}

impl From<figment::Error> for OperatorError {
    fn from(err: figment::Error) -> Self {
        OperatorError::ConfigError(format!("config extraction failed: {}", err))
    }
}

impl From<SecpError> for OperatorError {
    fn from(err: SecpError) -> Self {
        OperatorError::SigningKey(err.to_string())
    }
}

impl From<io::Error> for OperatorError {
    fn from(err: io::Error) -> Self {
        OperatorError::Io { operation: "io".to_string(), details: err.to_string() }
    }
}
