//! Domain layer: request/response model, digests, registration payloads and ledger failure classification.
//!
//! Nothing in here performs I/O.

pub mod classify;
pub mod hashes;
pub mod registration;
pub mod request;

pub use classify::{classify_ledger_failure, LedgerFailure};
pub use hashes::{evm_address_from_uncompressed, response_digest, response_signing_hash};
pub use registration::{OperatorSignature, RegistrationParams};
pub use request::{Request, RequestEvent, Response};
