//! System-wide constants for the Blockpost operator.

/// Default lifetime of a registration signature (one hour).
///
/// The directory rejects signatures whose expiry has passed, so the window only
/// needs to cover the registration round trip.
pub const DEFAULT_REGISTRATION_EXPIRY_SECS: u64 = 60 * 60;

/// Length of the registration salt in bytes.
pub const REGISTRATION_SALT_LEN: usize = 32;

/// Length of an `r || s || v` secp256k1 signature.
pub const SIGNATURE_LEN: usize = 65;

/// Length of a single ABI word.
pub const ABI_WORD_LEN: usize = 32;

/// Offset added to the recovery id to form the EVM `v` value.
pub const EVM_RECOVERY_OFFSET: u8 = 27;

/// Upper bound on remembered completed request ids.
pub const DEFAULT_COMPLETED_CAPACITY: usize = 10_000;

/// Environment variable that pins "now" for deterministic expiry in tests.
pub const TEST_NOW_SECS_ENV_VAR: &str = "BLOCKPOST_TEST_NOW_SECS";
