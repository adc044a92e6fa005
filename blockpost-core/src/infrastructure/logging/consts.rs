/// Main operator log file.
pub const LOG_FILE_NAME: &str = "blockpost.log";
/// Warn+error only.
pub const ERR_LOG_FILE_NAME: &str = "blockpost_err.log";

/// Console pattern: `timestamp [LEVEL] message [module] [thread-id]`.
pub const LOG_LINE_PATTERN_COLORED: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{h({l:5})}] {m} [{M}] [{I}]{n}";

pub const LOG_LINE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l:5}] {m} [{M}] [{I}]{n}";

/// Rotate at 50 MB.
pub const LOG_FILE_MAX_SIZE: u64 = 50_000_000;

pub const LOG_FILE_MAX_ROLLS: u32 = 5;

/// Crates logged at the requested app level; everything else is off unless opted in.
pub const WHITELISTED_CRATES: &[&str] = &["blockpost_core", "blockpost_service", "blockpost_operator"];
