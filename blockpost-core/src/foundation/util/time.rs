use crate::foundation::constants::TEST_NOW_SECS_ENV_VAR;
use crate::foundation::OperatorError;
use std::time::{SystemTime, UNIX_EPOCH};

fn unix_now_secs() -> Result<u64, OperatorError> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|err| OperatorError::Message(format!("system clock before unix epoch: {}", err)))?;
    Ok(now.as_secs())
}

/// Wall-clock seconds, used for registration expiries.
///
/// `BLOCKPOST_TEST_NOW_SECS` pins the value when set to an integer.
pub fn now_secs() -> u64 {
    let pinned = std::env::var(TEST_NOW_SECS_ENV_VAR).ok().and_then(|value| value.trim().parse::<u64>().ok());
    pinned.or_else(|| unix_now_secs().ok()).unwrap_or(0)
}
