use serde::{Deserialize, Serialize};
use std::fmt;

/// On-chain request identifier (`uint32 requestId` in the service manager).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Ord, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RequestId(u32);

impl RequestId {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for RequestId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<RequestId> for u32 {
    fn from(value: RequestId) -> Self {
        value.0
    }
}

/// Per-account transaction sequence number.
pub type Nonce = u64;
