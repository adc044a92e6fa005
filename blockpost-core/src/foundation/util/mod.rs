pub mod hex_fmt;
pub mod time;

pub use hex_fmt::{hx, HexBytes};
pub use time::now_secs;
