use std::fmt;

/// Hex formatter for arbitrary bytes in EVM notation.
///
/// - `Display` (`{}`) prints `0x`-prefixed lowercase hex.
/// - Alternate `Display` (`{:#}`) abbreviates payloads longer than 8 bytes to `0x1234abcd…ef01`.
#[derive(Clone, Copy)]
pub struct HexBytes<'a>(pub &'a [u8]);

pub fn hx(bytes: &[u8]) -> HexBytes<'_> {
    HexBytes(bytes)
}

fn write_hex(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for b in bytes {
        write!(f, "{:02x}", b)?;
    }
    Ok(())
}

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        if f.alternate() && self.0.len() > 8 {
            write_hex(&self.0[..4], f)?;
            f.write_str("…")?;
            return write_hex(&self.0[self.0.len() - 2..], f);
        }
        write_hex(self.0, f)
    }
}

impl fmt::Debug for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
