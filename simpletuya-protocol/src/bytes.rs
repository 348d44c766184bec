//! Big-endian integer helpers
//!
//! Every multi-byte field on the wire (data length, value length, Int values)
//! is big-endian. Widths are at most 4 bytes.

use heapless::Vec;

/// Widest integer field on the wire
pub const MAX_WIDTH: usize = 4;

/// Read a `width`-byte big-endian unsigned integer from the start of `bytes`.
///
/// `width` is clamped to [`MAX_WIDTH`] and to the length of `bytes`.
pub fn bytes_to_unsigned(bytes: &[u8], width: usize) -> u32 {
    let width = width.min(MAX_WIDTH).min(bytes.len());
    bytes[..width]
        .iter()
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

/// Write `value` as `width` big-endian bytes, dropping high bits that do not fit.
pub fn unsigned_to_bytes(value: u32, width: usize) -> Vec<u8, MAX_WIDTH> {
    let width = width.min(MAX_WIDTH);
    let full = value.to_be_bytes();
    // Cannot fail: width <= MAX_WIDTH
    Vec::from_slice(&full[MAX_WIDTH - width..]).unwrap_or_default()
}

/// Read a big-endian u16 length field
#[inline]
pub fn read_u16(bytes: &[u8]) -> u16 {
    bytes_to_unsigned(bytes, 2) as u16
}

/// Encode a u16 length field
#[inline]
pub const fn u16_bytes(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_unsigned() {
        assert_eq!(bytes_to_unsigned(&[0x00, 0x08], 2), 8);
        assert_eq!(bytes_to_unsigned(&[0x55, 0xAA], 2), 0x55AA);
        assert_eq!(bytes_to_unsigned(&[0x00, 0x00, 0x00, 0x3B], 4), 59);
        assert_eq!(bytes_to_unsigned(&[0x7C], 1), 0x7C);
    }

    #[test]
    fn test_only_width_bytes_are_read() {
        assert_eq!(bytes_to_unsigned(&[0x01, 0x02, 0xFF, 0xFF], 2), 0x0102);
    }

    #[test]
    fn test_unsigned_to_bytes_truncates() {
        assert_eq!(unsigned_to_bytes(0x1234_5678, 2).as_slice(), &[0x56, 0x78]);
        assert_eq!(unsigned_to_bytes(0x1FF, 1).as_slice(), &[0xFF]);
        assert_eq!(
            unsigned_to_bytes(256, 4).as_slice(),
            &[0x00, 0x00, 0x01, 0x00]
        );
    }

    #[test]
    fn test_width_roundtrip() {
        for (value, width) in [(0u32, 1usize), (0xAB, 1), (0xBEEF, 2), (0x00C0_FFEE, 3), (u32::MAX, 4)] {
            let bytes = unsigned_to_bytes(value, width);
            assert_eq!(bytes.len(), width);
            assert_eq!(bytes_to_unsigned(&bytes, width), value);
        }
    }

    #[test]
    fn test_u16_helpers() {
        assert_eq!(u16_bytes(0x0105), [0x01, 0x05]);
        assert_eq!(read_u16(&u16_bytes(505)), 505);
    }
}
