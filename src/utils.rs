//! Wire value helpers and diagnostic formatting.
//!
//! # Example
//!
//! ```
//! use r48xx::RawFrame;
//! use r48xx::utils::{format_description, format_frame, wire_value};
//!
//! let payload = [0x01, 0x75, 0x00, 0x00, 0x00, 0x00, 0xD6, 0x00];
//! assert_eq!(wire_value(&payload), 54_784);
//!
//! let frame = RawFrame::full(0x1081407F, payload);
//! assert_eq!(format_frame(&frame), "0x1081407F [8] 01 75 00 00 00 00 D6 00");
//!
//! assert_eq!(format_description(b"R48\x0050"), "R48.50");
//! ```

use std::fmt::Write as _;

use crate::frame::{RawFrame, FRAME_PAYLOAD_SIZE};

/// Reads the 32-bit value carried in bytes 4..8.
///
/// The module sends it most significant byte first.
#[inline]
pub fn wire_value(payload: &[u8; FRAME_PAYLOAD_SIZE]) -> u32 {
    u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]])
}

/// Converts a wire integer to engineering units.
#[inline]
pub fn scale_wire_value(raw: u32, divisor: f32) -> f32 {
    (f64::from(raw) / f64::from(divisor)) as f32
}

/// Formats a frame as identifier, length and data bytes in hex.
pub fn format_frame(frame: &RawFrame) -> String {
    let mut out = format!("0x{:08X} [{}]", frame.id(), frame.len());
    for byte in frame.data() {
        let _ = write!(out, " {:02X}", byte);
    }
    out
}

/// Renders description bytes, replacing non-printable bytes with `.`.
pub fn format_description(text: &[u8]) -> String {
    text.iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_value_big_endian() {
        let payload = [0xAA, 0xBB, 0xCC, 0xDD, 0x12, 0x34, 0x56, 0x78];
        assert_eq!(wire_value(&payload), 0x1234_5678);
    }

    #[test]
    fn test_wire_value_matches_byteswap() {
        let payload = [0, 0, 0, 0, 0x00, 0x00, 0x28, 0x00];
        let native = u32::from_ne_bytes([payload[4], payload[5], payload[6], payload[7]]);
        let expected = if cfg!(target_endian = "little") {
            native.swap_bytes()
        } else {
            native
        };
        assert_eq!(wire_value(&payload), expected);
        assert_eq!(wire_value(&payload), 10_240);
    }

    #[test]
    fn test_scale_wire_value() {
        assert_eq!(scale_wire_value(54_784, 1024.0), 53.5);
        assert_eq!(scale_wire_value(300, 30.0), 10.0);
        assert_eq!(scale_wire_value(0, 22.0), 0.0);
        assert_eq!(scale_wire_value(u32::MAX, 1024.0), 4_194_304.0);
    }

    #[test]
    fn test_format_frame_uses_dlc() {
        let frame = RawFrame::from_slice(0x100011FE, &[0x01, 0x02]).unwrap();
        assert_eq!(format_frame(&frame), "0x100011FE [2] 01 02");

        let empty = RawFrame::from_slice(0x0000_0123, &[]).unwrap();
        assert_eq!(format_frame(&empty), "0x00000123 [0]");
    }

    #[test]
    fn test_format_description() {
        assert_eq!(format_description(b"R4850G"), "R4850G");
        assert_eq!(format_description(&[0x00, b'A', 0xFF, b' ']), ".A. ");
    }
}
