//! Raw bus frames and the identifiers used by the rectifier family.
//!
//! Every protocol message is exactly one extended-format CAN frame:
//!
//! | Field | Size | Description |
//! |-------|------|-------------|
//! | Identifier | 29 bits | Message type (extended frame format) |
//! | DLC | 0-8 | Number of meaningful payload bytes |
//! | Payload | 8 bytes | Unused trailing bytes are zero |
//!
//! # Example
//!
//! ```
//! use r48xx::{RawFrame, ID_TELEMETRY};
//!
//! let frame = RawFrame::new(ID_TELEMETRY | 0x8000_0000, 8, [0x01, 0x75, 0, 0, 0, 0, 0xD6, 0x00]);
//! assert_eq!(frame.id(), ID_TELEMETRY);
//! assert_eq!(frame.data(), &[0x01, 0x75, 0, 0, 0, 0, 0xD6, 0x00]);
//! ```

use crate::error::{R48xxError, Result};

/// Mask selecting the 29 identifier bits of an extended frame.
pub const EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;

/// Extended frame format flag as carried in the kernel's `can_id` word.
pub const EXTENDED_FRAME_FLAG: u32 = 0x8000_0000;

/// Payload size of a classic CAN frame.
pub const FRAME_PAYLOAD_SIZE: usize = 8;

/// Telemetry field report (one parameter code and value per frame).
pub const ID_TELEMETRY: u32 = 0x1081_407F;
/// Device description fragment.
pub const ID_DESCRIPTION: u32 = 0x1081_D27F;
/// Acknowledgment of a set command.
pub const ID_ACK: u32 = 0x1081_807E;
/// Outbound request for a fresh telemetry burst.
pub const ID_REQUEST_TELEMETRY: u32 = 0x1080_40FE;
/// Outbound voltage/current set command.
pub const ID_SET_COMMAND: u32 = 0x1081_80FE;
/// Energy counter broadcast (not decoded).
pub const ID_ENERGY_COUNTER: u32 = 0x1001_117E;
/// Status flags broadcast (not decoded).
pub const ID_STATUS: u32 = 0x1000_11FE;
/// Heartbeat (not decoded).
pub const ID_HEARTBEAT: u32 = 0x1081_11FE;
/// Auxiliary status report (not decoded).
pub const ID_AUX_STATUS: u32 = 0x1080_81FE;

/// One frame as received from, or handed to, the bus transport.
///
/// The identifier is always stored masked to 29 bits; outbound frames are
/// always sent in extended format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame {
    id: u32,
    len: u8,
    payload: [u8; FRAME_PAYLOAD_SIZE],
}

impl RawFrame {
    /// Creates a frame from a raw identifier word, DLC and payload.
    ///
    /// Flag bits above the 29-bit identifier are discarded and the length is
    /// clamped to 8.
    pub fn new(raw_id: u32, len: u8, payload: [u8; FRAME_PAYLOAD_SIZE]) -> Self {
        Self {
            id: raw_id & EXTENDED_ID_MASK,
            len: len.min(FRAME_PAYLOAD_SIZE as u8),
            payload,
        }
    }

    /// Creates a full 8-byte frame.
    pub fn full(id: u32, payload: [u8; FRAME_PAYLOAD_SIZE]) -> Self {
        Self::new(id, FRAME_PAYLOAD_SIZE as u8, payload)
    }

    /// Creates a frame from a variable-length slice, zero-filling the tail.
    ///
    /// # Errors
    ///
    /// Returns `R48xxError::InvalidFrame` if `data` is longer than 8 bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use r48xx::RawFrame;
    ///
    /// let frame = RawFrame::from_slice(0x1081807E, &[0x01, 0x00]).unwrap();
    /// assert_eq!(frame.len(), 2);
    /// assert_eq!(frame.payload(), &[0x01, 0x00, 0, 0, 0, 0, 0, 0]);
    ///
    /// assert!(RawFrame::from_slice(0x1081807E, &[0u8; 9]).is_err());
    /// ```
    pub fn from_slice(raw_id: u32, data: &[u8]) -> Result<Self> {
        if data.len() > FRAME_PAYLOAD_SIZE {
            return Err(R48xxError::invalid_frame(format!(
                "payload too long: expected at most {} bytes, got {}",
                FRAME_PAYLOAD_SIZE,
                data.len()
            )));
        }

        let mut payload = [0u8; FRAME_PAYLOAD_SIZE];
        payload[..data.len()].copy_from_slice(data);
        Ok(Self::new(raw_id, data.len() as u8, payload))
    }

    /// Returns the 29-bit identifier.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Returns the identifier word with the extended-frame flag set.
    pub fn id_word(&self) -> u32 {
        self.id | EXTENDED_FRAME_FLAG
    }

    /// Returns the data length code.
    pub fn len(&self) -> u8 {
        self.len
    }

    /// Returns whether the frame carries no data bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the full zero-padded payload.
    pub fn payload(&self) -> &[u8; FRAME_PAYLOAD_SIZE] {
        &self.payload
    }

    /// Returns only the meaningful payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.payload[..self.len as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_masks_flags() {
        let frame = RawFrame::new(ID_TELEMETRY | EXTENDED_FRAME_FLAG, 8, [0; 8]);
        assert_eq!(frame.id(), ID_TELEMETRY);
        assert_eq!(frame.id_word(), 0x9081_407F);
    }

    #[test]
    fn test_new_clamps_length() {
        let frame = RawFrame::new(ID_ACK, 15, [0; 8]);
        assert_eq!(frame.len(), 8);
        assert_eq!(frame.data().len(), 8);
    }

    #[test]
    fn test_from_slice_pads() {
        let frame = RawFrame::from_slice(ID_DESCRIPTION, &[0xAA, 0xBB, 0xCC]).unwrap();
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.data(), &[0xAA, 0xBB, 0xCC]);
        assert_eq!(frame.payload(), &[0xAA, 0xBB, 0xCC, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_from_slice_empty() {
        let frame = RawFrame::from_slice(ID_HEARTBEAT, &[]).unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame.payload(), &[0; 8]);
    }

    #[test]
    fn test_from_slice_too_long() {
        let result = RawFrame::from_slice(ID_ACK, &[0u8; 12]);
        assert!(matches!(result, Err(R48xxError::InvalidFrame { .. })));
    }

    #[test]
    fn test_identifiers_fit_29_bits() {
        for id in [
            ID_TELEMETRY,
            ID_DESCRIPTION,
            ID_ACK,
            ID_REQUEST_TELEMETRY,
            ID_SET_COMMAND,
            ID_ENERGY_COUNTER,
            ID_STATUS,
            ID_HEARTBEAT,
            ID_AUX_STATUS,
        ] {
            assert_eq!(id & EXTENDED_ID_MASK, id);
        }
    }
}
