//! Acknowledgment decoding.
//!
//! The module answers every set command with a frame on
//! [`ID_ACK`](crate::ID_ACK) that echoes the command's sub-code and value.
//!
//! # Acknowledgment Payload
//!
//! | Byte | Description |
//! |------|-------------|
//! | 0 | Status; bit 0x20 set means the command was rejected |
//! | 1 | Echoed sub-code |
//! | 2-3 | Unused |
//! | 4-7 | Echoed value, big-endian 32-bit integer |
//!
//! # Example
//!
//! ```
//! use r48xx::{AckInterpreter, AckTarget, CurrentScale};
//!
//! let acks = AckInterpreter::new(CurrentScale::new(30.0).unwrap());
//! let outcome = acks.decode_ack(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xD6, 0x00]);
//! assert_eq!(outcome.target, AckTarget::TempVoltage);
//! assert!(outcome.success);
//! assert_eq!(outcome.value, 53.5);
//! ```

use crate::codec::{
    SUB_CURRENT_OFFLINE, SUB_CURRENT_ONLINE, SUB_OVERVOLTAGE_PROTECTION, SUB_VOLTAGE_OFFLINE,
    SUB_VOLTAGE_ONLINE,
};
use crate::frame::FRAME_PAYLOAD_SIZE;
use crate::parameter::{CurrentScale, VOLTAGE_SCALE};
use crate::utils::{scale_wire_value, wire_value};

/// Status bit signalling a rejected command.
pub const ACK_ERROR_BIT: u8 = 0x20;

/// Setting an acknowledgment refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum AckTarget {
    /// On-line (volatile) output voltage.
    TempVoltage,
    /// Off-line (non-volatile) output voltage.
    DefaultVoltage,
    /// Overvoltage protection threshold.
    OvervoltageProtection,
    /// On-line (volatile) maximum output current.
    TempCurrent,
    /// Off-line (non-volatile) maximum output current.
    DefaultCurrent,
    /// Any other sub-code.
    Unknown(u8),
}

impl AckTarget {
    /// Maps an echoed sub-code to its target.
    pub fn from_sub_code(code: u8) -> Self {
        match code {
            SUB_VOLTAGE_ONLINE => Self::TempVoltage,
            SUB_VOLTAGE_OFFLINE => Self::DefaultVoltage,
            SUB_OVERVOLTAGE_PROTECTION => Self::OvervoltageProtection,
            SUB_CURRENT_ONLINE => Self::TempCurrent,
            SUB_CURRENT_OFFLINE => Self::DefaultCurrent,
            other => Self::Unknown(other),
        }
    }

    /// Returns whether the echoed value is a current.
    pub fn is_current(self) -> bool {
        matches!(self, Self::TempCurrent | Self::DefaultCurrent)
    }

    fn unit(self) -> &'static str {
        if self.is_current() {
            "A"
        } else {
            "V"
        }
    }
}

impl std::fmt::Display for AckTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TempVoltage => write!(f, "on-line voltage"),
            Self::DefaultVoltage => write!(f, "non-volatile (off-line) voltage"),
            Self::OvervoltageProtection => write!(f, "overvoltage protection"),
            Self::TempCurrent => write!(f, "on-line current"),
            Self::DefaultCurrent => write!(f, "non-volatile (off-line) current"),
            Self::Unknown(code) => write!(f, "unknown parameter (0x{:02X})", code),
        }
    }
}

/// Decoded acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AckOutcome {
    /// Setting the acknowledgment refers to.
    pub target: AckTarget,
    /// Whether the module accepted the command.
    pub success: bool,
    /// Echoed value in engineering units.
    pub value: f32,
}

impl std::fmt::Display for AckOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.success { "Success" } else { "Error" };
        match self.target {
            AckTarget::Unknown(_) => write!(f, "{} setting {}", status, self.target),
            target => write!(
                f,
                "{} setting {} to {:.2}{}",
                status,
                target,
                self.value,
                target.unit()
            ),
        }
    }
}

/// Decoder for acknowledgment frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AckInterpreter {
    current_scale: CurrentScale,
}

impl AckInterpreter {
    /// Creates an interpreter using the given current divisor.
    pub fn new(current_scale: CurrentScale) -> Self {
        Self { current_scale }
    }

    /// Decodes an acknowledgment payload.
    ///
    /// Current targets are scaled by the current divisor; every other target,
    /// including unknown ones, by 1024.
    pub fn decode_ack(&self, payload: &[u8; FRAME_PAYLOAD_SIZE]) -> AckOutcome {
        let target = AckTarget::from_sub_code(payload[1]);
        let divisor = if target.is_current() {
            self.current_scale.divisor()
        } else {
            VOLTAGE_SCALE
        };

        AckOutcome {
            target,
            success: payload[0] & ACK_ERROR_BIT == 0,
            value: scale_wire_value(wire_value(payload), divisor),
        }
    }
}
