//! Frame encoding and decoding.
//!
//! This module turns received payloads into typed [`DecodedEvent`]s and typed
//! [`Command`]s into outbound [`RawFrame`]s. All functions are pure and
//! operate on the fixed 8-byte payload.
//!
//! # Telemetry Payload
//!
//! | Byte | Description |
//! |------|-------------|
//! | 0 | Unused by the decoder |
//! | 1 | Parameter code |
//! | 2-3 | Unused by the decoder |
//! | 4-7 | Value, big-endian 32-bit integer |
//!
//! # Set Command Payload
//!
//! | Byte | Description |
//! |------|-------------|
//! | 0 | Always 0x01 |
//! | 1 | Sub-code (0x00/0x01 voltage, 0x03/0x04 current) |
//! | 2-5 | Zero |
//! | 6-7 | Scaled value, big-endian 16-bit |
//!
//! # Example
//!
//! ```
//! use r48xx::{Command, CurrentScale, DecodedEvent, FieldSlot, FrameCodec, ID_SET_COMMAND};
//!
//! let codec = FrameCodec::new(CurrentScale::new(30.0).unwrap());
//!
//! let event = codec.decode_telemetry(&[0x01, 0x75, 0x00, 0x00, 0x00, 0x00, 0xD6, 0x00]);
//! assert_eq!(event, DecodedEvent::Telemetry { field: FieldSlot::OutputVoltage, value: 53.5 });
//!
//! let frame = codec.encode(Command::set_voltage(53.5, false).unwrap());
//! assert_eq!(frame.id(), ID_SET_COMMAND);
//! assert_eq!(frame.payload(), &[0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0xD6, 0x00]);
//! ```

use crate::error::{R48xxError, Result};
use crate::frame::{RawFrame, FRAME_PAYLOAD_SIZE, ID_REQUEST_TELEMETRY, ID_SET_COMMAND};
use crate::parameter::{CurrentScale, FieldSlot, ParameterTable, VOLTAGE_SCALE};
use crate::utils::{scale_wire_value, wire_value};

/// First payload byte of every set command.
pub(crate) const SET_COMMAND_MARKER: u8 = 0x01;
/// Set on-line (volatile) output voltage.
pub(crate) const SUB_VOLTAGE_ONLINE: u8 = 0x00;
/// Set off-line (non-volatile) output voltage.
pub(crate) const SUB_VOLTAGE_OFFLINE: u8 = 0x01;
/// Overvoltage protection threshold (acknowledged only).
pub(crate) const SUB_OVERVOLTAGE_PROTECTION: u8 = 0x02;
/// Set on-line (volatile) maximum output current.
pub(crate) const SUB_CURRENT_ONLINE: u8 = 0x03;
/// Set off-line (non-volatile) maximum output current.
pub(crate) const SUB_CURRENT_OFFLINE: u8 = 0x04;

/// Largest scaled integer a set command can carry.
pub const MAX_SCALED_SETPOINT: f32 = u16::MAX as f32;

/// Outbound command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Ask the module for a fresh telemetry burst.
    RequestTelemetry,
    /// Set the output voltage.
    SetVoltage {
        /// Volts.
        value: f32,
        /// Store in non-volatile memory instead of the running setting.
        persistent: bool,
    },
    /// Set the maximum output current.
    SetCurrent {
        /// Amperes.
        value: f32,
        /// Store in non-volatile memory instead of the running setting.
        persistent: bool,
    },
}

impl Command {
    /// Creates a validated voltage set-point.
    ///
    /// # Errors
    ///
    /// Returns `R48xxError::InvalidParameter` if the scaled value does not fit
    /// the 16-bit wire field.
    ///
    /// # Example
    ///
    /// ```
    /// use r48xx::Command;
    ///
    /// assert!(Command::set_voltage(53.5, false).is_ok());
    /// assert!(Command::set_voltage(64.0, true).is_err());
    /// assert!(Command::set_voltage(-1.0, false).is_err());
    /// ```
    pub fn set_voltage(value: f32, persistent: bool) -> Result<Self> {
        check_setpoint("voltage", value, VOLTAGE_SCALE)?;
        Ok(Self::SetVoltage { value, persistent })
    }

    /// Creates a validated maximum-current set-point.
    ///
    /// # Errors
    ///
    /// Returns `R48xxError::InvalidParameter` if the scaled value does not fit
    /// the 16-bit wire field.
    ///
    /// # Example
    ///
    /// ```
    /// use r48xx::{Command, CurrentScale};
    ///
    /// let scale = CurrentScale::new(30.0).unwrap();
    /// assert!(Command::set_current(10.0, false, scale).is_ok());
    /// assert!(Command::set_current(5000.0, false, scale).is_err());
    /// ```
    pub fn set_current(value: f32, persistent: bool, scale: CurrentScale) -> Result<Self> {
        check_setpoint("current", value, scale.divisor())?;
        Ok(Self::SetCurrent { value, persistent })
    }

    /// Returns the outbound sub-code, or `None` for telemetry requests.
    pub fn sub_code(&self) -> Option<u8> {
        match *self {
            Command::RequestTelemetry => None,
            Command::SetVoltage { persistent, .. } => Some(if persistent {
                SUB_VOLTAGE_OFFLINE
            } else {
                SUB_VOLTAGE_ONLINE
            }),
            Command::SetCurrent { persistent, .. } => Some(if persistent {
                SUB_CURRENT_OFFLINE
            } else {
                SUB_CURRENT_ONLINE
            }),
        }
    }
}

fn check_setpoint(parameter: &str, value: f32, divisor: f32) -> Result<()> {
    let scaled = (value * divisor).round();
    if !scaled.is_finite() || !(0.0..=MAX_SCALED_SETPOINT).contains(&scaled) {
        return Err(R48xxError::invalid_parameter(
            parameter,
            format!(
                "{} scales to {}, outside 0..={}",
                value, scaled, MAX_SCALED_SETPOINT
            ),
        ));
    }
    Ok(())
}

/// Result of decoding one telemetry field report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodedEvent {
    /// A measurement for one snapshot slot.
    Telemetry {
        /// Destination slot.
        field: FieldSlot,
        /// Value in engineering units.
        value: f32,
    },
    /// A reserved or unknown parameter code.
    Ignored {
        /// The parameter code byte.
        code: u8,
    },
}

/// Stateless codec for telemetry and command frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameCodec {
    table: ParameterTable,
}

impl FrameCodec {
    /// Creates a codec using the given max-output-current divisor.
    pub fn new(current_scale: CurrentScale) -> Self {
        Self {
            table: ParameterTable::new(current_scale),
        }
    }

    /// Returns the parameter table in use.
    pub fn table(&self) -> &ParameterTable {
        &self.table
    }

    /// Decodes a telemetry field report.
    pub fn decode_telemetry(&self, payload: &[u8; FRAME_PAYLOAD_SIZE]) -> DecodedEvent {
        let code = payload[1];
        match self.table.lookup(code) {
            Some((field, divisor)) => DecodedEvent::Telemetry {
                field,
                value: scale_wire_value(wire_value(payload), divisor),
            },
            None => DecodedEvent::Ignored { code },
        }
    }

    /// Extracts the six description characters from bytes 2..8.
    ///
    /// No character-set validation is performed.
    ///
    /// # Example
    ///
    /// ```
    /// use r48xx::{CurrentScale, FrameCodec};
    ///
    /// let codec = FrameCodec::new(CurrentScale::new(30.0).unwrap());
    /// assert_eq!(&codec.decode_description(b"\x00\x01R4850G"), b"R4850G");
    /// ```
    pub fn decode_description(&self, payload: &[u8; FRAME_PAYLOAD_SIZE]) -> [u8; 6] {
        let mut text = [0u8; 6];
        text.copy_from_slice(&payload[2..8]);
        text
    }

    /// Encodes a command into an outbound frame.
    ///
    /// Values whose scaled integer falls outside 0..=65535 saturate; use the
    /// [`Command`] constructors to reject them up front.
    pub fn encode(&self, command: Command) -> RawFrame {
        match command {
            Command::RequestTelemetry => {
                RawFrame::full(ID_REQUEST_TELEMETRY, [0u8; FRAME_PAYLOAD_SIZE])
            }
            Command::SetVoltage { value, .. } => {
                self.set_frame(command, scale_setpoint(value, VOLTAGE_SCALE))
            }
            Command::SetCurrent { value, .. } => self.set_frame(
                command,
                scale_setpoint(value, self.table.current_scale().divisor()),
            ),
        }
    }

    fn set_frame(&self, command: Command, scaled: u16) -> RawFrame {
        let [high, low] = scaled.to_be_bytes();
        let sub_code = command.sub_code().unwrap_or_default();
        RawFrame::full(
            ID_SET_COMMAND,
            [SET_COMMAND_MARKER, sub_code, 0x00, 0x00, 0x00, 0x00, high, low],
        )
    }
}

// `as` saturates and maps NaN to 0.
fn scale_setpoint(value: f32, divisor: f32) -> u16 {
    (value * divisor).round() as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> FrameCodec {
        FrameCodec::new(CurrentScale::new(30.0).unwrap())
    }

    fn telemetry(code: u8, raw: u32) -> [u8; 8] {
        let [a, b, c, d] = raw.to_be_bytes();
        [0x01, code, 0x00, 0x00, a, b, c, d]
    }

    #[test]
    fn test_decode_output_voltage() {
        let event = codec().decode_telemetry(&telemetry(0x75, 54_784));
        assert_eq!(
            event,
            DecodedEvent::Telemetry {
                field: FieldSlot::OutputVoltage,
                value: 53.5
            }
        );
    }

    #[test]
    fn test_decode_uses_table_divisor() {
        let codec = codec();
        for code in [0x70u8, 0x71, 0x72, 0x73, 0x74, 0x75, 0x76, 0x78, 0x7F, 0x80, 0x81] {
            let raw = 0x0001_2345;
            let (field, divisor) = codec.table().lookup(code).unwrap();
            let expected = (raw as f64 / divisor as f64) as f32;
            assert_eq!(
                codec.decode_telemetry(&telemetry(code, raw)),
                DecodedEvent::Telemetry {
                    field,
                    value: expected
                }
            );
        }
    }

    #[test]
    fn test_decode_max_current_with_device_scale() {
        let event = codec().decode_telemetry(&telemetry(0x76, 1_500));
        assert_eq!(
            event,
            DecodedEvent::Telemetry {
                field: FieldSlot::MaxOutputCurrent,
                value: 50.0
            }
        );

        let other = FrameCodec::new(CurrentScale::new(22.0).unwrap());
        assert_eq!(
            other.decode_telemetry(&telemetry(0x76, 1_100)),
            DecodedEvent::Telemetry {
                field: FieldSlot::MaxOutputCurrent,
                value: 50.0
            }
        );
    }

    #[test]
    fn test_decode_ignored_codes() {
        let codec = codec();
        assert_eq!(
            codec.decode_telemetry(&telemetry(0xFF, 1024)),
            DecodedEvent::Ignored { code: 0xFF }
        );
        assert_eq!(
            codec.decode_telemetry(&telemetry(0x82, 1024)),
            DecodedEvent::Ignored { code: 0x82 }
        );
    }

    #[test]
    fn test_decode_description_passthrough() {
        let payload = [0x00, 0x02, 0x01, 0xFF, b'a', b'-', 0x7F, 0x00];
        assert_eq!(
            codec().decode_description(&payload),
            [0x01, 0xFF, b'a', b'-', 0x7F, 0x00]
        );
    }

    #[test]
    fn test_encode_request_telemetry() {
        let frame = codec().encode(Command::RequestTelemetry);
        assert_eq!(frame.id(), ID_REQUEST_TELEMETRY);
        assert_eq!(frame.len(), 8);
        assert_eq!(frame.payload(), &[0u8; 8]);
    }

    #[test]
    fn test_encode_set_voltage() {
        let codec = codec();
        let online = codec.encode(Command::SetVoltage {
            value: 53.5,
            persistent: false,
        });
        assert_eq!(online.id(), ID_SET_COMMAND);
        assert_eq!(online.payload(), &[0x01, 0x00, 0, 0, 0, 0, 0xD6, 0x00]);

        let offline = codec.encode(Command::SetVoltage {
            value: 48.0,
            persistent: true,
        });
        assert_eq!(offline.payload(), &[0x01, 0x01, 0, 0, 0, 0, 0xC0, 0x00]);
    }

    #[test]
    fn test_encode_set_current() {
        let codec = codec();
        let online = codec.encode(Command::SetCurrent {
            value: 10.0,
            persistent: false,
        });
        assert_eq!(online.payload(), &[0x01, 0x03, 0, 0, 0, 0, 0x01, 0x2C]);

        let offline = codec.encode(Command::SetCurrent {
            value: 10.0,
            persistent: true,
        });
        assert_eq!(offline.payload(), &[0x01, 0x04, 0, 0, 0, 0, 0x01, 0x2C]);
    }

    #[test]
    fn test_encode_rounds() {
        // 52.1 * 1024 = 53350.4
        let frame = codec().encode(Command::SetVoltage {
            value: 52.1,
            persistent: false,
        });
        assert_eq!(&frame.payload()[6..], &53_350u16.to_be_bytes());
    }

    #[test]
    fn test_encode_saturates_out_of_range() {
        let frame = codec().encode(Command::SetVoltage {
            value: 100.0,
            persistent: false,
        });
        assert_eq!(&frame.payload()[6..], &[0xFF, 0xFF]);
    }

    #[test]
    fn test_command_constructors_validate() {
        let scale = CurrentScale::new(30.0).unwrap();
        assert!(Command::set_voltage(f32::NAN, false).is_err());
        assert!(Command::set_voltage(63.99, false).is_ok());
        assert!(Command::set_current(2184.0, false, scale).is_ok());
        assert!(Command::set_current(2185.0, false, scale).is_err());
    }

    #[test]
    fn test_sub_codes() {
        assert_eq!(Command::RequestTelemetry.sub_code(), None);
        let cases = [
            (Command::SetVoltage { value: 0.0, persistent: false }, 0x00),
            (Command::SetVoltage { value: 0.0, persistent: true }, 0x01),
            (Command::SetCurrent { value: 0.0, persistent: false }, 0x03),
            (Command::SetCurrent { value: 0.0, persistent: true }, 0x04),
        ];
        for (command, expected) in cases {
            assert_eq!(command.sub_code(), Some(expected));
        }
    }
}
