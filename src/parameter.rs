//! Telemetry parameter codes and their scaling.
//!
//! Byte 1 of every telemetry field report names the measurement it carries.
//! The [`ParameterTable`] maps each code to a slot in
//! [`RectifierParameters`](crate::RectifierParameters) and to the divisor
//! that turns the wire integer into engineering units.
//!
//! # Parameter Codes
//!
//! | Code | Field | Divisor |
//! |------|-------|---------|
//! | 0x70 | Input power | 1024 |
//! | 0x71 | Input frequency | 1024 |
//! | 0x72 | Input current | 1024 |
//! | 0x73 | Output power | 1024 |
//! | 0x74 | Efficiency | 1024 |
//! | 0x75 | Output voltage | 1024 |
//! | 0x76 | Max output current | device specific ([`CurrentScale`]) |
//! | 0x78 | Input voltage | 1024 |
//! | 0x7F | Output temperature | 1024 |
//! | 0x80 | Input temperature | 1024 |
//! | 0x81 | Output current (terminal) | 1024 |
//! | 0x82 | Output current, duplicate | reserved, ignored |
//!
//! # Example
//!
//! ```
//! use r48xx::{CurrentScale, FieldSlot, ParameterTable};
//!
//! let table = ParameterTable::new(CurrentScale::new(30.0).unwrap());
//! assert_eq!(table.lookup(0x75), Some((FieldSlot::OutputVoltage, 1024.0)));
//! assert_eq!(table.lookup(0x76), Some((FieldSlot::MaxOutputCurrent, 30.0)));
//! assert_eq!(table.lookup(0x82), None);
//! ```

use crate::error::{R48xxError, Result};

/// Fixed divisor for voltage, frequency, current, power, temperature and efficiency.
pub const VOLTAGE_SCALE: f32 = 1024.0;

/// Parameter code whose arrival closes one polling burst.
pub const TERMINAL_CODE: u8 = ParameterCode::OutputCurrent.code();

/// One-byte telemetry parameter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterCode {
    /// Input power (W).
    InputPower,
    /// Input frequency (Hz).
    InputFrequency,
    /// Input current (A).
    InputCurrent,
    /// Output power (W).
    OutputPower,
    /// Efficiency (%).
    Efficiency,
    /// Output voltage (V).
    OutputVoltage,
    /// Maximum output current set-point (A).
    MaxOutputCurrent,
    /// Input voltage (V).
    InputVoltage,
    /// Output temperature (°C).
    OutputTemperature,
    /// Input temperature (°C).
    InputTemperature,
    /// Output current (A).
    OutputCurrent,
    /// Second output current report; its meaning is unknown and it is never decoded.
    OutputCurrentDuplicate,
    /// Any other code.
    Unknown(u8),
}

impl ParameterCode {
    /// Parses a code byte.
    ///
    /// # Example
    ///
    /// ```
    /// use r48xx::ParameterCode;
    ///
    /// assert_eq!(ParameterCode::from_code(0x81), ParameterCode::OutputCurrent);
    /// assert_eq!(ParameterCode::from_code(0xFF), ParameterCode::Unknown(0xFF));
    /// ```
    pub const fn from_code(code: u8) -> Self {
        match code {
            0x70 => Self::InputPower,
            0x71 => Self::InputFrequency,
            0x72 => Self::InputCurrent,
            0x73 => Self::OutputPower,
            0x74 => Self::Efficiency,
            0x75 => Self::OutputVoltage,
            0x76 => Self::MaxOutputCurrent,
            0x78 => Self::InputVoltage,
            0x7F => Self::OutputTemperature,
            0x80 => Self::InputTemperature,
            0x81 => Self::OutputCurrent,
            0x82 => Self::OutputCurrentDuplicate,
            other => Self::Unknown(other),
        }
    }

    /// Returns the wire byte for this code.
    pub const fn code(self) -> u8 {
        match self {
            Self::InputPower => 0x70,
            Self::InputFrequency => 0x71,
            Self::InputCurrent => 0x72,
            Self::OutputPower => 0x73,
            Self::Efficiency => 0x74,
            Self::OutputVoltage => 0x75,
            Self::MaxOutputCurrent => 0x76,
            Self::InputVoltage => 0x78,
            Self::OutputTemperature => 0x7F,
            Self::InputTemperature => 0x80,
            Self::OutputCurrent => 0x81,
            Self::OutputCurrentDuplicate => 0x82,
            Self::Unknown(code) => code,
        }
    }

    /// Returns the snapshot slot this code writes, if any.
    pub const fn field(self) -> Option<FieldSlot> {
        match self {
            Self::InputPower => Some(FieldSlot::InputPower),
            Self::InputFrequency => Some(FieldSlot::InputFrequency),
            Self::InputCurrent => Some(FieldSlot::InputCurrent),
            Self::OutputPower => Some(FieldSlot::OutputPower),
            Self::Efficiency => Some(FieldSlot::Efficiency),
            Self::OutputVoltage => Some(FieldSlot::OutputVoltage),
            Self::MaxOutputCurrent => Some(FieldSlot::MaxOutputCurrent),
            Self::InputVoltage => Some(FieldSlot::InputVoltage),
            Self::OutputTemperature => Some(FieldSlot::OutputTemp),
            Self::InputTemperature => Some(FieldSlot::InputTemp),
            Self::OutputCurrent => Some(FieldSlot::OutputCurrent),
            Self::OutputCurrentDuplicate | Self::Unknown(_) => None,
        }
    }
}

/// A field of [`RectifierParameters`](crate::RectifierParameters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FieldSlot {
    /// Input voltage.
    InputVoltage,
    /// Input frequency.
    InputFrequency,
    /// Input current.
    InputCurrent,
    /// Input power.
    InputPower,
    /// Input temperature.
    InputTemp,
    /// Efficiency.
    Efficiency,
    /// Output voltage.
    OutputVoltage,
    /// Output current.
    OutputCurrent,
    /// Maximum output current.
    MaxOutputCurrent,
    /// Output power.
    OutputPower,
    /// Output temperature.
    OutputTemp,
}

impl FieldSlot {
    /// All slots in report order.
    pub const ALL: [FieldSlot; 11] = [
        FieldSlot::InputVoltage,
        FieldSlot::InputFrequency,
        FieldSlot::InputCurrent,
        FieldSlot::InputPower,
        FieldSlot::InputTemp,
        FieldSlot::Efficiency,
        FieldSlot::OutputVoltage,
        FieldSlot::OutputCurrent,
        FieldSlot::MaxOutputCurrent,
        FieldSlot::OutputPower,
        FieldSlot::OutputTemp,
    ];

    /// Human-readable label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            FieldSlot::InputVoltage => "Input Voltage",
            FieldSlot::InputFrequency => "Input Frequency",
            FieldSlot::InputCurrent => "Input Current",
            FieldSlot::InputPower => "Input Power",
            FieldSlot::InputTemp => "Input Temperature",
            FieldSlot::Efficiency => "Efficiency",
            FieldSlot::OutputVoltage => "Output Voltage",
            FieldSlot::OutputCurrent => "Output Current",
            FieldSlot::MaxOutputCurrent => "Output Current (Max)",
            FieldSlot::OutputPower => "Output Power",
            FieldSlot::OutputTemp => "Output Temperature",
        }
    }

    /// Returns whether writing this slot closes a polling burst.
    ///
    /// This is the slot written by [`TERMINAL_CODE`].
    pub fn is_terminal(self) -> bool {
        ParameterCode::from_code(TERMINAL_CODE).field() == Some(self)
    }

    /// Unit suffix used in reports.
    pub fn unit(self) -> &'static str {
        match self {
            FieldSlot::InputVoltage | FieldSlot::OutputVoltage => "V",
            FieldSlot::InputFrequency => "Hz",
            FieldSlot::InputCurrent | FieldSlot::OutputCurrent | FieldSlot::MaxOutputCurrent => {
                "A"
            }
            FieldSlot::InputPower | FieldSlot::OutputPower => "W",
            FieldSlot::InputTemp | FieldSlot::OutputTemp => "°C",
            FieldSlot::Efficiency => "%",
        }
    }
}

impl std::fmt::Display for FieldSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Divisor for the maximum output current and current set-points.
///
/// Device revisions disagree on this value (30.0 and 22.0 have both been
/// observed), so it is always supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentScale(f32);

impl CurrentScale {
    /// Creates a current scale.
    ///
    /// # Errors
    ///
    /// Returns `R48xxError::InvalidParameter` unless `divisor` is finite and positive.
    ///
    /// # Example
    ///
    /// ```
    /// use r48xx::CurrentScale;
    ///
    /// assert!(CurrentScale::new(30.0).is_ok());
    /// assert!(CurrentScale::new(0.0).is_err());
    /// ```
    pub fn new(divisor: f32) -> Result<Self> {
        if !divisor.is_finite() || divisor <= 0.0 {
            return Err(R48xxError::invalid_parameter(
                "current_scale",
                "must be a finite positive number",
            ));
        }
        Ok(Self(divisor))
    }

    /// Returns the divisor.
    pub fn divisor(self) -> f32 {
        self.0
    }
}

/// Catalog of telemetry parameter codes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterTable {
    current_scale: CurrentScale,
}

impl ParameterTable {
    /// Creates a table using the given max-output-current divisor.
    pub fn new(current_scale: CurrentScale) -> Self {
        Self { current_scale }
    }

    /// Looks up the slot and divisor for a code.
    ///
    /// Reserved and unknown codes return `None`; that is not an error.
    pub fn lookup(&self, code: u8) -> Option<(FieldSlot, f32)> {
        let field = ParameterCode::from_code(code).field()?;
        let divisor = match field {
            FieldSlot::MaxOutputCurrent => self.current_scale.divisor(),
            _ => VOLTAGE_SCALE,
        };
        Some((field, divisor))
    }

    /// Returns the configured current scale.
    pub fn current_scale(&self) -> CurrentScale {
        self.current_scale
    }
}
