//! Telemetry snapshot accumulation.
//!
//! A polling burst arrives as one frame per measurement. The
//! [`SnapshotAccumulator`] writes each value into its slot and publishes the
//! whole record when the terminal parameter ([`TERMINAL_CODE`]) arrives.
//! Fields are never reset: a measurement missing from a burst keeps the value
//! from the last burst that carried it.
//!
//! # Example
//!
//! ```
//! use r48xx::{FieldSlot, SnapshotAccumulator};
//!
//! let mut acc = SnapshotAccumulator::new();
//! assert!(acc.apply(FieldSlot::OutputVoltage, 53.5).is_none());
//!
//! let snapshot = acc.apply(FieldSlot::OutputCurrent, 10.0).unwrap();
//! assert_eq!(snapshot.output_voltage, 53.5);
//! assert_eq!(snapshot.output_current, 10.0);
//! ```
//!
//! [`TERMINAL_CODE`]: crate::TERMINAL_CODE

use tracing::{debug, info};

use crate::codec::DecodedEvent;
use crate::parameter::FieldSlot;

/// All measurements reported by one rectifier module.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RectifierParameters {
    /// Input voltage (V).
    pub input_voltage: f32,
    /// Input frequency (Hz).
    pub input_frequency: f32,
    /// Input current (A).
    pub input_current: f32,
    /// Input power (W).
    pub input_power: f32,
    /// Input temperature (°C).
    pub input_temp: f32,
    /// Efficiency (%).
    pub efficiency: f32,
    /// Output voltage (V).
    pub output_voltage: f32,
    /// Output current (A).
    pub output_current: f32,
    /// Maximum output current (A).
    pub max_output_current: f32,
    /// Output power (W).
    pub output_power: f32,
    /// Output temperature (°C).
    pub output_temp: f32,
}

impl RectifierParameters {
    /// Returns the value stored in a slot.
    pub fn get(&self, field: FieldSlot) -> f32 {
        match field {
            FieldSlot::InputVoltage => self.input_voltage,
            FieldSlot::InputFrequency => self.input_frequency,
            FieldSlot::InputCurrent => self.input_current,
            FieldSlot::InputPower => self.input_power,
            FieldSlot::InputTemp => self.input_temp,
            FieldSlot::Efficiency => self.efficiency,
            FieldSlot::OutputVoltage => self.output_voltage,
            FieldSlot::OutputCurrent => self.output_current,
            FieldSlot::MaxOutputCurrent => self.max_output_current,
            FieldSlot::OutputPower => self.output_power,
            FieldSlot::OutputTemp => self.output_temp,
        }
    }

    fn slot_mut(&mut self, field: FieldSlot) -> &mut f32 {
        match field {
            FieldSlot::InputVoltage => &mut self.input_voltage,
            FieldSlot::InputFrequency => &mut self.input_frequency,
            FieldSlot::InputCurrent => &mut self.input_current,
            FieldSlot::InputPower => &mut self.input_power,
            FieldSlot::InputTemp => &mut self.input_temp,
            FieldSlot::Efficiency => &mut self.efficiency,
            FieldSlot::OutputVoltage => &mut self.output_voltage,
            FieldSlot::OutputCurrent => &mut self.output_current,
            FieldSlot::MaxOutputCurrent => &mut self.max_output_current,
            FieldSlot::OutputPower => &mut self.output_power,
            FieldSlot::OutputTemp => &mut self.output_temp,
        }
    }
}

impl std::fmt::Display for RectifierParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for field in FieldSlot::ALL {
            writeln!(
                f,
                "{:<22}{:>9.2}{}",
                field.label(),
                self.get(field),
                field.unit()
            )?;
        }
        Ok(())
    }
}

/// Single-writer accumulator for one device's telemetry.
#[derive(Debug, Clone, Default)]
pub struct SnapshotAccumulator {
    parameters: RectifierParameters,
}

impl SnapshotAccumulator {
    /// Creates an accumulator with every field at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes one measurement.
    ///
    /// Returns the complete record when `field` is the terminal field,
    /// `None` otherwise.
    pub fn apply(&mut self, field: FieldSlot, value: f32) -> Option<&RectifierParameters> {
        *self.parameters.slot_mut(field) = value;
        debug!(field = %field, value, "telemetry update");

        if field.is_terminal() {
            info!(
                output_voltage = self.parameters.output_voltage,
                output_current = self.parameters.output_current,
                "snapshot complete"
            );
            Some(&self.parameters)
        } else {
            None
        }
    }

    /// Applies a decoded event; ignored codes leave the record untouched.
    pub fn apply_event(&mut self, event: DecodedEvent) -> Option<&RectifierParameters> {
        match event {
            DecodedEvent::Telemetry { field, value } => self.apply(field, value),
            DecodedEvent::Ignored { code } => {
                debug!("ignored parameter code 0x{:02X}", code);
                None
            }
        }
    }

    /// Returns the current record.
    pub fn parameters(&self) -> &RectifierParameters {
        &self.parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_triggers_once_per_arrival() {
        let mut acc = SnapshotAccumulator::new();
        let mut published = 0;

        for field in FieldSlot::ALL {
            if field != FieldSlot::OutputCurrent && acc.apply(field, 1.0).is_some() {
                published += 1;
            }
        }
        assert_eq!(published, 0);

        assert!(acc.apply(FieldSlot::OutputCurrent, 2.0).is_some());
        assert!(acc.apply(FieldSlot::OutputCurrent, 3.0).is_some());
    }

    #[test]
    fn test_terminal_alone_publishes() {
        let mut acc = SnapshotAccumulator::new();
        let snapshot = acc.apply(FieldSlot::OutputCurrent, 12.5).unwrap();
        assert_eq!(snapshot.output_current, 12.5);
        assert_eq!(snapshot.output_voltage, 0.0);
    }

    #[test]
    fn test_fields_carry_over_between_bursts() {
        let mut acc = SnapshotAccumulator::new();
        acc.apply(FieldSlot::InputVoltage, 230.0);
        acc.apply(FieldSlot::OutputTemp, 31.0);
        acc.apply(FieldSlot::OutputVoltage, 53.5);
        acc.apply(FieldSlot::OutputCurrent, 10.0).unwrap();

        acc.apply(FieldSlot::OutputVoltage, 54.0);
        let second = *acc.apply(FieldSlot::OutputCurrent, 11.0).unwrap();

        assert_eq!(second.input_voltage, 230.0);
        assert_eq!(second.output_temp, 31.0);
        assert_eq!(second.output_voltage, 54.0);
        assert_eq!(second.output_current, 11.0);
    }

    #[test]
    fn test_ignored_event_does_not_mutate() {
        let mut acc = SnapshotAccumulator::new();
        acc.apply(FieldSlot::Efficiency, 96.0);
        let before = *acc.parameters();

        assert!(acc.apply_event(DecodedEvent::Ignored { code: 0xFF }).is_none());
        assert_eq!(*acc.parameters(), before);
    }

    #[test]
    fn test_get_matches_apply() {
        let mut acc = SnapshotAccumulator::new();
        for (i, field) in FieldSlot::ALL.into_iter().enumerate() {
            acc.apply(field, i as f32);
        }
        for (i, field) in FieldSlot::ALL.into_iter().enumerate() {
            assert_eq!(acc.parameters().get(field), i as f32);
        }
    }

    #[test]
    fn test_display_report() {
        let params = RectifierParameters {
            input_voltage: 230.0,
            output_voltage: 53.5,
            efficiency: 96.25,
            output_temp: 31.0,
            ..Default::default()
        };
        let report = params.to_string();
        assert_eq!(report.lines().count(), 11);
        assert!(report.contains("Input Voltage"));
        assert!(report.contains("230.00V"));
        assert!(report.contains("53.50V"));
        assert!(report.contains("96.25%"));
        assert!(report.contains("31.00°C"));
        assert!(report.contains("0.00Hz"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialize() {
        let params = RectifierParameters {
            output_voltage: 53.5,
            ..Default::default()
        };
        let json = serde_json::to_value(params).unwrap();
        assert_eq!(json["output_voltage"], 53.5);
        assert_eq!(json["input_temp"], 0.0);
    }
}
