//! Routing of received frames.
//!
//! The [`Dispatcher`] looks up each frame's identifier in an
//! [`IdentifierTable`] and hands the payload to the matching decoder. Decoded
//! results go to the [`SnapshotAccumulator`] or to an [`EventSink`].
//!
//! | Identifier | Route |
//! |------------|-------|
//! | [`ID_TELEMETRY`] | decode telemetry, apply to accumulator |
//! | [`ID_DESCRIPTION`] | decode description, publish |
//! | [`ID_ACK`] | decode acknowledgment, publish |
//! | energy counter, status, heartbeats | discarded |
//! | anything else | diagnostic sink |
//!
//! # Example
//!
//! ```
//! use r48xx::{
//!     CurrentScale, Dispatcher, EventSink, FrameKind, RawFrame, RectifierParameters,
//!     SnapshotAccumulator, ID_TELEMETRY,
//! };
//!
//! #[derive(Default)]
//! struct Collect(Vec<RectifierParameters>);
//!
//! impl EventSink for Collect {
//!     fn on_snapshot(&mut self, snapshot: &RectifierParameters) {
//!         self.0.push(*snapshot);
//!     }
//! }
//!
//! let dispatcher = Dispatcher::new(CurrentScale::new(30.0).unwrap());
//! let mut acc = SnapshotAccumulator::new();
//! let mut sink = Collect::default();
//!
//! let frame = RawFrame::full(ID_TELEMETRY, [0x01, 0x81, 0, 0, 0x00, 0x00, 0x28, 0x00]);
//! assert_eq!(dispatcher.dispatch(&frame, &mut acc, &mut sink), FrameKind::Telemetry);
//! assert_eq!(sink.0[0].output_current, 10.0);
//! ```

use std::collections::HashMap;

use tracing::{debug, info, trace, warn};

use crate::ack::{AckInterpreter, AckOutcome};
use crate::codec::FrameCodec;
use crate::error::{R48xxError, Result};
use crate::frame::{
    RawFrame, ID_ACK, ID_AUX_STATUS, ID_DESCRIPTION, ID_ENERGY_COUNTER, ID_HEARTBEAT, ID_STATUS,
    ID_TELEMETRY,
};
use crate::parameter::CurrentScale;
use crate::snapshot::{RectifierParameters, SnapshotAccumulator};
use crate::utils::{format_description, format_frame};

/// How a frame identifier is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Telemetry field report.
    Telemetry,
    /// Device description fragment.
    Description,
    /// Command acknowledgment.
    Ack,
    /// Recognised but intentionally not decoded.
    Ignored,
    /// Not in the table.
    Unknown,
}

/// Identifier table of the rectifier family.
pub const STANDARD_IDENTIFIERS: [(u32, FrameKind); 7] = [
    (ID_TELEMETRY, FrameKind::Telemetry),
    (ID_DESCRIPTION, FrameKind::Description),
    (ID_ACK, FrameKind::Ack),
    (ID_ENERGY_COUNTER, FrameKind::Ignored),
    (ID_STATUS, FrameKind::Ignored),
    (ID_HEARTBEAT, FrameKind::Ignored),
    (ID_AUX_STATUS, FrameKind::Ignored),
];

/// Map from 29-bit identifier to [`FrameKind`].
#[derive(Debug, Clone)]
pub struct IdentifierTable {
    routes: HashMap<u32, FrameKind>,
}

impl IdentifierTable {
    /// Builds a table from `(identifier, kind)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `R48xxError::DuplicateIdentifier` if an identifier is listed
    /// twice, and `R48xxError::InvalidParameter` if it does not fit in 29 bits
    /// or is mapped to [`FrameKind::Unknown`].
    ///
    /// # Example
    ///
    /// ```
    /// use r48xx::{FrameKind, IdentifierTable};
    ///
    /// let table = IdentifierTable::new([(0x1081407F, FrameKind::Telemetry)]).unwrap();
    /// assert_eq!(table.route(0x1081407F), FrameKind::Telemetry);
    /// assert_eq!(table.route(0x123), FrameKind::Unknown);
    ///
    /// let dup = IdentifierTable::new([
    ///     (0x1081407F, FrameKind::Telemetry),
    ///     (0x1081407F, FrameKind::Ignored),
    /// ]);
    /// assert!(dup.is_err());
    /// ```
    pub fn new(entries: impl IntoIterator<Item = (u32, FrameKind)>) -> Result<Self> {
        let mut routes = HashMap::new();
        for (id, kind) in entries {
            if id & !crate::frame::EXTENDED_ID_MASK != 0 {
                return Err(R48xxError::invalid_parameter(
                    "identifier",
                    format!("0x{:X} does not fit in 29 bits", id),
                ));
            }
            if kind == FrameKind::Unknown {
                return Err(R48xxError::invalid_parameter(
                    "identifier",
                    format!("0x{:08X} cannot be routed to Unknown", id),
                ));
            }
            if routes.insert(id, kind).is_some() {
                return Err(R48xxError::DuplicateIdentifier { id });
            }
        }
        Ok(Self { routes })
    }

    /// Returns the table for the rectifier family.
    pub fn standard() -> Self {
        Self {
            routes: STANDARD_IDENTIFIERS.into_iter().collect(),
        }
    }

    /// Returns the route for an identifier.
    pub fn route(&self, id: u32) -> FrameKind {
        self.routes.get(&id).copied().unwrap_or(FrameKind::Unknown)
    }

    /// Returns the number of known identifiers.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for IdentifierTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Receiver of everything the dispatcher publishes.
///
/// All methods default to no-ops except [`on_unknown`](EventSink::on_unknown),
/// which logs the frame.
pub trait EventSink {
    /// Called once per completed telemetry burst.
    fn on_snapshot(&mut self, snapshot: &RectifierParameters) {
        let _ = snapshot;
    }

    /// Called for every description fragment.
    fn on_description(&mut self, text: [u8; 6]) {
        let _ = text;
    }

    /// Called for every acknowledgment.
    fn on_ack(&mut self, outcome: &AckOutcome) {
        let _ = outcome;
    }

    /// Called for frames whose identifier is not in the table.
    fn on_unknown(&mut self, frame: &RawFrame) {
        warn!("Unknown frame {}", format_frame(frame));
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn on_snapshot(&mut self, snapshot: &RectifierParameters) {
        (**self).on_snapshot(snapshot);
    }

    fn on_description(&mut self, text: [u8; 6]) {
        (**self).on_description(text);
    }

    fn on_ack(&mut self, outcome: &AckOutcome) {
        (**self).on_ack(outcome);
    }

    fn on_unknown(&mut self, frame: &RawFrame) {
        (**self).on_unknown(frame);
    }
}

/// Stateless frame router.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    table: IdentifierTable,
    codec: FrameCodec,
    acks: AckInterpreter,
}

impl Dispatcher {
    /// Creates a dispatcher with the standard identifier table.
    pub fn new(current_scale: CurrentScale) -> Self {
        Self::with_table(IdentifierTable::standard(), current_scale)
    }

    /// Creates a dispatcher with a custom identifier table.
    pub fn with_table(table: IdentifierTable, current_scale: CurrentScale) -> Self {
        Self {
            table,
            codec: FrameCodec::new(current_scale),
            acks: AckInterpreter::new(current_scale),
        }
    }

    /// Returns the codec used for telemetry.
    pub fn codec(&self) -> &FrameCodec {
        &self.codec
    }

    /// Routes one frame and returns the route taken.
    pub fn dispatch<S>(
        &self,
        frame: &RawFrame,
        accumulator: &mut SnapshotAccumulator,
        sink: &mut S,
    ) -> FrameKind
    where
        S: EventSink + ?Sized,
    {
        trace!("rx {}", format_frame(frame));

        let kind = self.table.route(frame.id());
        match kind {
            FrameKind::Telemetry => {
                let event = self.codec.decode_telemetry(frame.payload());
                if let Some(snapshot) = accumulator.apply_event(event) {
                    sink.on_snapshot(snapshot);
                }
            }
            FrameKind::Description => {
                let text = self.codec.decode_description(frame.payload());
                debug!("description fragment '{}'", format_description(&text));
                sink.on_description(text);
            }
            FrameKind::Ack => {
                let outcome = self.acks.decode_ack(frame.payload());
                if outcome.success {
                    info!("{}", outcome);
                } else {
                    warn!("{}", outcome);
                }
                sink.on_ack(&outcome);
            }
            FrameKind::Ignored => {
                debug!("ignored frame 0x{:08X}", frame.id());
            }
            FrameKind::Unknown => sink.on_unknown(frame),
        }
        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ack::AckTarget;

    #[derive(Default)]
    struct Recorder {
        snapshots: Vec<RectifierParameters>,
        descriptions: Vec<[u8; 6]>,
        acks: Vec<AckOutcome>,
        unknown: Vec<RawFrame>,
    }

    impl EventSink for Recorder {
        fn on_snapshot(&mut self, snapshot: &RectifierParameters) {
            self.snapshots.push(*snapshot);
        }

        fn on_description(&mut self, text: [u8; 6]) {
            self.descriptions.push(text);
        }

        fn on_ack(&mut self, outcome: &AckOutcome) {
            self.acks.push(*outcome);
        }

        fn on_unknown(&mut self, frame: &RawFrame) {
            self.unknown.push(*frame);
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(CurrentScale::new(30.0).unwrap())
    }

    fn telemetry(code: u8, raw: u32) -> RawFrame {
        let [a, b, c, d] = raw.to_be_bytes();
        RawFrame::full(ID_TELEMETRY, [0x01, code, 0x00, 0x00, a, b, c, d])
    }

    #[test]
    fn test_standard_table_is_unique() {
        let table = IdentifierTable::new(STANDARD_IDENTIFIERS).unwrap();
        assert_eq!(table.len(), STANDARD_IDENTIFIERS.len());
        assert_eq!(IdentifierTable::standard().len(), table.len());
    }

    #[test]
    fn test_table_rejects_wide_identifier() {
        let result = IdentifierTable::new([(0x2000_0000, FrameKind::Ignored)]);
        assert!(matches!(result, Err(R48xxError::InvalidParameter { .. })));
    }

    #[test]
    fn test_table_rejects_unknown_route() {
        assert!(IdentifierTable::new([(0x100, FrameKind::Unknown)]).is_err());
    }

    #[test]
    fn test_output_voltage_then_current() {
        let dispatcher = dispatcher();
        let mut acc = SnapshotAccumulator::new();
        let mut sink = Recorder::default();

        dispatcher.dispatch(&telemetry(0x75, 54_784), &mut acc, &mut sink);
        assert_eq!(acc.parameters().output_voltage, 53.5);
        assert!(sink.snapshots.is_empty());

        dispatcher.dispatch(&telemetry(0x81, 10_240), &mut acc, &mut sink);
        assert_eq!(sink.snapshots.len(), 1);
        assert_eq!(sink.snapshots[0].output_voltage, 53.5);
        assert_eq!(sink.snapshots[0].output_current, 10.0);
    }

    #[test]
    fn test_unknown_code_leaves_state() {
        let dispatcher = dispatcher();
        let mut acc = SnapshotAccumulator::new();
        let mut sink = Recorder::default();

        dispatcher.dispatch(&telemetry(0x75, 54_784), &mut acc, &mut sink);
        let before = *acc.parameters();
        let kind = dispatcher.dispatch(&telemetry(0xFF, 99_999), &mut acc, &mut sink);

        assert_eq!(kind, FrameKind::Telemetry);
        assert_eq!(*acc.parameters(), before);
        assert!(sink.unknown.is_empty());
    }

    #[test]
    fn test_description_route() {
        let dispatcher = dispatcher();
        let mut acc = SnapshotAccumulator::new();
        let mut sink = Recorder::default();

        let frame = RawFrame::full(ID_DESCRIPTION, *b"\x00\x01R4850G");
        assert_eq!(
            dispatcher.dispatch(&frame, &mut acc, &mut sink),
            FrameKind::Description
        );
        assert_eq!(sink.descriptions, vec![*b"R4850G"]);
    }

    #[test]
    fn test_ack_route() {
        let dispatcher = dispatcher();
        let mut acc = SnapshotAccumulator::new();
        let mut sink = Recorder::default();

        let frame = RawFrame::full(ID_ACK, [0x20, 0x03, 0, 0, 0x00, 0x00, 0x01, 0x2C]);
        assert_eq!(dispatcher.dispatch(&frame, &mut acc, &mut sink), FrameKind::Ack);
        assert_eq!(
            sink.acks,
            vec![AckOutcome {
                target: AckTarget::TempCurrent,
                success: false,
                value: 10.0
            }]
        );
    }

    #[test]
    fn test_ignored_identifiers_are_silent() {
        let dispatcher = dispatcher();
        let mut acc = SnapshotAccumulator::new();
        let mut sink = Recorder::default();

        for id in [ID_ENERGY_COUNTER, ID_STATUS, ID_HEARTBEAT, ID_AUX_STATUS] {
            let frame = RawFrame::full(id, [0xFF; 8]);
            assert_eq!(
                dispatcher.dispatch(&frame, &mut acc, &mut sink),
                FrameKind::Ignored
            );
        }
        assert!(sink.unknown.is_empty());
        assert_eq!(*acc.parameters(), RectifierParameters::default());
    }

    #[test]
    fn test_unknown_identifier_goes_to_diagnostics() {
        let dispatcher = dispatcher();
        let mut acc = SnapshotAccumulator::new();
        let mut sink = Recorder::default();

        let frame = RawFrame::from_slice(0x1234_5678, &[0xDE, 0xAD]).unwrap();
        assert_eq!(
            dispatcher.dispatch(&frame, &mut acc, &mut sink),
            FrameKind::Unknown
        );
        assert_eq!(sink.unknown, vec![frame]);

        // Decoding continues afterwards.
        dispatcher.dispatch(&telemetry(0x81, 1024), &mut acc, &mut sink);
        assert_eq!(sink.snapshots.len(), 1);
    }

    #[test]
    fn test_custom_table() {
        let table = IdentifierTable::new([(0x0000_0100, FrameKind::Telemetry)]).unwrap();
        let dispatcher = Dispatcher::with_table(table, CurrentScale::new(22.0).unwrap());
        let mut acc = SnapshotAccumulator::new();
        let mut sink = Recorder::default();

        let frame = RawFrame::full(0x100, [0x01, 0x76, 0, 0, 0x00, 0x00, 0x04, 0x4C]);
        dispatcher.dispatch(&frame, &mut acc, &mut sink);
        assert_eq!(acc.parameters().max_output_current, 50.0);

        let standard = telemetry(0x75, 54_784);
        assert_eq!(
            dispatcher.dispatch(&standard, &mut acc, &mut sink),
            FrameKind::Unknown
        );
    }
}
