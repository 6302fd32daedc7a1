//! # R48xx Rectifier CAN Library
//!
//! A Rust library for monitoring and configuring R48xx-family rectifier power
//! modules over a CAN bus.
//!
//! The modules report measurements as a burst of small frames, one parameter
//! per frame, and accept voltage and current set-points as single command
//! frames. This crate decodes the burst into one [`RectifierParameters`]
//! snapshot, encodes commands with the right scaling, and interprets the
//! acknowledgments the module sends back.
//!
//! ## Features
//!
//! - **Pure codec**: decoding and encoding never allocate or fail
//! - **Explicit state**: one [`SnapshotAccumulator`] per device, no globals
//! - **Data-driven dispatch**: identifiers routed through an [`IdentifierTable`]
//! - **Async polling**: [`PollScheduler`] posts requests on a tokio task
//! - **Pluggable transport**: [`FrameTransport`] trait, SocketCAN with the `socketcan` feature
//!
//! ## Quick Start
//!
//! ```
//! use r48xx::{
//!     CurrentScale, Dispatcher, EventSink, RawFrame, RectifierParameters,
//!     SnapshotAccumulator, ID_TELEMETRY,
//! };
//!
//! struct Print;
//!
//! impl EventSink for Print {
//!     fn on_snapshot(&mut self, snapshot: &RectifierParameters) {
//!         print!("{}", snapshot);
//!     }
//! }
//!
//! let dispatcher = Dispatcher::new(CurrentScale::new(30.0)?);
//! let mut acc = SnapshotAccumulator::new();
//!
//! // Output voltage 53.5 V, then output current 10 A closes the burst
//! let voltage = RawFrame::full(ID_TELEMETRY, [0x01, 0x75, 0, 0, 0x00, 0x00, 0xD6, 0x00]);
//! let current = RawFrame::full(ID_TELEMETRY, [0x01, 0x81, 0, 0, 0x00, 0x00, 0x28, 0x00]);
//!
//! dispatcher.dispatch(&voltage, &mut acc, &mut Print);
//! dispatcher.dispatch(&current, &mut acc, &mut Print);
//!
//! assert_eq!(acc.parameters().output_voltage, 53.5);
//! assert_eq!(acc.parameters().output_current, 10.0);
//! # Ok::<(), r48xx::R48xxError>(())
//! ```
//!
//! ## Commands
//!
//! ```
//! use r48xx::{Command, CurrentScale, FrameCodec};
//!
//! let scale = CurrentScale::new(30.0)?;
//! let codec = FrameCodec::new(scale);
//!
//! // Running (volatile) voltage set-point
//! let frame = codec.encode(Command::set_voltage(53.5, false)?);
//! assert_eq!(frame.payload(), &[0x01, 0x00, 0, 0, 0, 0, 0xD6, 0x00]);
//!
//! // Non-volatile current limit
//! let frame = codec.encode(Command::set_current(10.0, true, scale)?);
//! assert_eq!(frame.payload(), &[0x01, 0x04, 0, 0, 0, 0, 0x01, 0x2C]);
//! # Ok::<(), r48xx::R48xxError>(())
//! ```
//!
//! ## Current Scale
//!
//! The divisor for the maximum output current differs between module
//! revisions (30.0 and 22.0 have both been seen), so there is no default:
//! every codec is built from an explicit [`CurrentScale`].
//!
//! ## Error Handling
//!
//! Decoding is infallible. Unknown parameter codes are ignored and unknown
//! identifiers go to [`EventSink::on_unknown`]. Only transport failures are
//! returned as [`R48xxError`]. A failed read or write ends [`Monitor::run`];
//! receive timeouts are not failures.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod ack;
mod codec;
mod dispatch;
mod error;
mod frame;
mod monitor;
mod parameter;
mod scheduler;
mod snapshot;
mod transport;
pub mod utils;

// Public re-exports
pub use ack::{AckInterpreter, AckOutcome, AckTarget, ACK_ERROR_BIT};
pub use codec::{Command, DecodedEvent, FrameCodec, MAX_SCALED_SETPOINT};
pub use dispatch::{Dispatcher, EventSink, FrameKind, IdentifierTable, STANDARD_IDENTIFIERS};
pub use error::{R48xxError, Result};
pub use frame::{
    RawFrame, EXTENDED_FRAME_FLAG, EXTENDED_ID_MASK, FRAME_PAYLOAD_SIZE, ID_ACK, ID_AUX_STATUS,
    ID_DESCRIPTION, ID_ENERGY_COUNTER, ID_HEARTBEAT, ID_REQUEST_TELEMETRY, ID_SET_COMMAND,
    ID_STATUS, ID_TELEMETRY,
};
pub use monitor::{receive_loop, Monitor, MonitorConfig, DEFAULT_QUEUE_DEPTH};
pub use parameter::{
    CurrentScale, FieldSlot, ParameterCode, ParameterTable, TERMINAL_CODE, VOLTAGE_SCALE,
};
pub use scheduler::{PollHandle, PollScheduler, DEFAULT_INITIAL_DELAY, DEFAULT_POLL_INTERVAL};
pub use snapshot::{RectifierParameters, SnapshotAccumulator};
#[cfg(all(target_os = "linux", feature = "socketcan"))]
pub use transport::SocketCanTransport;
pub use transport::{FrameTransport, DEFAULT_RECV_TIMEOUT};
