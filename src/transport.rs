//! Bus transport layer.
//!
//! The transport only moves [`RawFrame`]s; it knows nothing about parameter
//! codes or commands. [`FrameTransport`] is the seam between the protocol
//! and the bus, so the receive loop and the transmitter can run against a
//! test double.
//!
//! With the `socketcan` feature on Linux, [`SocketCanTransport`] binds a raw
//! CAN socket to a named interface.
//!
//! ```no_run
//! # #[cfg(all(target_os = "linux", feature = "socketcan"))]
//! # fn main() -> r48xx::Result<()> {
//! use r48xx::{FrameTransport, SocketCanTransport};
//!
//! let transport = SocketCanTransport::open("can0")?;
//! let frame = transport.recv()?;
//! println!("0x{:08X}", frame.id());
//! # Ok(())
//! # }
//! # #[cfg(not(all(target_os = "linux", feature = "socketcan")))]
//! # fn main() {}
//! ```

use std::time::Duration;

use crate::error::Result;
use crate::frame::RawFrame;

/// Default read timeout of the SocketCAN transport.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(250);

/// Blocking frame transport shared by the receive loop and the transmitter.
///
/// `recv` and `send` take `&self` and may be called from different threads
/// at the same time.
pub trait FrameTransport: Send + Sync {
    /// Blocks until the next frame arrives.
    ///
    /// Implementations should give up after a bounded wait and return
    /// `R48xxError::Timeout`, so the receive loop can notice shutdown on a
    /// quiet bus.
    ///
    /// # Errors
    ///
    /// Errors for which [`R48xxError::is_fatal`] holds end the receive loop;
    /// the rest are logged and skipped.
    ///
    /// [`R48xxError::is_fatal`]: crate::R48xxError::is_fatal
    fn recv(&self) -> Result<RawFrame>;

    /// Transmits one frame in extended format.
    fn send(&self, frame: &RawFrame) -> Result<()>;
}

impl<T: FrameTransport + ?Sized> FrameTransport for std::sync::Arc<T> {
    fn recv(&self) -> Result<RawFrame> {
        (**self).recv()
    }

    fn send(&self, frame: &RawFrame) -> Result<()> {
        (**self).send(frame)
    }
}

#[cfg(all(target_os = "linux", feature = "socketcan"))]
pub use self::socket::SocketCanTransport;

#[cfg(all(target_os = "linux", feature = "socketcan"))]
mod socket {
    use std::io::ErrorKind;
    use std::time::Duration;

    use socketcan::{CanFrame, CanSocket, EmbeddedFrame, ExtendedId, Id, Socket};
    use tracing::debug;

    use crate::error::{R48xxError, Result};
    use crate::frame::RawFrame;
    use crate::utils::format_frame;

    /// Raw SocketCAN transport bound to one interface.
    pub struct SocketCanTransport {
        interface: String,
        socket: CanSocket,
    }

    impl SocketCanTransport {
        /// Opens and binds a raw CAN socket with the default read timeout.
        ///
        /// # Errors
        ///
        /// Returns an I/O error if the interface does not exist or the socket
        /// cannot be created.
        pub fn open(interface: &str) -> Result<Self> {
            Self::open_with_timeout(interface, super::DEFAULT_RECV_TIMEOUT)
        }

        /// Opens and binds a raw CAN socket; `recv` returns
        /// `R48xxError::Timeout` after `timeout` without traffic.
        ///
        /// # Errors
        ///
        /// Returns an I/O error if the socket cannot be created or configured.
        pub fn open_with_timeout(interface: &str, timeout: Duration) -> Result<Self> {
            let socket = CanSocket::open(interface)?;
            socket.set_read_timeout(Some(timeout))?;
            debug!(interface, ?timeout, "CAN socket bound");
            Ok(Self {
                interface: interface.to_string(),
                socket,
            })
        }

        /// Returns the interface name.
        pub fn interface(&self) -> &str {
            &self.interface
        }
    }

    impl super::FrameTransport for SocketCanTransport {
        fn recv(&self) -> Result<RawFrame> {
            let frame = match self.socket.read_frame() {
                Ok(frame) => frame,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(R48xxError::Timeout);
                }
                Err(e) => return Err(e.into()),
            };
            let raw_id = match frame.id() {
                Id::Standard(id) => u32::from(id.as_raw()),
                Id::Extended(id) => id.as_raw(),
            };
            RawFrame::from_slice(raw_id, frame.data())
        }

        fn send(&self, frame: &RawFrame) -> Result<()> {
            let id = ExtendedId::new(frame.id()).ok_or_else(|| {
                R48xxError::invalid_frame(format!("0x{:X} is not a 29-bit id", frame.id()))
            })?;
            let out = CanFrame::new(id, frame.data()).ok_or_else(|| {
                R48xxError::invalid_frame(format!("cannot build {}", format_frame(frame)))
            })?;
            self.socket.write_frame(&out)?;
            Ok(())
        }
    }

    impl std::fmt::Debug for SocketCanTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("SocketCanTransport")
                .field("interface", &self.interface)
                .finish()
        }
    }
}
