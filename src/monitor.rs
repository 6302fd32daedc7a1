//! High-level monitor for one rectifier module.
//!
//! This module provides the [`Monitor`] struct, which wires a
//! [`FrameTransport`] to the [`Dispatcher`], a transmitter task, and an
//! optional [`PollScheduler`].
//!
//! # Overview
//!
//! ```text
//!  PollScheduler ──┐
//!  one-shot cmds ──┼─► mpsc<Command> ─► transmitter ─► encode ─► transport.send
//!                  │
//!  transport.recv ─► Dispatcher ─► SnapshotAccumulator ─► EventSink
//! ```
//!
//! The receive loop runs on a blocking thread and is the only writer of the
//! [`SnapshotAccumulator`]. All transmissions go through one task, so the
//! transport never sees two concurrent writes from this crate.
//!
//! A failed read or write ends the run. So does cancelling
//! [`Monitor::shutdown_token`]; the receive loop notices it after its next
//! `recv` returns, which the transport's read timeout bounds.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(all(target_os = "linux", feature = "socketcan"))]
//! # async fn run() -> r48xx::Result<()> {
//! use r48xx::{Command, CurrentScale, EventSink, Monitor, MonitorConfig, RectifierParameters, SocketCanTransport};
//!
//! struct Print;
//!
//! impl EventSink for Print {
//!     fn on_snapshot(&mut self, snapshot: &RectifierParameters) {
//!         println!("{}", snapshot);
//!     }
//! }
//!
//! let config = MonitorConfig::new("can0", CurrentScale::new(30.0)?);
//! let transport = SocketCanTransport::open(config.interface())?;
//! let monitor = Monitor::new(transport, config)?;
//!
//! let shutdown = monitor.shutdown_token();
//! tokio::spawn(async move {
//!     let _ = tokio::signal::ctrl_c().await;
//!     shutdown.cancel();
//! });
//!
//! monitor.run(Print, vec![Command::set_voltage(53.5, false)?]).await
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::codec::{Command, FrameCodec};
use crate::dispatch::{Dispatcher, EventSink, IdentifierTable};
use crate::error::{R48xxError, Result};
use crate::parameter::CurrentScale;
use crate::scheduler::{PollScheduler, DEFAULT_INITIAL_DELAY, DEFAULT_POLL_INTERVAL};
use crate::snapshot::SnapshotAccumulator;
use crate::transport::FrameTransport;
use crate::utils::format_frame;

/// Default depth of the command submission channel.
pub const DEFAULT_QUEUE_DEPTH: usize = 16;

/// Configuration for a [`Monitor`].
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Bus interface name.
    pub interface: String,
    /// Max-output-current divisor of the connected module.
    pub current_scale: CurrentScale,
    /// Telemetry polling period; `None` disables polling.
    pub poll_interval: Option<Duration>,
    /// Delay before the first poll.
    pub initial_delay: Duration,
    /// Capacity of the command submission channel.
    pub queue_depth: usize,
}

impl MonitorConfig {
    /// Creates a configuration with default polling.
    ///
    /// # Example
    ///
    /// ```
    /// use r48xx::{CurrentScale, MonitorConfig};
    /// use std::time::Duration;
    ///
    /// let config = MonitorConfig::new("can0", CurrentScale::new(30.0).unwrap());
    /// assert_eq!(config.poll_interval, Some(Duration::from_secs(1)));
    /// ```
    pub fn new(interface: impl Into<String>, current_scale: CurrentScale) -> Self {
        Self {
            interface: interface.into(),
            current_scale,
            poll_interval: Some(DEFAULT_POLL_INTERVAL),
            initial_delay: DEFAULT_INITIAL_DELAY,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }

    /// Sets the polling period (default is 1 second).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Disables periodic polling.
    pub fn without_polling(mut self) -> Self {
        self.poll_interval = None;
        self
    }

    /// Sets the delay before the first poll (default is 100 ms).
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the command channel capacity.
    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    /// Returns the interface name.
    pub fn interface(&self) -> &str {
        &self.interface
    }

    fn scheduler(&self) -> Option<PollScheduler> {
        self.poll_interval
            .map(|interval| PollScheduler::new(interval).with_initial_delay(self.initial_delay))
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns `R48xxError::InvalidParameter` for a zero poll interval or a
    /// zero queue depth.
    pub fn validate(&self) -> Result<()> {
        if self.queue_depth == 0 {
            return Err(R48xxError::invalid_parameter(
                "queue_depth",
                "must be greater than 0",
            ));
        }
        if let Some(scheduler) = self.scheduler() {
            scheduler.validate()?;
        }
        Ok(())
    }
}

/// Monitor for one rectifier on one bus.
///
/// Create one per device; each owns its own snapshot record.
pub struct Monitor<T> {
    transport: Arc<T>,
    config: MonitorConfig,
    dispatcher: Dispatcher,
    tx: Sender<Command>,
    rx: Receiver<Command>,
    shutdown: CancellationToken,
}

impl<T> Monitor<T>
where
    T: FrameTransport + 'static,
{
    /// Creates a monitor with the standard identifier table.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(transport: T, config: MonitorConfig) -> Result<Self> {
        Self::with_table(transport, config, IdentifierTable::standard())
    }

    /// Creates a monitor with a custom identifier table.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_table(transport: T, config: MonitorConfig, table: IdentifierTable) -> Result<Self> {
        config.validate()?;
        let (tx, rx) = mpsc::channel(config.queue_depth);

        Ok(Self {
            transport: Arc::new(transport),
            dispatcher: Dispatcher::with_table(table, config.current_scale),
            config,
            tx,
            rx,
            shutdown: CancellationToken::new(),
        })
    }

    /// Returns a sender for one-shot commands.
    ///
    /// Commands posted here are transmitted once [`run`](Self::run) starts.
    pub fn commands(&self) -> Sender<Command> {
        self.tx.clone()
    }

    /// Returns a token that stops [`run`](Self::run) when cancelled.
    ///
    /// `run` then returns `Ok(())` once the receive loop has seen the
    /// cancellation and queued commands have been flushed.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Runs until shutdown or a transport fault.
    ///
    /// `startup` commands are queued ahead of the first poll. When the
    /// receive loop fails, a transmit fails, or the
    /// [`shutdown_token`](Self::shutdown_token) is cancelled, polling stops,
    /// the receive loop is told to stop, and the command channel is drained.
    ///
    /// # Errors
    ///
    /// Returns the fatal receive error or the first transmit error.
    pub async fn run<S>(self, sink: S, startup: Vec<Command>) -> Result<()>
    where
        S: EventSink + Send + 'static,
    {
        let Self {
            transport,
            config,
            dispatcher,
            tx,
            rx,
            shutdown,
        } = self;

        let stop = shutdown.child_token();
        let codec = *dispatcher.codec();
        let mut transmitter = tokio::spawn(transmit_loop(
            Arc::clone(&transport),
            codec,
            rx,
            stop.clone(),
        ));

        for command in startup {
            info!(?command, "submitting command");
            if tx.send(command).await.is_err() {
                // The transmitter is gone; report why.
                return Err(flatten(transmitter.await)
                    .err()
                    .unwrap_or(R48xxError::ChannelClosed));
            }
        }

        let poller = match config.scheduler() {
            Some(scheduler) => Some(scheduler.spawn(tx.clone())?),
            None => None,
        };
        drop(tx);

        info!(interface = %config.interface, "monitor running");
        let receive_stop = stop.clone();
        let mut receiver = tokio::task::spawn_blocking(move || {
            receive_loop(&*transport, &dispatcher, sink, &receive_stop)
        });

        let mut received = None;
        let mut transmitted = None;
        loop {
            tokio::select! {
                joined = &mut receiver => {
                    received = Some(flatten(joined));
                    break;
                }
                joined = &mut transmitter, if transmitted.is_none() => {
                    let result = flatten(joined);
                    let failed = result.is_err();
                    transmitted = Some(result);
                    if failed {
                        break;
                    }
                }
                () = stop.cancelled() => {
                    info!("shutdown requested");
                    break;
                }
            }
        }

        stop.cancel();
        if let Some(poller) = poller {
            poller.stop().await;
        }

        let transmitted = match transmitted {
            Some(result) => result,
            None => flatten(transmitter.await),
        };
        let received = match received {
            Some(result) => result,
            None => flatten(receiver.await),
        };

        info!("monitor stopped");
        received.and(transmitted)
    }
}

impl<T> std::fmt::Debug for Monitor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("config", &self.config)
            .finish()
    }
}

fn flatten(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    joined.unwrap_or_else(|join| Err(R48xxError::Io(std::io::Error::other(join))))
}

/// Reads frames and dispatches them until `stop` is cancelled or the
/// transport fails.
///
/// Non-fatal receive errors are logged and skipped. `stop` is checked after
/// every `recv`, so the transport's read timeout bounds how long shutdown
/// takes.
///
/// # Errors
///
/// Returns the first error for which [`R48xxError::is_fatal`] holds.
pub fn receive_loop<T, S>(
    transport: &T,
    dispatcher: &Dispatcher,
    mut sink: S,
    stop: &CancellationToken,
) -> Result<()>
where
    T: FrameTransport + ?Sized,
    S: EventSink,
{
    let mut accumulator = SnapshotAccumulator::new();
    while !stop.is_cancelled() {
        match transport.recv() {
            Ok(frame) => {
                dispatcher.dispatch(&frame, &mut accumulator, &mut sink);
            }
            Err(R48xxError::Timeout) => {}
            Err(e) if e.is_fatal() => {
                error!("receive failed: {}", e);
                return Err(e);
            }
            Err(e) => warn!("skipping frame: {}", e),
        }
    }
    debug!("receive loop stopped");
    Ok(())
}

async fn transmit_loop<T>(
    transport: Arc<T>,
    codec: FrameCodec,
    mut rx: Receiver<Command>,
    stop: CancellationToken,
) -> Result<()>
where
    T: FrameTransport + ?Sized,
{
    loop {
        let command = tokio::select! {
            command = rx.recv() => match command {
                Some(command) => command,
                None => return Ok(()),
            },
            () = stop.cancelled() => break,
        };
        transmit(&*transport, &codec, command)?;
    }

    // Flush whatever was queued before shutdown.
    while let Ok(command) = rx.try_recv() {
        transmit(&*transport, &codec, command)?;
    }
    Ok(())
}

fn transmit<T>(transport: &T, codec: &FrameCodec, command: Command) -> Result<()>
where
    T: FrameTransport + ?Sized,
{
    let frame = codec.encode(command);
    trace!("tx {}", format_frame(&frame));
    transport.send(&frame).map_err(|e| {
        error!("transmit failed: {}", e);
        e
    })
}
