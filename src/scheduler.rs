//! Periodic telemetry polling.
//!
//! The [`PollScheduler`] posts [`Command::RequestTelemetry`] onto the same
//! submission channel used for one-shot commands. It never touches the
//! receive path; the transmitter serialises everything it posts.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use r48xx::{Command, PollScheduler};
//!
//! # async fn run() -> r48xx::Result<()> {
//! let (tx, mut rx) = tokio::sync::mpsc::channel::<Command>(16);
//! let poller = PollScheduler::new(Duration::from_secs(1))
//!     .with_initial_delay(Duration::from_millis(100))
//!     .spawn(tx)?;
//!
//! assert_eq!(rx.recv().await, Some(Command::RequestTelemetry));
//! poller.stop().await;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::codec::Command;
use crate::error::{R48xxError, Result};

/// Default time between telemetry requests.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default delay before the first request.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(100);

/// Timer-driven source of telemetry requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollScheduler {
    interval: Duration,
    initial_delay: Duration,
}

impl PollScheduler {
    /// Creates a scheduler with the given period and the default initial delay.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            initial_delay: DEFAULT_INITIAL_DELAY,
        }
    }

    /// Sets the delay before the first request.
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    /// Returns the polling period.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Checks that the period is usable.
    ///
    /// # Errors
    ///
    /// Returns `R48xxError::InvalidParameter` for a zero interval.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(R48xxError::invalid_parameter(
                "poll_interval",
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Starts posting requests on a tokio task.
    ///
    /// The task runs until [`PollHandle::stop`] is called or the receiving
    /// side of `commands` is dropped.
    ///
    /// # Errors
    ///
    /// Returns `R48xxError::InvalidParameter` for a zero interval; nothing is
    /// spawned in that case.
    pub fn spawn(self, commands: Sender<Command>) -> Result<PollHandle> {
        self.validate()?;
        let token = CancellationToken::new();
        let task_token = token.clone();

        let join = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.initial_delay, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval = ?self.interval, "telemetry polling started");

            loop {
                tokio::select! {
                    () = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        debug!("requesting telemetry");
                        let sent = tokio::select! {
                            () = task_token.cancelled() => break,
                            sent = commands.send(Command::RequestTelemetry) => sent,
                        };
                        if sent.is_err() {
                            debug!("command channel closed");
                            break;
                        }
                    }
                }
            }

            info!("telemetry polling stopped");
        });

        Ok(PollHandle { token, join })
    }
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

/// Handle to a running [`PollScheduler`].
#[derive(Debug)]
pub struct PollHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl PollHandle {
    /// Stops polling and waits for the task to finish.
    pub async fn stop(self) {
        self.token.cancel();
        let _ = self.join.await;
    }

    /// Returns whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio::sync::mpsc::error::TryRecvError;

    #[test]
    fn test_validate() {
        assert!(PollScheduler::new(Duration::ZERO).validate().is_err());
        assert!(PollScheduler::default().validate().is_ok());
        assert_eq!(PollScheduler::default().interval(), DEFAULT_POLL_INTERVAL);
    }

    #[tokio::test]
    async fn test_spawn_rejects_zero_interval() {
        let (tx, mut rx) = mpsc::channel(1);
        let result = PollScheduler::new(Duration::ZERO).spawn(tx);
        assert!(matches!(result, Err(R48xxError::InvalidParameter { .. })));

        // The sender went down with the rejected scheduler.
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_posts_after_initial_delay_then_steadily() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = PollScheduler::new(Duration::from_secs(1))
            .with_initial_delay(Duration::from_millis(250))
            .spawn(tx)
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(rx.try_recv(), Ok(Command::RequestTelemetry));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

        tokio::time::sleep(Duration::from_secs(3)).await;
        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 3);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = PollScheduler::new(Duration::from_secs(1))
            .with_initial_delay(Duration::ZERO)
            .spawn(tx)
            .unwrap();

        assert_eq!(rx.recv().await, Some(Command::RequestTelemetry));
        handle.stop().await;

        // Sender dropped with the task.
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exits_when_channel_closes() {
        let (tx, rx) = mpsc::channel(1);
        let handle = PollScheduler::new(Duration::from_millis(10)).spawn(tx).unwrap();
        drop(rx);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_channel_full() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = PollScheduler::new(Duration::from_millis(10)).spawn(tx).unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!handle.is_finished());
        handle.stop().await;
    }
}
