//! Fixed-cadence tick scheduling for live timer displays.
//!
//! A [`Ticker`] runs a callback on a tokio task at a fixed period until it is
//! cancelled. Ticks exist to trigger re-rendering only; elapsed time always
//! comes from [`crate::clock`], so a missed or late tick never skews a
//! duration. Missed ticks are skipped rather than bursted.
//!
//! Cancellation is deterministic: after [`Ticker::shutdown`] resolves, the
//! task has been joined and no further tick callback can run.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Cadence for a session-level elapsed display.
pub const SESSION_TICK: Duration = Duration::from_secs(1);

/// Cadence for a contraction-level elapsed display. Contractions are short
/// enough that the UI shows them at sub-second granularity.
pub const CONTRACTION_TICK: Duration = Duration::from_millis(100);

/// A cancellable repeating callback.
pub struct Ticker {
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawns a task invoking `on_tick` every `period`.
    ///
    /// The first tick fires immediately, matching a display that renders as
    /// soon as it appears.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = interval.tick() => on_tick(),
                }
            }
        });
        Self {
            cancel_token,
            handle: Some(handle),
        }
    }

    /// Requests cancellation without waiting for the task to finish.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Cancels and joins the task. Once this resolves no further tick
    /// callback will run.
    pub async fn shutdown(mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
