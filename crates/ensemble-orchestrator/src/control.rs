//! Pause, continue and cancel signals for a run.
//!
//! A [`RunControl`] is created per run and threaded through the driver call
//! chain, so two runs in the same process never observe each other's flags.
//! Clones share the same flags; hand one clone to the driver and keep another
//! wherever pause or cancel requests originate.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::{debug, info};

#[derive(Default)]
struct ControlFlags {
    pause_requested: AtomicBool,
    continue_signal: AtomicBool,
    cancel_requested: AtomicBool,
    notify: Notify,
}

/// How a driver left the pause wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseExit {
    /// A continue signal arrived.
    Resumed,
    /// A cancel request arrived; it always wins over a pending continue.
    Cancelled,
}

/// Run-scoped cooperative control token.
#[derive(Clone, Default)]
pub struct RunControl {
    flags: Arc<ControlFlags>,
}

impl fmt::Debug for RunControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunControl")
            .field("paused", &self.is_paused())
            .field("continue", &self.should_continue())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl RunControl {
    /// Creates a token with every flag cleared.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the driver to park at the next step boundary.
    pub fn request_pause(&self) {
        self.flags.pause_requested.store(true, Ordering::SeqCst);
        info!("Pause requested");
    }

    /// Withdraws a pause request that has not been observed yet.
    pub fn clear_pause(&self) {
        self.flags.pause_requested.store(false, Ordering::SeqCst);
    }

    /// Checks whether a pause is requested.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.flags.pause_requested.load(Ordering::SeqCst)
    }

    /// Lets a paused driver continue.
    pub fn signal_continue(&self) {
        self.flags.continue_signal.store(true, Ordering::SeqCst);
        self.flags.notify.notify_one();
        info!("Continue signalled");
    }

    /// Checks whether a continue signal is pending.
    #[must_use]
    pub fn should_continue(&self) -> bool {
        self.flags.continue_signal.load(Ordering::SeqCst)
    }

    /// Consumes a pending continue signal.
    pub fn clear_continue(&self) {
        self.flags.continue_signal.store(false, Ordering::SeqCst);
    }

    /// Asks the driver to stop at the next step boundary, or immediately if
    /// it is parked in a pause.
    pub fn request_cancel(&self) {
        self.flags.cancel_requested.store(true, Ordering::SeqCst);
        self.flags.notify.notify_one();
        info!("Cancel requested");
    }

    /// Checks whether a cancel is requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flags.cancel_requested.load(Ordering::SeqCst)
    }

    /// Withdraws a cancel request.
    pub fn clear_cancel(&self) {
        self.flags.cancel_requested.store(false, Ordering::SeqCst);
    }

    /// Clears every flag.
    pub fn reset(&self) {
        self.clear_pause();
        self.clear_continue();
        self.clear_cancel();
        debug!("Control flags reset");
    }

    /// Parks until a continue signal or a cancel request arrives.
    ///
    /// On resume the pause request and the continue signal are both
    /// consumed. Cancellation is checked first on every wake-up.
    pub async fn wait_while_paused(&self) -> PauseExit {
        loop {
            if self.is_cancelled() {
                return PauseExit::Cancelled;
            }
            if self.should_continue() {
                self.clear_continue();
                self.clear_pause();
                return PauseExit::Resumed;
            }
            // notify_one stores a permit, so a signal raised between the
            // checks above and this await is not lost.
            self.flags.notify.notified().await;
        }
    }
}
