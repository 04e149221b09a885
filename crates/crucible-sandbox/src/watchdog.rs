//! Wall-clock budget enforcement for a running guest.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use extism::CancelHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How often the watchdog checks the budget and the cancellation token.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Why the watchdog stopped the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trigger {
    /// The wall-clock budget elapsed.
    Budget,
    /// The caller cancelled the request.
    Cancelled,
}

const NONE: u8 = 0;
const BUDGET: u8 = 1;
const CANCELLED: u8 = 2;

/// Background thread interrupting a guest that overruns its budget or
/// whose request was cancelled.
pub(crate) struct Watchdog {
    done: Arc<AtomicBool>,
    trigger: Arc<AtomicU8>,
    thread: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Start watching. `interrupted` is raised together with the cancel
    /// handle so sleeping host calls return promptly.
    pub(crate) fn spawn(
        budget: Duration,
        cancel: Option<CancellationToken>,
        handle: CancelHandle,
        interrupted: Arc<AtomicBool>,
    ) -> Self {
        let done = Arc::new(AtomicBool::new(false));
        let trigger = Arc::new(AtomicU8::new(NONE));
        let started = Instant::now();

        let thread = {
            let done = Arc::clone(&done);
            let trigger = Arc::clone(&trigger);
            std::thread::Builder::new()
                .name("crucible-watchdog".to_owned())
                .spawn(move || {
                    while !done.load(Ordering::SeqCst) {
                        let fired = if cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                            CANCELLED
                        } else if started.elapsed() >= budget {
                            BUDGET
                        } else {
                            NONE
                        };
                        if fired != NONE {
                            trigger.store(fired, Ordering::SeqCst);
                            interrupted.store(true, Ordering::SeqCst);
                            if let Err(e) = handle.cancel() {
                                debug!(error = %e, "Cancel handle refused; relying on manifest timeout");
                            }
                            return;
                        }
                        std::thread::sleep(POLL_INTERVAL);
                    }
                })
                .ok()
        };

        Self {
            done,
            trigger,
            thread,
        }
    }

    /// Stop watching and report whether the guest was interrupted.
    pub(crate) fn finish(mut self) -> Option<Trigger> {
        self.stop();
        match self.trigger.load(Ordering::SeqCst) {
            BUDGET => Some(Trigger::Budget),
            CANCELLED => Some(Trigger::Cancelled),
            _ => None,
        }
    }

    fn stop(&mut self) {
        self.done.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}
