// Realtime polling with cooperative cancellation.
// - The poller repeats one read-and-render cycle on the calling thread.
// - A detached listener thread waits for one acknowledgment from the operator
//   and then flips a shared `CancelToken`. Ctrl-C reaches the same token
//   through `Interrupts`.
// - The token is checked before every read and throughout every pause, so
//   cancellation lands within one sleep slice. An in-flight read is never
//   aborted.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::Failure;

/// Pause between successful reads.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Pause after a failed read before trying again.
pub const FAILURE_BACKOFF: Duration = Duration::from_secs(3);

/// Granularity at which a pause notices cancellation.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// One-shot cancellation flag shared between the poller and its listener.
/// Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Returns true only for the call that performed the
    /// false to true transition.
    pub fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Routes an external interrupt (Ctrl-C) to the poll loop that is currently
/// running. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct Interrupts {
    active: Arc<Mutex<Option<CancelToken>>>,
}

impl Interrupts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the running loop. Returns false when no loop is running, in
    /// which case the interrupt is the caller's to handle.
    pub fn interrupt(&self) -> bool {
        match self.active.lock().as_ref() {
            Some(token) => {
                if token.cancel() {
                    info!("poll interrupted");
                }
                true
            }
            None => false,
        }
    }

    fn arm(&self, token: &CancelToken) -> Armed<'_> {
        *self.active.lock() = Some(token.clone());
        Armed(self)
    }
}

/// Clears the active slot when the loop that armed it returns.
struct Armed<'a>(&'a Interrupts);

impl Drop for Armed<'_> {
    fn drop(&mut self) {
        self.0.active.lock().take();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Running,
    Stopping,
    Stopped,
}

/// What a finished loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    pub reads: u64,
    pub failures: u64,
    pub state: PollState,
}

/// Fixed-interval poller. Both durations are constants of the session.
#[derive(Debug, Clone)]
pub struct PollLoop {
    interval: Duration,
    failure_backoff: Duration,
    slice: Duration,
    interrupts: Option<Interrupts>,
}

impl Default for PollLoop {
    fn default() -> Self {
        PollLoop::new(POLL_INTERVAL, FAILURE_BACKOFF)
    }
}

impl PollLoop {
    pub fn new(interval: Duration, failure_backoff: Duration) -> Self {
        PollLoop {
            interval,
            failure_backoff,
            slice: SLEEP_SLICE,
            interrupts: None,
        }
    }

    /// Let `interrupts` cancel whichever loop this poller is running.
    pub fn with_interrupts(mut self, interrupts: Interrupts) -> Self {
        self.interrupts = Some(interrupts);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn failure_backoff(&self) -> Duration {
        self.failure_backoff
    }

    /// Spawn a detached listener that runs `wait_for_ack` once and then
    /// cancels, and poll on this thread until it does.
    pub fn start<T, W, R, D>(&self, wait_for_ack: W, read: R, render: D) -> PollReport
    where
        W: FnOnce() + Send + 'static,
        R: FnMut() -> Result<T, Failure>,
        D: FnMut(u64, &Result<T, Failure>),
    {
        let token = CancelToken::new();
        let listener = token.clone();
        // Never joined: by the time the loop stops the listener has already
        // finished its only task.
        thread::spawn(move || {
            wait_for_ack();
            if listener.cancel() {
                debug!("poll cancellation requested");
            }
        });
        self.run(&token, read, render)
    }

    /// Poll until `token` is cancelled. Failed reads are rendered and retried
    /// after the failure backoff; they never end the loop.
    pub fn run<T, R, D>(&self, token: &CancelToken, mut read: R, mut render: D) -> PollReport
    where
        R: FnMut() -> Result<T, Failure>,
        D: FnMut(u64, &Result<T, Failure>),
    {
        let _armed = self.interrupts.as_ref().map(|interrupts| interrupts.arm(token));
        let mut state = PollState::Running;
        let mut reads = 0;
        let mut failures = 0;

        while state == PollState::Running {
            if token.is_cancelled() {
                state = PollState::Stopping;
                continue;
            }

            reads += 1;
            let outcome = read();
            render(reads, &outcome);

            let pause = match &outcome {
                Ok(_) => self.interval,
                Err(e) => {
                    failures += 1;
                    debug!(iteration = reads, error = %e, "poll read failed, backing off");
                    self.failure_backoff
                }
            };

            if !self.pause(token, pause) {
                state = PollState::Stopping;
            }
        }

        debug!(?state, "poll loop winding down");
        state = PollState::Stopped;
        info!(reads, failures, "poll loop stopped");
        PollReport {
            reads,
            failures,
            state,
        }
    }

    /// Sleep for `duration` in short slices. Returns false as soon as the
    /// token is seen cancelled, before, during or after the sleep.
    fn pause(&self, token: &CancelToken, duration: Duration) -> bool {
        if token.is_cancelled() {
            return false;
        }
        let deadline = Instant::now() + duration;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(self.slice.min(deadline - now));
            if token.is_cancelled() {
                return false;
            }
        }
        !token.is_cancelled()
    }
}
