//! Cooperative cancellation, query deadlines and throttling.
//!
//! The deadline is plain data: long-running operations call
//! [`Cancellation::check`] at their loop heads, and a statement that
//! never checks cannot be canceled. There is no watchdog task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use super::Error;

/// Deadline value meaning "canceled immediately".
const CANCELED: u64 = 1;

/// Per-statement deadline and throttle state.
pub struct Cancellation {
    epoch: Instant,
    /// Deadline in microseconds since `epoch`, offset by one so zero
    /// means "no deadline armed". Shared with [`CancelHandle`]s.
    cancel_at: Arc<AtomicU64>,
    throttle: Duration,
    throttle_grace: Duration,
    last_throttle: Option<Instant>,
    statement_start: Option<Instant>,
}

impl std::fmt::Debug for Cancellation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cancellation")
            .field("armed", &(self.cancel_at.load(Ordering::SeqCst) != 0))
            .field("throttle", &self.throttle)
            .finish()
    }
}

impl Cancellation {
    pub fn new(throttle_grace: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            cancel_at: Arc::new(AtomicU64::new(0)),
            throttle: Duration::ZERO,
            throttle_grace,
            last_throttle: None,
            statement_start: None,
        }
    }

    fn now(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64 + 1
    }

    /// Handle other tasks can use to cancel the current statement.
    pub fn handle(&self) -> CancelHandle {
        CancelHandle {
            cancel_at: self.cancel_at.clone(),
        }
    }

    /// Arm the deadline for a statement about to execute.
    pub fn set_current_statement(&mut self, timeout: Duration) {
        self.statement_start = Some(Instant::now());
        if !timeout.is_zero() {
            let deadline = self.now() + timeout.as_micros() as u64;
            self.cancel_at.store(deadline, Ordering::SeqCst);
        }
    }

    /// Drop any armed deadline.
    pub fn disarm(&mut self) {
        self.cancel_at.store(0, Ordering::SeqCst);
    }

    /// Force the deadline into the past: the next [`check`](Self::check)
    /// fails.
    pub fn cancel(&self) {
        self.cancel_at.store(CANCELED, Ordering::SeqCst);
    }

    /// A deadline is armed.
    pub fn armed(&self) -> bool {
        self.cancel_at.load(Ordering::SeqCst) != 0
    }

    /// When the current statement started executing.
    pub fn statement_start(&self) -> Option<Instant> {
        self.statement_start
    }

    pub fn set_throttle(&mut self, throttle: Duration) {
        self.throttle = throttle;
    }

    pub fn throttle_value(&self) -> Duration {
        self.throttle
    }

    /// The single cooperative check point. Applies throttling, then the
    /// deadline: reaching it clears the deadline and fails exactly once;
    /// later checks pass until a new statement is armed.
    pub async fn check(&mut self) -> Result<(), Error> {
        self.throttle().await;

        let deadline = self.cancel_at.load(Ordering::SeqCst);
        if deadline == 0 {
            return Ok(());
        }
        if self.now() >= deadline {
            self.cancel_at.store(0, Ordering::SeqCst);
            return Err(Error::StatementCanceled);
        }

        Ok(())
    }

    /// Slow the calling task down if a throttle is configured.
    ///
    /// Never sleeps more often than once per the grace interval, so
    /// tight check loops don't degrade into a storm of short sleeps.
    /// A wakeup before the sleep elapses resumes normally.
    pub async fn throttle(&mut self) {
        if self.statement_start.is_none() {
            self.statement_start = Some(Instant::now());
        }
        if self.throttle.is_zero() {
            return;
        }

        let now = Instant::now();
        if let Some(last) = self.last_throttle {
            if now < last + self.throttle_grace {
                return;
            }
        }
        self.last_throttle = Some(now + self.throttle);

        sleep(self.throttle).await;
    }
}

/// Cloneable handle that cancels the statement currently executing on
/// its session.
#[derive(Clone)]
pub struct CancelHandle {
    cancel_at: Arc<AtomicU64>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancel_at.store(CANCELED, Ordering::SeqCst);
    }
}
