//! Per-call deadline and cancellation.
//!
//! A [`CallContext`] travels with every `identify`/`authorize` call. The
//! resolver bounds each stage (cache lookup, authority call) by the earlier of
//! the context deadline and the stage's own configured timeout, and aborts the
//! in-flight stage as soon as the caller's [`CancellationToken`] fires.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

/// Cooperative cancellation signal shared between a caller and the calls it
/// issued. Cloning yields another handle to the same signal.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    /// Creates a new, not-yet-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the token as cancelled and wakes pending waiters.
    pub fn cancel(&self) {
        let already_cancelled = self.inner.cancelled.swap(true, Ordering::SeqCst);
        if !already_cancelled {
            self.inner.notify.notify_waiters();
        }
    }

    /// Returns true when cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register interest before checking the flag so a concurrent
        // `cancel` between the check and the await is not lost.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Why a stage run under a [`CallContext`] did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    DeadlineExceeded,
    Cancelled,
}

/// Deadline and cancellation carried by a single call.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancellation: Option<CancellationToken>,
}

impl CallContext {
    /// A context with no deadline and no cancellation. Stage timeouts from
    /// the resolver configuration still apply.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().deadline_at(Instant::now() + timeout)
    }

    /// Tighten the deadline. A later deadline than the current one is ignored.
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Time left before the context deadline, if it has one.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Deadline for a stage allowed at most `stage_timeout`.
    pub fn stage_deadline(&self, stage_timeout: Duration) -> Instant {
        let stage = Instant::now() + stage_timeout;
        match self.deadline {
            Some(deadline) => deadline.min(stage),
            None => stage,
        }
    }

    /// Time budget for a stage allowed at most `stage_timeout`.
    pub fn stage_budget(&self, stage_timeout: Duration) -> Duration {
        match self.remaining() {
            Some(remaining) => remaining.min(stage_timeout),
            None => stage_timeout,
        }
    }

    /// Run `fut` bounded by the stage deadline and the cancellation token.
    ///
    /// An already-cancelled token wins over a ready future.
    pub async fn run<F>(&self, stage_timeout: Duration, fut: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        let timed = tokio::time::timeout_at(self.stage_deadline(stage_timeout), fut);
        match &self.cancellation {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(Interrupted::Cancelled),
                    result = timed => result.map_err(|_| Interrupted::DeadlineExceeded),
                }
            }
            None => timed.await.map_err(|_| Interrupted::DeadlineExceeded),
        }
    }
}
