//! Cancellation handle carried by every request.
//!
//! # Design
//! A `Context` is a cheap, clonable flag plus an optional deadline, chained
//! to its parent. Dispatch is synchronous, so there is no timer behind a
//! deadline: the terminal handler checks the context before calling the
//! transport, and the transport reads `remaining()` to bound its own I/O.
//! A context derived for a per-request timeout is cancelled as soon as the
//! request completes.
//!
//! Cancellation is observed at the dispatch boundary only. A `cancel()` from
//! another thread while the transport is blocked on I/O takes effect when
//! the transport call returns; the deadline, by contrast, is enforced inside
//! the transport through its own timeout.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Error;

#[derive(Clone, Default)]
pub struct Context {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<Context>,
}

impl Context {
    /// A root context that is never done unless cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// Child context that expires after `timeout`. A timeout too large to
    /// represent as an instant yields a child with no deadline of its own.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.child(Instant::now().checked_add(timeout))
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        self.child(Some(deadline))
    }

    fn child(&self, deadline: Option<Instant>) -> Self {
        Context {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline,
                parent: Some(self.clone()),
            }),
        }
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
            || self.inner.parent.as_ref().is_some_and(Context::is_cancelled)
    }

    /// Earliest deadline along the parent chain.
    pub fn deadline(&self) -> Option<Instant> {
        let parent = self.inner.parent.as_ref().and_then(Context::deadline);
        match (self.inner.deadline, parent) {
            (Some(own), Some(parent)) => Some(own.min(parent)),
            (own, parent) => own.or(parent),
        }
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Why the context is done, if it is.
    pub fn err(&self) -> Option<Error> {
        if self.is_cancelled() {
            return Some(Error::Canceled);
        }
        match self.deadline() {
            Some(deadline) if Instant::now() >= deadline => Some(Error::Timeout),
            _ => None,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.is_cancelled())
            .field("deadline", &self.deadline())
            .finish()
    }
}

/// Request extension marking a context derived from a per-request timeout.
#[derive(Clone, Debug)]
pub(crate) struct TimeoutScope(pub(crate) Context);

/// Cancels the wrapped context when dropped.
pub(crate) struct CancelOnDrop(pub(crate) Context);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}
