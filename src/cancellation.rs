//! Cooperative stop signal for batch processing.
//!
//! A batch checks its token between items. Items already past the check run to
//! completion; the rest are reported as cancelled.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{CoreError, CoreResult};

/// Shared cancellation flag
///
/// Clones share one flag. A child token also observes every ancestor, so
/// cancelling a parent stops work that was handed a child.
///
/// # Examples
///
/// ```
/// use fakecheck_core::CancellationToken;
///
/// let shutdown = CancellationToken::new();
/// let batch = shutdown.child_token();
///
/// batch.cancel();
/// assert!(!shutdown.is_cancelled());
///
/// let next_batch = shutdown.child_token();
/// shutdown.cancel();
/// assert!(next_batch.is_cancelled());
/// assert!(next_batch.check().is_err());
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    cancelled: AtomicBool,
    parent: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::build(None, None)
    }

    /// A token that reports cancelled once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(None, Instant::now().checked_add(timeout))
    }

    fn build(parent: Option<CancellationToken>, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                parent,
                deadline,
            }),
        }
    }

    /// A token cancelled when either it or `self` is cancelled.
    pub fn child_token(&self) -> Self {
        Self::build(Some(self.clone()), None)
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::AcqRel) {
            tracing::debug!("cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return true;
        }
        if let Some(deadline) = self.inner.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        match &self.inner.parent {
            Some(parent) => parent.is_cancelled(),
            None => false,
        }
    }

    /// `Err(CoreError::Cancelled)` once cancellation was requested.
    pub fn check(&self) -> CoreResult<()> {
        if self.is_cancelled() {
            Err(CoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("has_parent", &self.inner.parent.is_some())
            .finish()
    }
}
