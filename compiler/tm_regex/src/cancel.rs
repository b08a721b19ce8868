//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::MatchError;

/// Caller-owned cancellation flag.
///
/// Cloning shares the flag: cancel from any clone, observe from all. The
/// default token is never cancelled unless someone calls [`cancel`](Self::cancel).
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// `Err(MatchError::Cancelled)` once cancelled.
    ///
    /// # Errors
    /// Returns [`MatchError::Cancelled`] if the token has fired.
    #[inline]
    pub fn check(&self) -> Result<(), MatchError> {
        if self.is_cancelled() {
            Err(MatchError::Cancelled)
        } else {
            Ok(())
        }
    }
}
