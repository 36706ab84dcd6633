//! Cancellation signal for interruptible lock waits

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shareable flag that cancels a pending device-lock wait
///
/// Clones share the same flag. Raising it makes any operation currently
/// blocked on a contended device lock fail with
/// [`ScullError::Interrupted`](crate::ScullError::Interrupted) without touching
/// the device.
#[derive(Debug, Clone, Default)]
pub struct Signal {
    raised: Arc<AtomicBool>,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver the signal
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Acknowledge the signal so later waits can block again
    pub fn clear(&self) {
        self.raised.store(false, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}
