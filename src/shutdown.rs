//! Cooperative shutdown signalling for the monitor loops.
//!
//! A [`ShutdownSignal`] is constructed explicitly and handed to whoever
//! spawns background loops; there is no process-wide flag. Loops poll
//! `is_shutdown()` between ticks and exit promptly when it flips.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable handle used to stop background loops.
#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Create a fresh, untriggered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request shutdown. All clones of this signal observe it.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}
