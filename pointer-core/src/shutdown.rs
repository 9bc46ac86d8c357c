//! Cooperative shutdown shared by both pipeline roles

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation token: cheap to clone, every clone observes the same state.
///
/// Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    cancelled: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_signal_starts_clear() {
        assert!(!ShutdownSignal::new().is_cancelled());
    }

    #[test]
    fn test_cancel_is_visible_to_clones_across_threads() {
        let signal = ShutdownSignal::new();
        let observer = signal.clone();
        let handle = thread::spawn(move || {
            while !observer.is_cancelled() {
                thread::yield_now();
            }
            true
        });
        signal.cancel();
        assert!(handle.join().unwrap());
        assert!(signal.is_cancelled());
    }
}
