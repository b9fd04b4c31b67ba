use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative stop flag shared by the harness and its workers.
///
/// Workers check it once per iteration; raising it never interrupts an I/O call in flight.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    raised: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this signal to stop after its current iteration
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let signal = StopSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_raised());

        signal.raise();
        assert!(clone.is_raised());
    }

    #[test]
    fn test_raise_from_other_thread() {
        let signal = StopSignal::new();
        let remote = signal.clone();
        std::thread::spawn(move || remote.raise()).join().unwrap();
        assert!(signal.is_raised());
    }
}
