use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::LayoutError;

/// Cooperative cancellation flag shared between a caller and a running
/// computation. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Polled at iteration boundaries.
    pub fn check(&self) -> Result<(), LayoutError> {
        if self.is_cancelled() {
            Err(LayoutError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancellationToken::new();
        let observer = token.clone();
        assert!(observer.check().is_ok());
        token.cancel();
        assert!(observer.is_cancelled());
        assert_eq!(observer.check(), Err(LayoutError::Cancelled));
    }
}
