//! Step-level progress reporting for the mint and creation flows.
//!
//! Percentages are fixed checkpoints, not derived from confirmation state;
//! they exist for display only and carry no correctness signal.

use std::sync::Arc;

/// One progress checkpoint.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub percent: u8,
    pub message: String,
}

/// Explicit progress callback handed to the orchestration functions.
#[derive(Clone)]
pub struct Progress(Option<Arc<dyn Fn(ProgressEvent) + Send + Sync>>);

impl Progress {
    /// Discard all progress events.
    pub fn none() -> Self {
        Self(None)
    }

    pub fn new(f: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        Self(Some(Arc::new(f)))
    }

    pub(crate) fn report(&self, percent: u8, message: impl Into<String>) {
        if let Some(f) = &self.0 {
            f(ProgressEvent {
                percent,
                message: message.into(),
            });
        }
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Progress")
            .field(&self.0.as_ref().map(|_| "callback"))
            .finish()
    }
}
