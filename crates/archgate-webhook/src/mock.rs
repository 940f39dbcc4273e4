//! In-memory [`GatedPodNotifier`] for tests.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::confirm::GatedPodNotifier;
use crate::error::ConfirmationError;

/// A notifier whose pod appears after a fixed number of lookups.
#[derive(Debug)]
pub struct MockGatedPodNotifier {
    visible_after: Option<u32>,
    error: Option<ConfirmationError>,
    lookups: AtomicU32,
    events: Mutex<Vec<(String, String)>>,
}

impl MockGatedPodNotifier {
    fn with(visible_after: Option<u32>, error: Option<ConfirmationError>) -> Self {
        Self {
            visible_after,
            error,
            lookups: AtomicU32::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    /// The pod is not found for the first `misses` lookups.
    #[must_use]
    pub fn visible_after(misses: u32) -> Self {
        Self::with(Some(misses), None)
    }

    /// The pod never shows up.
    #[must_use]
    pub fn never_visible() -> Self {
        Self::with(None, None)
    }

    /// Every lookup fails with `error`.
    #[must_use]
    pub fn failing(error: ConfirmationError) -> Self {
        Self::with(None, Some(error))
    }

    /// Number of lookups performed.
    pub fn lookups(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }

    /// `(namespace, name)` of every emitted event.
    pub fn events(&self) -> Vec<(String, String)> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl GatedPodNotifier for MockGatedPodNotifier {
    async fn notify_gated(&self, namespace: &str, name: &str) -> Result<(), ConfirmationError> {
        let previous = self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        match self.visible_after {
            Some(misses) if previous >= misses => {
                self.events
                    .lock()
                    .push((namespace.to_string(), name.to_string()));
                Ok(())
            }
            _ => Err(ConfirmationError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
        }
    }
}
