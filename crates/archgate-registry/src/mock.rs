//! In-memory image inspector for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use archgate_core::{normalize_image_name, ArchitectureSet};

use crate::credentials::PullCredentials;
use crate::error::{ResolveError, Result};
use crate::inspector::ImageInspector;

/// A programmable [`ImageInspector`].
///
/// Images are registered by any spelling and matched by normalized name.
/// Unknown images resolve to [`ResolveError::NotFound`].
#[derive(Debug, Default)]
pub struct MockImageInspector {
    images: RwLock<HashMap<String, Result<ArchitectureSet>>>,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl MockImageInspector {
    /// Create an inspector that knows no images.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image and the architectures it supports.
    ///
    /// # Panics
    ///
    /// Panics if `image` is not a valid reference.
    #[must_use]
    pub fn with_image(self, image: &str, architectures: &[&str]) -> Self {
        let set = architectures.iter().copied().collect();
        self.images.write().insert(normalized(image), Ok(set));
        self
    }

    /// Register an image whose inspection fails.
    ///
    /// # Panics
    ///
    /// Panics if `image` is not a valid reference.
    #[must_use]
    pub fn with_error(self, image: &str, error: ResolveError) -> Self {
        self.images.write().insert(normalized(image), Err(error));
        self
    }

    /// Delay every inspection, to widen concurrency windows in tests.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Change an image's architectures after construction.
    pub fn set_image(&self, image: &str, architectures: &[&str]) {
        let set = architectures.iter().copied().collect();
        self.images.write().insert(normalized(image), Ok(set));
    }

    /// Number of inspections performed so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[allow(clippy::expect_used)]
fn normalized(image: &str) -> String {
    normalize_image_name(image).expect("mock image must be a valid reference")
}

#[async_trait]
impl ImageInspector for MockImageInspector {
    async fn inspect(&self, image: &str, _credentials: &PullCredentials) -> Result<ArchitectureSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.images
            .read()
            .get(image)
            .cloned()
            .unwrap_or_else(|| Err(ResolveError::NotFound(image.to_string())))
    }
}
