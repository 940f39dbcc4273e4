//! Cache-backed, single-flight architecture resolution.
//!
//! [`CachingResolver`] is constructed once and shared (behind an `Arc`) by
//! every component that needs image architectures. Concurrent lookups of the
//! same [`ContainerImageRef`] share one remote inspection: the first caller
//! starts a background lookup and every caller, first included, awaits the
//! same shared result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, warn};

use archgate_core::{ArchitectureSet, ContainerImageRef};

use crate::cache::ArchitectureCache;
use crate::credentials::PullCredentials;
use crate::error::{ResolveError, Result};
use crate::inspector::ImageInspector;

/// Maps an image reference to the architectures it supports.
#[async_trait]
pub trait ArchitectureResolver: Send + Sync {
    /// Resolve the architectures of an image.
    ///
    /// # Errors
    ///
    /// Returns the inspection error for the image. Errors are never cached.
    async fn resolve(
        &self,
        image: &ContainerImageRef,
        credentials: &PullCredentials,
    ) -> Result<ArchitectureSet>;
}

/// Resolver configuration.
#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    /// Expire cache entries after this long. `None` keeps them for the
    /// lifetime of the process.
    pub cache_ttl: Option<Duration>,
}

type Flight = Shared<BoxFuture<'static, Result<ArchitectureSet>>>;

/// The production [`ArchitectureResolver`].
pub struct CachingResolver {
    inspector: Arc<dyn ImageInspector>,
    cache: Arc<ArchitectureCache>,
    in_flight: Arc<Mutex<HashMap<ContainerImageRef, Flight>>>,
}

impl CachingResolver {
    /// Create a resolver over an inspector.
    #[must_use]
    pub fn new(inspector: Arc<dyn ImageInspector>, config: ResolverConfig) -> Self {
        let cache = match config.cache_ttl {
            Some(ttl) => ArchitectureCache::with_ttl(ttl),
            None => ArchitectureCache::new(),
        };
        Self {
            inspector,
            cache: Arc::new(cache),
            in_flight: Arc::default(),
        }
    }

    /// The underlying cache.
    #[must_use]
    pub fn cache(&self) -> &ArchitectureCache {
        &self.cache
    }

    /// Number of lookups currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    fn cached(&self, image: &ContainerImageRef) -> Option<ArchitectureSet> {
        if image.skip_cache() {
            return None;
        }
        self.cache.get(image.name())
    }

    /// Start a background lookup. The caller must hold the in-flight lock.
    fn start_flight(&self, image: ContainerImageRef, credentials: PullCredentials) -> Flight {
        let inspector = Arc::clone(&self.inspector);
        let cache = Arc::clone(&self.cache);
        let in_flight = Arc::clone(&self.in_flight);
        let key = image.clone();

        // Spawned so that the lookup completes even if every waiter is cancelled.
        let task = tokio::spawn(async move {
            debug!(image = %image, "Inspecting image");
            let result = inspector
                .inspect(image.name(), &credentials)
                .await
                .and_then(|set| {
                    if set.is_empty() {
                        Err(ResolveError::ManifestParse(format!(
                            "{}: no architectures reported",
                            image.name()
                        )))
                    } else {
                        Ok(set)
                    }
                });

            match &result {
                Ok(set) if !image.skip_cache() => cache.insert(image.name(), set.clone()),
                Ok(_) => {}
                Err(e) => warn!(image = %image, error = %e, "Image inspection failed"),
            }
            // Cache first, then leave the in-flight map, so no caller can miss both.
            in_flight.lock().remove(&image);
            result
        });

        let in_flight = Arc::clone(&self.in_flight);
        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    in_flight.lock().remove(&key);
                    Err(ResolveError::Internal(format!("{}: lookup task failed: {e}", key.name())))
                }
            }
        }
        .boxed()
        .shared()
    }
}

#[async_trait]
impl ArchitectureResolver for CachingResolver {
    async fn resolve(
        &self,
        image: &ContainerImageRef,
        credentials: &PullCredentials,
    ) -> Result<ArchitectureSet> {
        if let Some(hit) = self.cached(image) {
            debug!(image = %image, architectures = %hit, "Architecture cache hit");
            return Ok(hit);
        }

        let flight = {
            let mut in_flight = self.in_flight.lock();
            if let Some(flight) = in_flight.get(image) {
                flight.clone()
            } else {
                // A flight may have finished between the cache check and the lock.
                if let Some(hit) = self.cached(image) {
                    return Ok(hit);
                }
                let flight = self.start_flight(image.clone(), credentials.clone());
                in_flight.insert(image.clone(), flight.clone());
                flight
            }
        };

        flight.await
    }
}
