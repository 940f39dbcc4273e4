//! Architecture cache keyed by normalized image name.
//!
//! Entries live for the lifetime of the process unless a TTL is configured.
//! With a TTL, every insert also drops the entries that have expired, so the
//! map stays bounded by the images seen within one TTL window. Images pulled
//! with `Always` never reach this cache.

use std::collections::HashMap;
use std::time::Duration;

use archgate_core::ArchitectureSet;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// A cached resolution result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Architectures the image supports.
    pub architectures: ArchitectureSet,
    /// When the registry was consulted.
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        let Some(ttl) = ttl else {
            return false;
        };
        chrono::Duration::from_std(ttl).is_ok_and(|ttl| self.fetched_at + ttl <= now)
    }
}

/// A concurrent image → architectures cache.
#[derive(Debug, Default)]
pub struct ArchitectureCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Option<Duration>,
}

impl ArchitectureCache {
    /// Create a cache whose entries never expire.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache whose entries expire `ttl` after they were fetched.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::default(),
            ttl: Some(ttl),
        }
    }

    /// Get the cached architectures for an image, if present and fresh.
    #[must_use]
    pub fn get(&self, image: &str) -> Option<ArchitectureSet> {
        let now = Utc::now();
        self.entries
            .read()
            .get(image)
            .filter(|entry| !entry.is_expired(self.ttl, now))
            .map(|entry| entry.architectures.clone())
    }

    /// Insert or replace the architectures for an image, dropping expired
    /// entries on the way.
    pub fn insert(&self, image: impl Into<String>, architectures: ArchitectureSet) {
        let now = Utc::now();
        let entry = CacheEntry {
            architectures,
            fetched_at: now,
        };
        let mut entries = self.entries.write();
        if self.ttl.is_some() {
            entries.retain(|_, entry| !entry.is_expired(self.ttl, now));
        }
        entries.insert(image.into(), entry);
    }

    /// Number of cached images, including stale entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
