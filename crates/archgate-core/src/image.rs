//! Container image references.
//!
//! Image strings in a pod spec come in many shapes (`nginx`, `quay.io/org/app:v1`,
//! `registry:5000/app@sha256:...`). They are normalized to a fully qualified
//! `registry/repository[:tag][@digest]` form so that equivalent spellings share a
//! single cache entry.

use std::fmt;

use oci_distribution::Reference;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// The pull policy that forces a fresh inspection of the image.
pub const PULL_POLICY_ALWAYS: &str = "Always";

/// A normalized container image plus the cache-bypass flag.
///
/// Two references are equal when both the normalized name and the flag match,
/// so the same image pulled with and without `Always` stays as two entries.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerImageRef {
    name: String,
    skip_cache: bool,
}

impl ContainerImageRef {
    /// Build a reference from a container's `image` and `imagePullPolicy`.
    ///
    /// # Errors
    ///
    /// Returns an error if the image string cannot be normalized.
    pub fn new(image: &str, pull_policy: Option<&str>) -> Result<Self> {
        Ok(Self {
            name: normalize_image_name(image)?,
            skip_cache: pull_policy == Some(PULL_POLICY_ALWAYS),
        })
    }

    /// The normalized image name, used as the cache key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether lookups for this image must bypass the architecture cache.
    #[must_use]
    pub const fn skip_cache(&self) -> bool {
        self.skip_cache
    }
}

impl fmt::Display for ContainerImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.skip_cache {
            write!(f, "{} (no-cache)", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Normalize an image string to `registry/repository[:tag][@digest]`.
///
/// Parsing follows the distribution reference grammar used when the image is
/// fetched, so the cache key and the fetched reference never disagree:
/// Docker Hub shorthand gains `docker.io` and `library/`, and references with
/// neither tag nor digest get `latest`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidImageReference`] for anything the grammar
/// rejects, including uppercase repositories and malformed digests.
pub fn normalize_image_name(image: &str) -> Result<String> {
    image
        .parse::<Reference>()
        .map(|reference| reference.whole())
        .map_err(|e| CoreError::InvalidImageReference(format!("{image}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_docker_hub_shorthand() {
        assert_eq!(
            normalize_image_name("nginx").unwrap(),
            "docker.io/library/nginx:latest"
        );
        assert_eq!(
            normalize_image_name("bar/foo:1.0").unwrap(),
            "docker.io/bar/foo:1.0"
        );
        assert_eq!(
            normalize_image_name("index.docker.io/library/busybox").unwrap(),
            "docker.io/library/busybox:latest"
        );
    }

    #[test]
    fn keeps_explicit_registries() {
        assert_eq!(
            normalize_image_name("quay.io/org/app:v2").unwrap(),
            "quay.io/org/app:v2"
        );
        assert_eq!(
            normalize_image_name("registry.local:5000/team/app").unwrap(),
            "registry.local:5000/team/app:latest"
        );
        assert_eq!(
            normalize_image_name("localhost/app:dev").unwrap(),
            "localhost/app:dev"
        );
    }

    const DIGEST: &str =
        "sha256:4c6ab9a8b1a4f3a1b4e5c1d3f2a9e8b7c6d5e4f3a2b1c0d9e8f7a6b5c4d3e2f1";

    #[test]
    fn digest_references_get_no_default_tag() {
        assert_eq!(
            normalize_image_name(&format!("quay.io/org/app@{DIGEST}")).unwrap(),
            format!("quay.io/org/app@{DIGEST}")
        );
        assert_eq!(
            normalize_image_name(&format!("quay.io/org/app:v1@{DIGEST}")).unwrap(),
            format!("quay.io/org/app:v1@{DIGEST}")
        );
    }

    #[test]
    fn rejects_malformed_references() {
        for bad in [
            "",
            "   ",
            "nginx:",
            "app@",
            "quay.io/",
            "with space:1",
            "quay.io/ORG/app",
            "Quay.io/Org/App:v1",
            "quay.io/org/app@sha256:abc",
        ] {
            assert!(
                normalize_image_name(bad).is_err(),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn always_pull_policy_skips_cache() {
        let always = ContainerImageRef::new("nginx", Some("Always")).unwrap();
        let if_not_present = ContainerImageRef::new("nginx", Some("IfNotPresent")).unwrap();
        let unset = ContainerImageRef::new("nginx", None).unwrap();

        assert!(always.skip_cache());
        assert!(!if_not_present.skip_cache());
        assert!(!unset.skip_cache());

        assert_ne!(always, if_not_present);
        assert_eq!(if_not_present, unset);
    }

    #[test]
    fn equivalent_spellings_are_equal() {
        let a = ContainerImageRef::new("nginx", None).unwrap();
        let b = ContainerImageRef::new("docker.io/library/nginx:latest", None).unwrap();
        assert_eq!(a, b);
    }
}
