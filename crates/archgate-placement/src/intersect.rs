//! Architecture intersection across a pod's images.

use archgate_core::names::{ARCH_LABEL, NO_SUPPORTED_ARCH_LABEL};
use archgate_core::ArchitectureSet;
use archgate_registry::{ArchitectureResolver, PullCredentials};
use futures::future::try_join_all;
use k8s_openapi::api::core::v1::NodeSelectorRequirement;
use tracing::debug;

use crate::error::Result;
use crate::pod::PodView;

/// Node selector operator matching a label value in a set.
pub const OPERATOR_IN: &str = "In";
/// Node selector operator matching label presence.
pub const OPERATOR_EXISTS: &str = "Exists";

/// The architectures supported by every image of the pod.
///
/// Images are resolved concurrently. An empty set means the images share no
/// architecture.
///
/// # Errors
///
/// Fails with the first resolution error; no partial result is returned.
pub async fn intersect_images_architecture(
    view: &PodView,
    resolver: &dyn ArchitectureResolver,
    credentials: &PullCredentials,
) -> Result<ArchitectureSet> {
    let images = view.image_refs()?;
    let sets = try_join_all(images.iter().map(|image| resolver.resolve(image, credentials))).await?;

    let common = sets
        .into_iter()
        .reduce(|acc, set| acc.intersection(&set))
        .unwrap_or_default();

    debug!(
        namespace = view.namespace(),
        name = view.name(),
        images = images.len(),
        architectures = %common,
        "Intersected image architectures"
    );
    Ok(common)
}

/// Render an architecture set as a node selector requirement.
///
/// A non-empty set becomes `arch In [sorted values]`. An empty set becomes
/// `no-supported-arch Exists`, which no node satisfies.
#[must_use]
pub fn architecture_predicate_for(architectures: &ArchitectureSet) -> NodeSelectorRequirement {
    if architectures.is_empty() {
        NodeSelectorRequirement {
            key: NO_SUPPORTED_ARCH_LABEL.to_string(),
            operator: OPERATOR_EXISTS.to_string(),
            values: Some(Vec::new()),
        }
    } else {
        NodeSelectorRequirement {
            key: ARCH_LABEL.to_string(),
            operator: OPERATOR_IN.to_string(),
            values: Some(architectures.to_vec()),
        }
    }
}

/// The architecture predicate for a pod.
///
/// # Errors
///
/// Fails if any image cannot be resolved.
pub async fn architecture_predicate(
    view: &PodView,
    resolver: &dyn ArchitectureResolver,
    credentials: &PullCredentials,
) -> Result<NodeSelectorRequirement> {
    let common = intersect_images_architecture(view, resolver, credentials).await?;
    Ok(architecture_predicate_for(&common))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlacementError;
    use crate::testing::{
        fixture_resolver as resolver, PodBuilder, MULTI_ARCH_IMAGE, MULTI_ARCH_IMAGE_2,
        SINGLE_ARCH_AMD64_IMAGE, SINGLE_ARCH_ARM64_IMAGE,
    };
    use k8s_openapi::api::core::v1::Pod;

    async fn intersect(pod: Pod) -> Result<Vec<String>> {
        let (_, resolver) = resolver();
        let view = PodView::new(pod);
        intersect_images_architecture(&view, &resolver, &PullCredentials::anonymous())
            .await
            .map(|set| set.to_vec())
    }

    #[tokio::test]
    async fn single_multi_arch_image() {
        let pod = PodBuilder::new().with_containers_images(&[MULTI_ARCH_IMAGE]).build();
        assert_eq!(intersect(pod).await.unwrap(), vec!["amd64", "arm64"]);
    }

    #[tokio::test]
    async fn single_single_arch_image() {
        let pod = PodBuilder::new()
            .with_containers_images(&[SINGLE_ARCH_ARM64_IMAGE])
            .build();
        assert_eq!(intersect(pod).await.unwrap(), vec!["arm64"]);
    }

    #[tokio::test]
    async fn repeated_image_is_resolved_once() {
        let (inspector, resolver) = resolver();
        let view = PodView::new(
            PodBuilder::new()
                .with_containers_images(&[MULTI_ARCH_IMAGE, MULTI_ARCH_IMAGE])
                .build(),
        );
        let set = intersect_images_architecture(&view, &resolver, &PullCredentials::anonymous())
            .await
            .unwrap();
        assert_eq!(set.to_vec(), vec!["amd64", "arm64"]);
        assert_eq!(inspector.calls(), 1);
    }

    #[tokio::test]
    async fn always_pull_duplicate_stays_uncached() {
        let (inspector, resolver) = resolver();
        let view = PodView::new(
            PodBuilder::new()
                .with_containers_images(&[MULTI_ARCH_IMAGE])
                .with_container_image_pull_always(MULTI_ARCH_IMAGE)
                .build(),
        );
        let creds = PullCredentials::anonymous();

        intersect_images_architecture(&view, &resolver, &creds).await.unwrap();
        intersect_images_architecture(&view, &resolver, &creds).await.unwrap();

        // One cached lookup plus one uncached lookup per call.
        assert_eq!(inspector.calls(), 3);
    }

    #[tokio::test]
    async fn multi_and_single_arch_images() {
        let pod = PodBuilder::new()
            .with_containers_images(&[MULTI_ARCH_IMAGE, SINGLE_ARCH_ARM64_IMAGE])
            .build();
        assert_eq!(intersect(pod).await.unwrap(), vec!["arm64"]);
    }

    #[tokio::test]
    async fn two_multi_arch_images() {
        let pod = PodBuilder::new()
            .with_containers_images(&[MULTI_ARCH_IMAGE, MULTI_ARCH_IMAGE_2])
            .build();
        assert_eq!(intersect(pod).await.unwrap(), vec!["amd64", "arm64"]);
    }

    #[tokio::test]
    async fn disjoint_images_yield_empty_set() {
        let pod = PodBuilder::new()
            .with_containers_images(&[SINGLE_ARCH_AMD64_IMAGE, SINGLE_ARCH_ARM64_IMAGE])
            .build();
        assert!(intersect(pod).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unresolvable_image_fails_the_pod() {
        let pod = PodBuilder::new()
            .with_containers_images(&[MULTI_ARCH_IMAGE, "non-existing-image"])
            .build();
        assert!(matches!(
            intersect(pod).await.unwrap_err(),
            PlacementError::Resolve(_)
        ));
    }

    #[tokio::test]
    async fn predicate_values_are_sorted() {
        let (_, resolver) = resolver();
        let view = PodView::new(
            PodBuilder::new()
                .with_containers_images(&[MULTI_ARCH_IMAGE])
                .with_init_containers_images(&[MULTI_ARCH_IMAGE_2])
                .build(),
        );
        let predicate = architecture_predicate(&view, &resolver, &PullCredentials::anonymous())
            .await
            .unwrap();

        assert_eq!(predicate.key, ARCH_LABEL);
        assert_eq!(predicate.operator, OPERATOR_IN);
        assert_eq!(
            predicate.values,
            Some(vec!["amd64".to_string(), "arm64".to_string()])
        );
    }

    #[tokio::test]
    async fn conflicting_architectures_predicate() {
        let (_, resolver) = resolver();
        let view = PodView::new(
            PodBuilder::new()
                .with_containers_images(&[SINGLE_ARCH_AMD64_IMAGE, SINGLE_ARCH_ARM64_IMAGE])
                .build(),
        );
        let predicate = architecture_predicate(&view, &resolver, &PullCredentials::anonymous())
            .await
            .unwrap();

        assert_eq!(predicate.key, NO_SUPPORTED_ARCH_LABEL);
        assert_eq!(predicate.operator, OPERATOR_EXISTS);
        assert_eq!(predicate.values, Some(vec![]));
    }

    #[tokio::test]
    async fn predicate_fails_on_unresolvable_image() {
        let (_, resolver) = resolver();
        let view = PodView::new(
            PodBuilder::new()
                .with_containers_images(&[MULTI_ARCH_IMAGE, "non-existing-image"])
                .build(),
        );
        assert!(
            architecture_predicate(&view, &resolver, &PullCredentials::anonymous())
                .await
                .is_err()
        );
    }

    #[test]
    fn intersection_is_order_independent() {
        let sets: Vec<ArchitectureSet> = vec![
            ["amd64", "arm64", "s390x"].into_iter().collect(),
            ["arm64", "s390x"].into_iter().collect(),
            ["s390x", "arm64", "ppc64le"].into_iter().collect(),
        ];
        let forward = sets
            .iter()
            .cloned()
            .reduce(|a, b| a.intersection(&b))
            .unwrap();
        let backward = sets
            .iter()
            .rev()
            .cloned()
            .reduce(|a, b| a.intersection(&b))
            .unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.to_vec(), vec!["arm64", "s390x"]);
    }
}
