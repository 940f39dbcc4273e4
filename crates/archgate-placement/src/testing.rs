//! Pod fixtures for tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use archgate_core::PULL_POLICY_ALWAYS;
use archgate_registry::{CachingResolver, ImageInspector, MockImageInspector, ResolverConfig};
use k8s_openapi::api::core::v1::{
    Affinity, Container, LocalObjectReference, NodeAffinity, NodeSelector, NodeSelectorRequirement,
    NodeSelectorTerm, Pod, PodSchedulingGate, PodSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

/// Fluent builder for [`Pod`] fixtures.
#[derive(Debug, Clone)]
pub struct PodBuilder {
    pod: Pod,
}

impl Default for PodBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a node selector requirement.
#[must_use]
pub fn requirement(key: &str, operator: &str, values: &[&str]) -> NodeSelectorRequirement {
    NodeSelectorRequirement {
        key: key.to_string(),
        operator: operator.to_string(),
        values: Some(values.iter().map(ToString::to_string).collect()),
    }
}

impl PodBuilder {
    /// A pod named `test-pod` in namespace `test-namespace` with no containers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pod: Pod {
                metadata: ObjectMeta {
                    name: Some("test-pod".to_string()),
                    namespace: Some("test-namespace".to_string()),
                    ..Default::default()
                },
                spec: Some(PodSpec::default()),
                ..Default::default()
            },
        }
    }

    fn spec(&mut self) -> &mut PodSpec {
        self.pod.spec.get_or_insert_with(PodSpec::default)
    }

    fn container(index: usize, image: &str, pull_policy: Option<&str>) -> Container {
        Container {
            name: format!("container-{index}"),
            image: Some(image.to_string()),
            image_pull_policy: pull_policy.map(ToString::to_string),
            ..Default::default()
        }
    }

    /// Set the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.pod.metadata.namespace = Some(namespace.to_string());
        self
    }

    /// Set the name.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.pod.metadata.name = Some(name.to_string());
        self
    }

    /// Add labels.
    #[must_use]
    pub fn with_labels(mut self, labels: &[(&str, &str)]) -> Self {
        let map = self.pod.metadata.labels.get_or_insert_with(BTreeMap::new);
        for (k, v) in labels {
            map.insert((*k).to_string(), (*v).to_string());
        }
        self
    }

    /// Add one container per image.
    #[must_use]
    pub fn with_containers_images(mut self, images: &[&str]) -> Self {
        let spec = self.spec();
        let offset = spec.containers.len();
        for (i, image) in images.iter().enumerate() {
            spec.containers.push(Self::container(offset + i, image, None));
        }
        self
    }

    /// Add a container pulled with the `Always` policy.
    #[must_use]
    pub fn with_container_image_pull_always(mut self, image: &str) -> Self {
        let spec = self.spec();
        let index = spec.containers.len();
        spec.containers
            .push(Self::container(index, image, Some(PULL_POLICY_ALWAYS)));
        self
    }

    /// Add one init container per image.
    #[must_use]
    pub fn with_init_containers_images(mut self, images: &[&str]) -> Self {
        let init = self.spec().init_containers.get_or_insert_with(Vec::new);
        let offset = init.len();
        for (i, image) in images.iter().enumerate() {
            init.push(Self::container(offset + i, image, None));
        }
        self
    }

    /// Set the image pull secrets. An empty slice yields an empty, present list.
    #[must_use]
    pub fn with_image_pull_secrets(mut self, names: &[&str]) -> Self {
        self.spec().image_pull_secrets = Some(
            names
                .iter()
                .map(|name| LocalObjectReference {
                    name: (*name).to_string(),
                })
                .collect(),
        );
        self
    }

    /// Set the scheduling gates. An empty slice yields an empty, present list.
    #[must_use]
    pub fn with_scheduling_gates(mut self, names: &[&str]) -> Self {
        self.spec().scheduling_gates = Some(
            names
                .iter()
                .map(|name| PodSchedulingGate {
                    name: (*name).to_string(),
                })
                .collect(),
        );
        self
    }

    /// Set the node selector. An empty slice yields an empty, present map.
    #[must_use]
    pub fn with_node_selectors(mut self, selectors: &[(&str, &str)]) -> Self {
        self.spec().node_selector = Some(
            selectors
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        );
        self
    }

    /// Set `spec.nodeName`.
    #[must_use]
    pub fn with_node_name(mut self, node_name: &str) -> Self {
        self.spec().node_name = Some(node_name.to_string());
        self
    }

    /// Add an owner reference.
    #[must_use]
    pub fn with_owner_reference(mut self, kind: &str, controller: Option<bool>) -> Self {
        self.pod
            .metadata
            .owner_references
            .get_or_insert_with(Vec::new)
            .push(OwnerReference {
                api_version: "apps/v1".to_string(),
                kind: kind.to_string(),
                name: "owner".to_string(),
                uid: "00000000-0000-0000-0000-000000000000".to_string(),
                controller,
                ..Default::default()
            });
        self
    }

    /// Replace the affinity.
    #[must_use]
    pub fn with_affinity(mut self, affinity: Option<Affinity>) -> Self {
        self.spec().affinity = affinity;
        self
    }

    /// Set an empty node affinity.
    #[must_use]
    pub fn with_node_affinity(mut self) -> Self {
        self.spec()
            .affinity
            .get_or_insert_with(Affinity::default)
            .node_affinity = Some(NodeAffinity::default());
        self
    }

    /// Append required node selector terms, one per entry.
    ///
    /// The required node selector is created even when `terms` is empty.
    #[must_use]
    pub fn with_node_selector_terms(
        mut self,
        terms: Vec<Option<Vec<NodeSelectorRequirement>>>,
    ) -> Self {
        let required = self
            .spec()
            .affinity
            .get_or_insert_with(Affinity::default)
            .node_affinity
            .get_or_insert_with(NodeAffinity::default)
            .required_during_scheduling_ignored_during_execution
            .get_or_insert_with(NodeSelector::default);
        required
            .node_selector_terms
            .extend(terms.into_iter().map(|match_expressions| NodeSelectorTerm {
                match_expressions,
                ..Default::default()
            }));
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Pod {
        self.pod
    }
}

/// A multi-architecture image supporting `amd64` and `arm64`.
pub const MULTI_ARCH_IMAGE: &str = "quay.io/archgate/multi-arch:v1";
/// A multi-architecture image supporting `amd64`, `arm64` and `s390x`.
pub const MULTI_ARCH_IMAGE_2: &str = "quay.io/archgate/multi-arch-2:v1";
/// An `amd64`-only image.
pub const SINGLE_ARCH_AMD64_IMAGE: &str = "quay.io/archgate/amd64-only:v1";
/// An `arm64`-only image.
pub const SINGLE_ARCH_ARM64_IMAGE: &str = "quay.io/archgate/arm64-only:v1";

/// A resolver over a mock registry that knows the fixture images.
///
/// Any other image resolves to not-found.
#[must_use]
pub fn fixture_resolver() -> (Arc<MockImageInspector>, CachingResolver) {
    let inspector = Arc::new(
        MockImageInspector::new()
            .with_image(MULTI_ARCH_IMAGE, &["arm64", "amd64"])
            .with_image(MULTI_ARCH_IMAGE_2, &["amd64", "arm64", "s390x"])
            .with_image(SINGLE_ARCH_AMD64_IMAGE, &["amd64"])
            .with_image(SINGLE_ARCH_ARM64_IMAGE, &["arm64"]),
    );
    let resolver = CachingResolver::new(
        Arc::clone(&inspector) as Arc<dyn ImageInspector>,
        ResolverConfig::default(),
    );
    (inspector, resolver)
}
