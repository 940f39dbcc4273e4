//! The pod model the placement pipeline operates on.
//!
//! [`PodView`] owns a [`Pod`] and exposes the queries and mutations the
//! admission gate and the reconciler need. Mutations happen in place on the
//! owned value; callers take the pod back out with [`PodView::into_pod`].

use std::collections::{BTreeMap, BTreeSet};

use archgate_core::names::{
    ARCH_LABEL, CONTROL_PLANE_NODE_SELECTOR_LABELS, DAEMONSET_KIND, SCHEDULING_GATE_NAME,
};
use archgate_core::ContainerImageRef;
use k8s_openapi::api::core::v1::{Container, Pod, PodSchedulingGate, PodSpec};

use crate::error::{PlacementError, Result};
use crate::ignore::IgnorePolicy;

/// An owned pod plus the placement queries and mutations.
#[derive(Debug, Clone, PartialEq)]
pub struct PodView {
    pod: Pod,
}

impl From<Pod> for PodView {
    fn from(pod: Pod) -> Self {
        Self::new(pod)
    }
}

impl PodView {
    /// Wrap a pod.
    #[must_use]
    pub fn new(pod: Pod) -> Self {
        Self { pod }
    }

    /// The wrapped pod.
    #[must_use]
    pub fn pod(&self) -> &Pod {
        &self.pod
    }

    /// Unwrap the pod.
    #[must_use]
    pub fn into_pod(self) -> Pod {
        self.pod
    }

    /// The pod's namespace, or `""`.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.pod.metadata.namespace.as_deref().unwrap_or_default()
    }

    /// The pod's name, or `""` (pods created from `generateName` have none at admission).
    #[must_use]
    pub fn name(&self) -> &str {
        self.pod.metadata.name.as_deref().unwrap_or_default()
    }

    /// The pod's labels.
    #[must_use]
    pub fn labels(&self) -> Option<&BTreeMap<String, String>> {
        self.pod.metadata.labels.as_ref()
    }

    pub(crate) fn labels_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.pod.metadata.labels.get_or_insert_with(BTreeMap::new)
    }

    pub(crate) fn spec(&self) -> Option<&PodSpec> {
        self.pod.spec.as_ref()
    }

    pub(crate) fn spec_mut(&mut self) -> &mut PodSpec {
        self.pod.spec.get_or_insert_with(PodSpec::default)
    }

    /// Names of the pod's image pull secrets; empty when there are none.
    #[must_use]
    pub fn pull_secret_names(&self) -> Vec<String> {
        self.spec()
            .and_then(|s| s.image_pull_secrets.as_ref())
            .map(|secrets| {
                secrets
                    .iter()
                    .filter(|s| !s.name.is_empty())
                    .map(|s| s.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether our scheduling gate is present.
    #[must_use]
    pub fn has_scheduling_gate(&self) -> bool {
        self.spec()
            .and_then(|s| s.scheduling_gates.as_ref())
            .is_some_and(|gates| gates.iter().any(|g| g.name == SCHEDULING_GATE_NAME))
    }

    /// Append our scheduling gate unless it is already present.
    ///
    /// Returns `true` if the gate was added.
    pub fn ensure_scheduling_gate(&mut self) -> bool {
        if self.has_scheduling_gate() {
            return false;
        }
        self.spec_mut()
            .scheduling_gates
            .get_or_insert_with(Vec::new)
            .push(PodSchedulingGate {
                name: SCHEDULING_GATE_NAME.to_string(),
            });
        true
    }

    /// Remove our scheduling gate, keeping other gates in order.
    ///
    /// An absent gate list stays absent.
    pub fn remove_scheduling_gate(&mut self) {
        if let Some(gates) = self
            .pod
            .spec
            .as_mut()
            .and_then(|s| s.scheduling_gates.as_mut())
        {
            gates.retain(|g| g.name != SCHEDULING_GATE_NAME);
        }
    }

    /// Whether the node selector pins the pod to control-plane nodes.
    #[must_use]
    pub fn has_control_plane_node_selector(&self) -> bool {
        self.spec()
            .and_then(|s| s.node_selector.as_ref())
            .is_some_and(|selector| {
                CONTROL_PLANE_NODE_SELECTOR_LABELS
                    .iter()
                    .any(|label| selector.contains_key(*label))
            })
    }

    /// Whether a DaemonSet is the pod's managing controller.
    #[must_use]
    pub fn is_daemonset_owned(&self) -> bool {
        self.pod
            .metadata
            .owner_references
            .as_ref()
            .is_some_and(|owners| {
                owners
                    .iter()
                    .any(|o| o.kind == DAEMONSET_KIND && o.controller == Some(true))
            })
    }

    /// Whether the pod already constrains its architecture.
    ///
    /// True when the node selector names the architecture label, or when a
    /// required node affinity exists and every one of its terms has an
    /// architecture expression.
    #[must_use]
    pub fn is_node_selector_configured_for_architecture(&self) -> bool {
        let Some(spec) = self.spec() else {
            return false;
        };
        if spec
            .node_selector
            .as_ref()
            .is_some_and(|selector| selector.contains_key(ARCH_LABEL))
        {
            return true;
        }

        let Some(required) = spec
            .affinity
            .as_ref()
            .and_then(|a| a.node_affinity.as_ref())
            .and_then(|na| na.required_during_scheduling_ignored_during_execution.as_ref())
        else {
            return false;
        };

        !required.node_selector_terms.is_empty()
            && required.node_selector_terms.iter().all(|term| {
                term.match_expressions
                    .as_ref()
                    .is_some_and(|exprs| exprs.iter().any(|e| e.key == ARCH_LABEL))
            })
    }

    /// Whether the placement pipeline must leave this pod untouched.
    ///
    /// Pods are ignored in the operator's own or infrastructure namespaces,
    /// when already bound to a node, when pinned to control-plane nodes, or
    /// when a DaemonSet controls them.
    #[must_use]
    pub fn should_ignore(&self, policy: &IgnorePolicy) -> bool {
        policy.ignores_namespace(self.namespace())
            || self
                .spec()
                .and_then(|s| s.node_name.as_deref())
                .is_some_and(|n| !n.is_empty())
            || self.has_control_plane_node_selector()
            || self.is_daemonset_owned()
    }

    /// The distinct images of all containers and init containers.
    ///
    /// Identity includes the cache-bypass flag, so the same image pulled
    /// with and without `Always` yields two entries.
    ///
    /// # Errors
    ///
    /// Returns an error if a container has no image or an image is malformed.
    pub fn image_refs(&self) -> Result<BTreeSet<ContainerImageRef>> {
        let Some(spec) = self.spec() else {
            return Ok(BTreeSet::new());
        };

        spec.init_containers
            .iter()
            .flatten()
            .chain(spec.containers.iter())
            .map(image_ref)
            .collect()
    }
}

fn image_ref(container: &Container) -> Result<ContainerImageRef> {
    let image = container
        .image
        .as_deref()
        .filter(|i| !i.is_empty())
        .ok_or_else(|| PlacementError::MissingImage(container.name.clone()))?;
    Ok(ContainerImageRef::new(
        image,
        container.image_pull_policy.as_deref(),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{requirement, PodBuilder};
    use k8s_openapi::api::core::v1::{Affinity, NodeAffinity};

    fn view(pod: Pod) -> PodView {
        PodView::new(pod)
    }

    fn gate_names(view: &PodView) -> Option<Vec<String>> {
        view.spec()
            .and_then(|s| s.scheduling_gates.as_ref())
            .map(|gates| gates.iter().map(|g| g.name.clone()).collect())
    }

    #[test]
    fn pull_secret_names() {
        assert!(view(PodBuilder::new().build()).pull_secret_names().is_empty());
        assert!(view(PodBuilder::new().with_image_pull_secrets(&[]).build())
            .pull_secret_names()
            .is_empty());
        assert_eq!(
            view(PodBuilder::new().with_image_pull_secrets(&["my-secret"]).build())
                .pull_secret_names(),
            vec!["my-secret"]
        );
    }

    #[test]
    fn has_scheduling_gate() {
        let cases = [
            (None, false),
            (Some(vec![]), false),
            (Some(vec![SCHEDULING_GATE_NAME]), true),
            (Some(vec!["some-other-gate"]), false),
            (Some(vec!["gate-bar", SCHEDULING_GATE_NAME, "gate-foo"]), true),
        ];
        for (gates, want) in cases {
            let builder = match &gates {
                Some(g) => PodBuilder::new().with_scheduling_gates(g),
                None => PodBuilder::new(),
            };
            assert_eq!(view(builder.build()).has_scheduling_gate(), want, "{gates:?}");
        }
    }

    #[test]
    fn remove_scheduling_gate_preserves_order() {
        let mut absent = view(PodBuilder::new().build());
        absent.remove_scheduling_gate();
        assert_eq!(gate_names(&absent), None);

        let mut empty = view(PodBuilder::new().with_scheduling_gates(&[]).build());
        empty.remove_scheduling_gate();
        assert_eq!(gate_names(&empty), Some(vec![]));

        let mut only = view(
            PodBuilder::new()
                .with_scheduling_gates(&[SCHEDULING_GATE_NAME])
                .build(),
        );
        only.remove_scheduling_gate();
        assert_eq!(gate_names(&only), Some(vec![]));

        let mut other = view(PodBuilder::new().with_scheduling_gates(&["other"]).build());
        other.remove_scheduling_gate();
        assert_eq!(gate_names(&other), Some(vec!["other".to_string()]));

        let mut mixed = view(
            PodBuilder::new()
                .with_scheduling_gates(&["gate-bar", SCHEDULING_GATE_NAME, "gate-foo"])
                .build(),
        );
        mixed.remove_scheduling_gate();
        assert_eq!(
            gate_names(&mixed),
            Some(vec!["gate-bar".to_string(), "gate-foo".to_string()])
        );
    }

    #[test]
    fn ensure_scheduling_gate_is_idempotent() {
        let mut absent = view(PodBuilder::new().build());
        assert!(absent.ensure_scheduling_gate());
        assert_eq!(gate_names(&absent), Some(vec![SCHEDULING_GATE_NAME.to_string()]));

        let mut empty = view(PodBuilder::new().with_scheduling_gates(&[]).build());
        assert!(empty.ensure_scheduling_gate());
        assert_eq!(gate_names(&empty), Some(vec![SCHEDULING_GATE_NAME.to_string()]));

        let mut present = view(
            PodBuilder::new()
                .with_scheduling_gates(&[SCHEDULING_GATE_NAME])
                .build(),
        );
        assert!(!present.ensure_scheduling_gate());
        assert_eq!(gate_names(&present), Some(vec![SCHEDULING_GATE_NAME.to_string()]));

        let mut other = view(PodBuilder::new().with_scheduling_gates(&["other-gate"]).build());
        assert!(other.ensure_scheduling_gate());
        assert_eq!(
            gate_names(&other),
            Some(vec!["other-gate".to_string(), SCHEDULING_GATE_NAME.to_string()])
        );
    }

    #[test]
    fn control_plane_node_selector() {
        let [control_plane, master] = CONTROL_PLANE_NODE_SELECTOR_LABELS;
        let cases = [
            (None, false),
            (Some(vec![]), false),
            (Some(vec![("foo", "bar")]), false),
            (Some(vec![("foo", "bar"), (control_plane, "")]), true),
            (Some(vec![("foo", "bar"), (master, ""), ("baz", "foo")]), true),
        ];
        for (selectors, want) in cases {
            let builder = match &selectors {
                Some(s) => PodBuilder::new().with_node_selectors(s),
                None => PodBuilder::new(),
            };
            assert_eq!(
                view(builder.build()).has_control_plane_node_selector(),
                want,
                "{selectors:?}"
            );
        }
    }

    #[test]
    fn should_ignore() {
        let policy = IgnorePolicy::new("archgate-system");
        let [control_plane, _] = CONTROL_PLANE_NODE_SELECTOR_LABELS;

        let cases = [
            (PodBuilder::new().build(), false),
            (PodBuilder::new().with_namespace("archgate-system").build(), true),
            (PodBuilder::new().with_namespace("kube-system").build(), true),
            (PodBuilder::new().with_namespace("hypershift-ns").build(), true),
            (PodBuilder::new().with_node_name("node-name").build(), true),
            (
                PodBuilder::new()
                    .with_node_selectors(&[(control_plane, "")])
                    .build(),
                true,
            ),
            (
                PodBuilder::new()
                    .with_owner_reference(DAEMONSET_KIND, Some(true))
                    .build(),
                true,
            ),
            (
                PodBuilder::new()
                    .with_owner_reference(DAEMONSET_KIND, Some(false))
                    .build(),
                false,
            ),
            (
                PodBuilder::new()
                    .with_owner_reference(DAEMONSET_KIND, None)
                    .build(),
                false,
            ),
            (
                PodBuilder::new()
                    .with_owner_reference("ReplicaSet", Some(true))
                    .build(),
                false,
            ),
        ];
        for (pod, want) in cases {
            let pod = view(pod);
            assert_eq!(pod.should_ignore(&policy), want, "{:?}", pod.pod().metadata);
        }
    }

    #[test]
    fn node_selector_configured_for_architecture() {
        let arch_in = || Some(vec![requirement(ARCH_LABEL, "In", &["amd64"])]);
        let other = || Some(vec![requirement("some-other-label", "In", &["value"])]);

        let with_selector = PodBuilder::new()
            .with_node_selectors(&[(ARCH_LABEL, "amd64")])
            .build();
        assert!(view(with_selector).is_node_selector_configured_for_architecture());

        assert!(!view(PodBuilder::new().build()).is_node_selector_configured_for_architecture());

        let empty_affinity = PodBuilder::new().with_affinity(Some(Affinity::default())).build();
        assert!(!view(empty_affinity).is_node_selector_configured_for_architecture());

        let empty_node_affinity = PodBuilder::new()
            .with_affinity(Some(Affinity {
                node_affinity: Some(NodeAffinity::default()),
                ..Default::default()
            }))
            .build();
        assert!(!view(empty_node_affinity).is_node_selector_configured_for_architecture());

        let all_terms = PodBuilder::new().with_node_selector_terms(vec![arch_in()]).build();
        assert!(view(all_terms).is_node_selector_configured_for_architecture());

        let no_arch = PodBuilder::new().with_node_selector_terms(vec![other()]).build();
        assert!(!view(no_arch).is_node_selector_configured_for_architecture());

        let partial = PodBuilder::new()
            .with_node_selector_terms(vec![other(), arch_in()])
            .build();
        assert!(!view(partial).is_node_selector_configured_for_architecture());

        let no_terms = PodBuilder::new().with_node_selector_terms(vec![]).build();
        assert!(!view(no_terms).is_node_selector_configured_for_architecture());
    }

    #[test]
    fn image_refs_deduplicate() {
        let single = view(PodBuilder::new().with_containers_images(&["bar/foo:latest"]).build());
        let refs: Vec<_> = single.image_refs().unwrap().into_iter().collect();
        assert_eq!(refs, vec![ContainerImageRef::new("bar/foo:latest", None).unwrap()]);

        let repeated = view(
            PodBuilder::new()
                .with_init_containers_images(&["foo/bar:latest"])
                .with_containers_images(&["bar/foo:latest", "bar/baz:latest", "bar/foo:latest"])
                .with_container_image_pull_always("foo/pull:always")
                .build(),
        );
        let refs = repeated.image_refs().unwrap();
        assert_eq!(refs.len(), 4);
        assert!(refs.contains(&ContainerImageRef::new("foo/bar:latest", None).unwrap()));
        assert!(refs.contains(&ContainerImageRef::new("bar/baz:latest", None).unwrap()));
        assert!(refs.contains(&ContainerImageRef::new("foo/pull:always", Some("Always")).unwrap()));
    }

    #[test]
    fn image_refs_keep_policy_variants_apart() {
        let pod = view(
            PodBuilder::new()
                .with_containers_images(&["nginx"])
                .with_container_image_pull_always("nginx")
                .build(),
        );
        let refs: Vec<_> = pod.image_refs().unwrap().into_iter().collect();
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().any(ContainerImageRef::skip_cache));
        assert!(refs.iter().any(|r| !r.skip_cache()));
    }

    #[test]
    fn image_refs_reject_missing_images() {
        let mut pod = PodBuilder::new().with_containers_images(&["nginx"]).build();
        if let Some(spec) = pod.spec.as_mut() {
            spec.containers[0].image = None;
        }
        assert_eq!(
            view(pod).image_refs().unwrap_err(),
            PlacementError::MissingImage("container-0".to_string())
        );
    }
}
