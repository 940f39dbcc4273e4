//! Well-known names shared by the admission webhook and the placement engine.

/// Name of the scheduling gate that holds pods until their architectures are known.
pub const SCHEDULING_GATE_NAME: &str = "archgate.io/scheduling-gate";

/// Node label carrying a node's CPU architecture.
pub const ARCH_LABEL: &str = "kubernetes.io/arch";

/// Node selector keys that pin a pod to control-plane nodes.
pub const CONTROL_PLANE_NODE_SELECTOR_LABELS: [&str; 2] = [
    "node-role.kubernetes.io/control-plane",
    "node-role.kubernetes.io/master",
];

/// Owner kind whose pods run on every node and must never be delayed.
pub const DAEMONSET_KIND: &str = "DaemonSet";

/// Bookkeeping label tracking whether the architecture affinity has been set.
pub const NODE_AFFINITY_LABEL: &str = "archgate.io/node-affinity";
/// Value of [`NODE_AFFINITY_LABEL`] before the architectures are resolved.
pub const NODE_AFFINITY_LABEL_VALUE_NOT_SET: &str = "not-set";
/// Value of [`NODE_AFFINITY_LABEL`] once the predicate has been applied.
pub const NODE_AFFINITY_LABEL_VALUE_SET: &str = "set";

/// Bookkeeping label marking pods that received the scheduling gate.
pub const SCHEDULING_GATE_LABEL: &str = "archgate.io/scheduling-gate";
/// Value of [`SCHEDULING_GATE_LABEL`] on gated pods.
pub const SCHEDULING_GATE_LABEL_VALUE_GATED: &str = "gated";

/// Presence label: the pod's images share exactly one architecture.
pub const SINGLE_ARCH_LABEL: &str = "archgate.io/single-arch";
/// Presence label: the pod's images share more than one architecture.
pub const MULTI_ARCH_LABEL: &str = "archgate.io/multi-arch";
/// Presence label and predicate key: the pod's images share no architecture.
pub const NO_SUPPORTED_ARCH_LABEL: &str = "archgate.io/no-supported-arch";

/// Prefix of the per-architecture presence labels.
pub const ARCH_LABEL_PREFIX: &str = "archgate.io/arch-";

/// The per-architecture presence label for `arch`, e.g. `archgate.io/arch-amd64`.
#[must_use]
pub fn arch_label_value(arch: &str) -> String {
    format!("{ARCH_LABEL_PREFIX}{arch}")
}

/// Event reason emitted once a gated pod becomes visible.
pub const SCHEDULING_GATE_ADDED_REASON: &str = "ArchitectureAwareSchedulingGateAdded";
/// Event message emitted once a gated pod becomes visible.
pub const SCHEDULING_GATE_ADDED_MESSAGE: &str =
    "Successfully gated with the archgate.io/scheduling-gate scheduling gate";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arch_label_values_share_prefix() {
        assert_eq!(arch_label_value("amd64"), "archgate.io/arch-amd64");
        assert!(arch_label_value("s390x").starts_with(ARCH_LABEL_PREFIX));
    }

    #[test]
    fn outcome_labels_are_distinct_from_arch_labels() {
        for label in [SINGLE_ARCH_LABEL, MULTI_ARCH_LABEL, NO_SUPPORTED_ARCH_LABEL] {
            assert!(!label.starts_with(ARCH_LABEL_PREFIX));
        }
    }
}
