//! The reconciler-facing placement primitive.

use archgate_core::names::{NODE_AFFINITY_LABEL, NODE_AFFINITY_LABEL_VALUE_SET};
use archgate_registry::{ArchitectureResolver, PullCredentials};
use tracing::{debug, info};

use crate::error::Result;
use crate::intersect::architecture_predicate;
use crate::pod::PodView;

/// Constrain a pod to the architectures all of its images support.
///
/// Returns `Ok(false)` and leaves the pod untouched when it already
/// constrains its architecture. Otherwise merges the architecture predicate
/// into every required node selector term, refreshes the outcome labels,
/// marks the node affinity as set and returns `Ok(true)`.
///
/// # Errors
///
/// Fails if any image cannot be resolved, in which case the pod is not
/// modified.
pub async fn set_node_affinity_arch_requirement(
    view: &mut PodView,
    resolver: &dyn ArchitectureResolver,
    credentials: &PullCredentials,
) -> Result<bool> {
    if view.is_node_selector_configured_for_architecture() {
        debug!(
            namespace = view.namespace(),
            name = view.name(),
            "Pod already constrains its architecture"
        );
        return Ok(false);
    }

    let predicate = architecture_predicate(view, resolver, credentials).await?;

    view.apply_required_affinity(&predicate);
    view.ensure_architecture_labels(&predicate);
    view.ensure_label(NODE_AFFINITY_LABEL, NODE_AFFINITY_LABEL_VALUE_SET);

    info!(
        namespace = view.namespace(),
        name = view.name(),
        key = %predicate.key,
        values = ?predicate.values,
        "Architecture requirement set"
    );
    Ok(true)
}
