//! Merging the architecture predicate into a pod's required node affinity.
//!
//! Required node affinity is a disjunction of terms, each a conjunction of
//! expressions. The predicate must hold whichever term the scheduler picks,
//! so it goes into every term: an expression with the same key is replaced,
//! otherwise the predicate is appended. Nothing else is touched.

use k8s_openapi::api::core::v1::{
    Affinity, NodeAffinity, NodeSelector, NodeSelectorRequirement, NodeSelectorTerm,
};

use crate::pod::PodView;

impl PodView {
    /// Add or replace `expression` in every required node selector term.
    ///
    /// Creates a single term holding only `expression` when the pod has no
    /// required node affinity or it has no terms. An existing expression with
    /// the same key is overwritten in place.
    pub fn apply_required_affinity(&mut self, expression: &NodeSelectorRequirement) {
        let required = self
            .spec_mut()
            .affinity
            .get_or_insert_with(Affinity::default)
            .node_affinity
            .get_or_insert_with(NodeAffinity::default)
            .required_during_scheduling_ignored_during_execution
            .get_or_insert_with(NodeSelector::default);

        if required.node_selector_terms.is_empty() {
            required.node_selector_terms.push(NodeSelectorTerm {
                match_expressions: Some(vec![expression.clone()]),
                ..Default::default()
            });
            return;
        }

        for term in &mut required.node_selector_terms {
            let expressions = term.match_expressions.get_or_insert_with(Vec::new);
            match expressions.iter_mut().find(|e| e.key == expression.key) {
                Some(existing) => existing.clone_from(expression),
                None => expressions.push(expression.clone()),
            }
        }
    }
}
