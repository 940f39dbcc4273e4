//! Bookkeeping labels mirroring the placement outcome.

use archgate_core::names::{
    arch_label_value, ARCH_LABEL_PREFIX, MULTI_ARCH_LABEL, NO_SUPPORTED_ARCH_LABEL,
    SINGLE_ARCH_LABEL,
};
use k8s_openapi::api::core::v1::NodeSelectorRequirement;

use crate::pod::PodView;

impl PodView {
    /// Set a label, creating the label map if needed and overwriting any value.
    pub fn ensure_label(&mut self, key: &str, value: &str) {
        self.labels_mut().insert(key.to_string(), value.to_string());
    }

    /// Replace the outcome labels with ones matching `predicate`.
    ///
    /// Values absent: outcome labels are only cleared. Zero values: the
    /// no-supported-architecture label. One value: the single-architecture
    /// label. More: the multi-architecture label. Each value also gets its
    /// per-architecture label. All these labels carry an empty value.
    pub fn ensure_architecture_labels(&mut self, predicate: &NodeSelectorRequirement) {
        let labels = self.labels_mut();
        labels.retain(|key, _| {
            key != SINGLE_ARCH_LABEL
                && key != MULTI_ARCH_LABEL
                && key != NO_SUPPORTED_ARCH_LABEL
                && !key.starts_with(ARCH_LABEL_PREFIX)
        });

        let Some(values) = predicate.values.as_ref() else {
            return;
        };
        let outcome = match values.len() {
            0 => NO_SUPPORTED_ARCH_LABEL,
            1 => SINGLE_ARCH_LABEL,
            _ => MULTI_ARCH_LABEL,
        };
        labels.insert(outcome.to_string(), String::new());
        for value in values {
            labels.insert(arch_label_value(value), String::new());
        }
    }
}
