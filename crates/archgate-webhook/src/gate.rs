//! The scheduling gate admission logic.
//!
//! Every admitted pod is labelled as not yet placed. Pods outside the
//! ignoring rule also get the scheduling gate and the gated label, and a
//! confirmation job is queued to announce the gate once the pod exists.
//! Nothing here talks to a registry or blocks on the network.

use std::sync::Arc;

use k8s_openapi::api::core::v1::Pod;
use serde_json::Value;
use tracing::{debug, error, info};

use archgate_core::names::{
    NODE_AFFINITY_LABEL, NODE_AFFINITY_LABEL_VALUE_NOT_SET, SCHEDULING_GATE_LABEL,
    SCHEDULING_GATE_LABEL_VALUE_GATED,
};
use archgate_placement::{IgnorePolicy, PodView};

use crate::admission::{AdmissionRequest, AdmissionResponse};
use crate::confirm::ConfirmationTask;
use crate::error::AdmissionError;
use crate::metrics::WebhookMetrics;
use crate::pool::WorkerPool;

/// What the gate did to a pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// The pod matched the ignoring rule.
    Ignored,
    /// The pod already carried the gate.
    AlreadyGated,
    /// The gate was added.
    Gated,
}

/// Adds the scheduling gate to incoming pods.
#[derive(Debug, Clone)]
pub struct SchedulingGateWebhook {
    policy: IgnorePolicy,
    metrics: Arc<WebhookMetrics>,
    pool: WorkerPool,
    confirmation: ConfirmationTask,
}

impl SchedulingGateWebhook {
    /// Create the webhook.
    #[must_use]
    pub fn new(
        policy: IgnorePolicy,
        metrics: Arc<WebhookMetrics>,
        pool: WorkerPool,
        confirmation: ConfirmationTask,
    ) -> Self {
        Self {
            policy,
            metrics,
            pool,
            confirmation,
        }
    }

    /// The metrics this webhook records.
    #[must_use]
    pub fn metrics(&self) -> &WebhookMetrics {
        &self.metrics
    }

    /// Answer an admission request.
    ///
    /// Decode failures are rejected with 400 and encoding failures with 500.
    /// Everything else is admitted with a patch.
    #[must_use]
    pub fn handle(&self, request: &AdmissionRequest) -> AdmissionResponse {
        let _timer = self.metrics.pod_processed();
        match self.admit(request) {
            Ok(response) => response,
            Err(e) => {
                error!(uid = %request.uid, error = %e, "Rejecting admission request");
                AdmissionResponse::errored(request.uid.clone(), &e)
            }
        }
    }

    fn admit(&self, request: &AdmissionRequest) -> Result<AdmissionResponse, AdmissionError> {
        let object = request
            .object
            .clone()
            .ok_or_else(|| AdmissionError::Decode("request carries no object".to_string()))?;
        let mut pod: Pod =
            serde_json::from_value(object).map_err(|e| AdmissionError::Decode(e.to_string()))?;

        // On create the API server may only put these on the request.
        if pod.metadata.namespace.is_none() {
            pod.metadata.namespace.clone_from(&request.namespace);
        }
        if pod.metadata.name.is_none() {
            pod.metadata.name.clone_from(&request.name);
        }

        // Both sides go through the same encoding, so the diff only holds
        // what the gate changed and applies cleanly to the raw object.
        let before = encode(&pod)?;
        let mut view = PodView::new(pod);
        let outcome = self.gate(&mut view);
        let after = encode(view.pod())?;

        debug!(uid = %request.uid, outcome = ?outcome, "Admission request handled");
        AdmissionResponse::patched(request.uid.clone(), &before, &after)
    }

    /// Apply the gate to a decoded pod.
    pub fn gate(&self, view: &mut PodView) -> GateOutcome {
        view.ensure_label(NODE_AFFINITY_LABEL, NODE_AFFINITY_LABEL_VALUE_NOT_SET);

        if view.should_ignore(&self.policy) {
            debug!(
                namespace = view.namespace(),
                name = view.name(),
                "Ignoring the pod"
            );
            return GateOutcome::Ignored;
        }

        if !view.ensure_scheduling_gate() {
            return GateOutcome::AlreadyGated;
        }
        view.ensure_label(SCHEDULING_GATE_LABEL, SCHEDULING_GATE_LABEL_VALUE_GATED);

        self.schedule_confirmation(view.namespace(), view.name());
        self.metrics.pod_gated();
        info!(
            namespace = view.namespace(),
            name = view.name(),
            "Scheduling gate added"
        );
        GateOutcome::Gated
    }

    fn schedule_confirmation(&self, namespace: &str, name: &str) {
        if name.is_empty() {
            debug!(namespace, "Pod has no name yet, skipping the gate event");
            return;
        }
        let job = self
            .confirmation
            .clone()
            .run(namespace.to_string(), name.to_string());
        if let Err(e) = self.pool.submit(job) {
            error!(namespace, name, error = %e, "Failed to submit the gate confirmation job");
        }
    }
}

fn encode(pod: &Pod) -> Result<Value, AdmissionError> {
    serde_json::to_value(pod).map_err(|e| AdmissionError::Internal(e.to_string()))
}
