//! The admission review endpoint.
//!
//! Rejections travel inside the review with `allowed: false`, so this
//! handler always answers 200 once it has a body to parse.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;

use crate::admission::{AdmissionResponse, AdmissionReview};
use crate::error::AdmissionError;
use crate::state::WebhookState;

/// Handle `POST /add-pod-scheduling-gate`.
///
/// ```text
/// POST /add-pod-scheduling-gate
/// {"apiVersion": "admission.k8s.io/v1", "kind": "AdmissionReview", "request": {...}}
///
/// Response: 200 OK
/// {"apiVersion": "admission.k8s.io/v1", "kind": "AdmissionReview",
///  "response": {"uid": "...", "allowed": true, "patchType": "JSONPatch", "patch": "..."}}
/// ```
pub async fn add_pod_scheduling_gate(
    State(state): State<WebhookState>,
    body: Bytes,
) -> Json<AdmissionReview> {
    let review: AdmissionReview = match serde_json::from_slice(&body) {
        Ok(review) => review,
        Err(e) => return Json(rejected(String::new(), &AdmissionError::Decode(e.to_string()))),
    };
    let Some(request) = review.request else {
        return Json(rejected(
            String::new(),
            &AdmissionError::Decode("review carries no request".to_string()),
        ));
    };

    Json(AdmissionReview::for_response(
        state.webhook.handle(&request),
    ))
}

fn rejected(uid: String, error: &AdmissionError) -> AdmissionReview {
    tracing::warn!(error = %error, "Malformed admission review");
    AdmissionReview::for_response(AdmissionResponse::errored(uid, error))
}
