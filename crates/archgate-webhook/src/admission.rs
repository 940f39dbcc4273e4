//! `admission.k8s.io/v1` wire types and patch responses.
//!
//! Only the fields the gate reads or writes are modelled. The inbound object
//! stays a raw [`serde_json::Value`]; patches are JSON Patch documents
//! computed by diffing two encodings of the object.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AdmissionError;

/// API version of admission reviews.
pub const ADMISSION_API_VERSION: &str = "admission.k8s.io/v1";
/// Kind of admission reviews.
pub const ADMISSION_KIND: &str = "AdmissionReview";
/// The only patch type the API server accepts.
pub const PATCH_TYPE_JSON_PATCH: &str = "JSONPatch";

/// An admission review envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    /// Always [`ADMISSION_API_VERSION`].
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Always [`ADMISSION_KIND`].
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Set on the way in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,
    /// Set on the way out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

fn default_api_version() -> String {
    ADMISSION_API_VERSION.to_string()
}

fn default_kind() -> String {
    ADMISSION_KIND.to_string()
}

impl AdmissionReview {
    /// Wrap a request, as the API server would send it.
    #[must_use]
    pub fn for_request(request: AdmissionRequest) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            request: Some(request),
            response: None,
        }
    }

    /// Wrap a response to send back.
    #[must_use]
    pub fn for_response(response: AdmissionResponse) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            request: None,
            response: Some(response),
        }
    }
}

/// The request half of a review.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    /// Identifies the request; echoed in the response.
    pub uid: String,
    /// Namespace of the object, if namespaced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Name of the object; may be empty for generated names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `CREATE`, `UPDATE`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// The object being admitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
}

/// The response half of a review.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    /// The request's UID.
    pub uid: String,
    /// Whether the object is admitted.
    pub allowed: bool,
    /// Base64-encoded JSON Patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    /// [`PATCH_TYPE_JSON_PATCH`] when `patch` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<String>,
    /// Failure details for rejected requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AdmissionStatus>,
}

/// A trimmed `meta/v1` Status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionStatus {
    /// HTTP-style status code.
    pub code: u16,
    /// Human-readable reason.
    #[serde(default)]
    pub message: String,
}

impl AdmissionResponse {
    /// Admit the object unchanged.
    #[must_use]
    pub fn allowed(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: true,
            ..Default::default()
        }
    }

    /// Reject the request with the error's status code.
    #[must_use]
    pub fn errored(uid: impl Into<String>, error: &AdmissionError) -> Self {
        Self {
            uid: uid.into(),
            allowed: false,
            status: Some(AdmissionStatus {
                code: error.http_status_code(),
                message: error.to_string(),
            }),
            ..Default::default()
        }
    }

    /// Admit the object with the patch turning `original` into `mutated`.
    ///
    /// An empty diff admits the object unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::Internal`] if the patch cannot be encoded.
    pub fn patched(
        uid: impl Into<String>,
        original: &Value,
        mutated: &Value,
    ) -> Result<Self, AdmissionError> {
        let patch = json_patch::diff(original, mutated);
        if patch.0.is_empty() {
            return Ok(Self::allowed(uid));
        }
        let encoded =
            serde_json::to_vec(&patch).map_err(|e| AdmissionError::Internal(e.to_string()))?;
        Ok(Self {
            uid: uid.into(),
            allowed: true,
            patch: Some(STANDARD.encode(encoded)),
            patch_type: Some(PATCH_TYPE_JSON_PATCH.to_string()),
            status: None,
        })
    }

    /// Decode the patch, if any.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::Decode`] if the patch is not base64 JSON Patch.
    pub fn decoded_patch(&self) -> Result<Option<json_patch::Patch>, AdmissionError> {
        let Some(patch) = self.patch.as_deref() else {
            return Ok(None);
        };
        let bytes = STANDARD
            .decode(patch)
            .map_err(|e| AdmissionError::Decode(e.to_string()))?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| AdmissionError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn review_parses_api_server_payload() {
        let review: AdmissionReview = serde_json::from_value(json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
                "kind": {"group": "", "version": "v1", "kind": "Pod"},
                "namespace": "default",
                "operation": "CREATE",
                "object": {"metadata": {"name": "web"}}
            }
        }))
        .unwrap();

        let request = review.request.unwrap();
        assert_eq!(request.uid, "705ab4f5-6393-11e8-b7cc-42010a800002");
        assert_eq!(request.namespace.as_deref(), Some("default"));
        assert_eq!(request.operation.as_deref(), Some("CREATE"));
        assert!(request.name.is_none());
        assert_eq!(request.object.unwrap()["metadata"]["name"], "web");
    }

    #[test]
    fn response_serializes_camel_case_and_skips_empty() {
        let review = AdmissionReview::for_response(AdmissionResponse::allowed("abc"));
        assert_eq!(
            serde_json::to_value(&review).unwrap(),
            json!({
                "apiVersion": "admission.k8s.io/v1",
                "kind": "AdmissionReview",
                "response": {"uid": "abc", "allowed": true}
            })
        );
    }

    #[test]
    fn patched_response_applies_to_original() {
        let original = json!({"metadata": {"name": "web"}, "spec": {"containers": []}});
        let mutated = json!({
            "metadata": {"name": "web", "labels": {"a": "b"}},
            "spec": {"containers": [], "schedulingGates": [{"name": "gate"}]}
        });

        let response = AdmissionResponse::patched("abc", &original, &mutated).unwrap();
        assert!(response.allowed);
        assert_eq!(response.patch_type.as_deref(), Some(PATCH_TYPE_JSON_PATCH));

        let patch = response.decoded_patch().unwrap().unwrap();
        let mut doc = original.clone();
        json_patch::patch(&mut doc, &patch.0).unwrap();
        assert_eq!(doc, mutated);
    }

    #[test]
    fn identical_objects_yield_no_patch() {
        let object = json!({"metadata": {"name": "web"}});
        let response = AdmissionResponse::patched("abc", &object, &object).unwrap();
        assert!(response.allowed);
        assert!(response.patch.is_none());
        assert!(response.patch_type.is_none());
    }

    #[test]
    fn errored_response_carries_status() {
        let response =
            AdmissionResponse::errored("abc", &AdmissionError::Decode("bad pod".into()));
        assert!(!response.allowed);
        let status = response.status.unwrap();
        assert_eq!(status.code, 400);
        assert!(status.message.contains("bad pod"));
    }
}
