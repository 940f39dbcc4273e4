//! Post-admission confirmation that a gated pod exists.
//!
//! The admission response goes out before the pod is persisted, so the
//! event announcing the gate cannot be attached inline. A [`ConfirmationTask`]
//! polls for the pod with exponential backoff under its own deadline and emits
//! the event once the pod is visible. Its outcome is logged and nothing else.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Event, EventSource, ObjectReference, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use kube::api::{Api, PostParams};
use kube::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use archgate_core::names::{SCHEDULING_GATE_ADDED_MESSAGE, SCHEDULING_GATE_ADDED_REASON};

use crate::error::ConfirmationError;

/// Component name reported on emitted events.
pub const EVENT_COMPONENT: &str = "archgate-webhook";

/// Event type for informational events.
pub const EVENT_TYPE_NORMAL: &str = "Normal";

/// Exponential backoff for the pod lookup.
///
/// The pod is looked up at most `max_steps` times, the first lookup
/// included. The first retry waits `initial_delay_ms`, each later one
/// `factor` times longer. The defaults (2ms, x2, 15 steps) cap the total
/// wait at about 33 seconds. A policy of zero steps still looks up once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "RetryPolicy::default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Multiplier applied to the delay after each retry.
    #[serde(default = "RetryPolicy::default_factor")]
    pub factor: u32,
    /// Maximum number of lookups, the first one included.
    #[serde(default = "RetryPolicy::default_max_steps")]
    pub max_steps: u32,
}

impl RetryPolicy {
    const fn default_initial_delay_ms() -> u64 {
        2
    }

    const fn default_factor() -> u32 {
        2
    }

    const fn default_max_steps() -> u32 {
        15
    }

    /// The sleeps between consecutive lookups.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let factor = u64::from(self.factor);
        std::iter::successors(Some(self.initial_delay_ms), move |ms| {
            Some(ms.saturating_mul(factor))
        })
        .take(self.max_steps.saturating_sub(1) as usize)
        .map(Duration::from_millis)
    }

    /// Total time spent sleeping when every lookup misses.
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        self.delays().sum()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: Self::default_initial_delay_ms(),
            factor: Self::default_factor(),
            max_steps: Self::default_max_steps(),
        }
    }
}

/// Looks a gated pod up and announces the gate on it.
#[async_trait]
pub trait GatedPodNotifier: Send + Sync {
    /// Fetch the pod and, if it exists, emit the gate event on it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfirmationError::NotFound`] while the pod is not visible,
    /// and [`ConfirmationError::Api`] for any other failure.
    async fn notify_gated(&self, namespace: &str, name: &str) -> Result<(), ConfirmationError>;
}

/// [`GatedPodNotifier`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeGatedPodNotifier {
    client: Client,
}

impl KubeGatedPodNotifier {
    /// Create a notifier using `client`.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GatedPodNotifier for KubeGatedPodNotifier {
    async fn notify_gated(&self, namespace: &str, name: &str) -> Result<(), ConfirmationError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod = match pods.get(name).await {
            Ok(pod) => pod,
            Err(kube::Error::Api(e)) if e.code == 404 => {
                return Err(ConfirmationError::NotFound {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                });
            }
            Err(e) => return Err(ConfirmationError::Api(e.to_string())),
        };

        let events: Api<Event> = Api::namespaced(self.client.clone(), namespace);
        events
            .create(
                &PostParams::default(),
                &scheduling_gate_event(&pod, Utc::now()),
            )
            .await
            .map_err(|e| ConfirmationError::Api(e.to_string()))?;
        Ok(())
    }
}

/// The `Normal` event announcing that the gate was added to `pod`.
#[must_use]
pub fn scheduling_gate_event(pod: &Pod, now: DateTime<Utc>) -> Event {
    let name = pod.metadata.name.clone().unwrap_or_default();
    let namespace = pod.metadata.namespace.clone();
    Event {
        metadata: ObjectMeta {
            generate_name: Some(format!("{name}.")),
            namespace: namespace.clone(),
            ..Default::default()
        },
        involved_object: ObjectReference {
            api_version: Some("v1".to_string()),
            kind: Some("Pod".to_string()),
            name: Some(name),
            namespace,
            uid: pod.metadata.uid.clone(),
            resource_version: pod.metadata.resource_version.clone(),
            ..Default::default()
        },
        reason: Some(SCHEDULING_GATE_ADDED_REASON.to_string()),
        message: Some(SCHEDULING_GATE_ADDED_MESSAGE.to_string()),
        type_: Some(EVENT_TYPE_NORMAL.to_string()),
        source: Some(EventSource {
            component: Some(EVENT_COMPONENT.to_string()),
            host: None,
        }),
        reporting_component: Some(EVENT_COMPONENT.to_string()),
        first_timestamp: Some(Time(now)),
        last_timestamp: Some(Time(now)),
        count: Some(1),
        ..Default::default()
    }
}

/// A bounded, self-contained confirmation job.
#[derive(Clone)]
pub struct ConfirmationTask {
    notifier: Arc<dyn GatedPodNotifier>,
    policy: RetryPolicy,
    timeout: Duration,
}

impl ConfirmationTask {
    /// Create a task template.
    #[must_use]
    pub fn new(notifier: Arc<dyn GatedPodNotifier>, policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            notifier,
            policy,
            timeout,
        }
    }

    /// The retry policy.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Poll for the pod until it is found, returning the number of lookups.
    ///
    /// # Errors
    ///
    /// Fails when the deadline passes, when every step misses, or on the
    /// first non-retriable error.
    pub async fn confirm(&self, namespace: &str, name: &str) -> Result<u32, ConfirmationError> {
        tokio::time::timeout(self.timeout, self.poll(namespace, name))
            .await
            .map_err(|_| ConfirmationError::TimedOut(self.timeout))?
    }

    async fn poll(&self, namespace: &str, name: &str) -> Result<u32, ConfirmationError> {
        let mut delays = self.policy.delays();
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.notifier.notify_gated(namespace, name).await {
                Ok(()) => return Ok(attempts),
                Err(e) if e.is_retriable() => {
                    debug!(namespace, name, attempts, "Gated pod not visible yet");
                }
                Err(e) => return Err(e),
            }
            match delays.next() {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return Err(ConfirmationError::RetriesExhausted { attempts }),
            }
        }
    }

    /// Run the confirmation and log its outcome.
    pub async fn run(self, namespace: String, name: String) {
        match self.confirm(&namespace, &name).await {
            Ok(attempts) => {
                info!(namespace = %namespace, name = %name, attempts, "Scheduling gate event emitted");
            }
            Err(e) => {
                warn!(namespace = %namespace, name = %name, error = %e, "Failed to confirm gated pod");
            }
        }
    }
}

impl std::fmt::Debug for ConfirmationTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationTask")
            .field("policy", &self.policy)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
