//! Prometheus metrics for the admission webhook.
//!
//! | Metric | Type |
//! |--------|------|
//! | `archgate_webhook_processed_pods_total` | Counter |
//! | `archgate_webhook_gated_pods_total` | Counter |
//! | `archgate_webhook_gated_pods` | Gauge |
//! | `archgate_webhook_response_time_seconds` | Histogram |
//!
//! The gauge only ever grows here; the reconciler that removes gates is
//! expected to decrement its own view of it.

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramTimer, IntCounter, IntGauge, Registry,
    TextEncoder,
};
use thiserror::Error;

/// Response time buckets in seconds. Admission must answer in milliseconds.
pub const RESPONSE_TIME_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Failed to register a metric with Prometheus.
    #[error("failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),

    /// Failed to encode metrics output.
    #[error("failed to encode metrics: {0}")]
    Encoding(String),
}

/// Metrics recorded by the admission gate.
///
/// Owns its registry, so several instances can coexist in one process.
#[derive(Clone)]
pub struct WebhookMetrics {
    registry: Registry,
    processed_pods: IntCounter,
    gated_pods: IntCounter,
    gated_pods_gauge: IntGauge,
    response_time: Histogram,
}

impl WebhookMetrics {
    /// Create and register the webhook metrics in a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric fails to register.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let processed_pods = IntCounter::new(
            "archgate_webhook_processed_pods_total",
            "Pods processed by the scheduling gate webhook",
        )?;
        registry.register(Box::new(processed_pods.clone()))?;

        let gated_pods = IntCounter::new(
            "archgate_webhook_gated_pods_total",
            "Pods that received the scheduling gate",
        )?;
        registry.register(Box::new(gated_pods.clone()))?;

        let gated_pods_gauge = IntGauge::new(
            "archgate_webhook_gated_pods",
            "Pods currently holding the scheduling gate",
        )?;
        registry.register(Box::new(gated_pods_gauge.clone()))?;

        let response_time = Histogram::with_opts(
            HistogramOpts::new(
                "archgate_webhook_response_time_seconds",
                "Time spent answering an admission request",
            )
            .buckets(RESPONSE_TIME_BUCKETS.to_vec()),
        )?;
        registry.register(Box::new(response_time.clone()))?;

        Ok(Self {
            registry,
            processed_pods,
            gated_pods,
            gated_pods_gauge,
            response_time,
        })
    }

    /// Count a pod seen by the webhook and start timing the response.
    ///
    /// The duration is observed when the returned timer drops.
    #[must_use]
    pub fn pod_processed(&self) -> HistogramTimer {
        self.processed_pods.inc();
        self.response_time.start_timer()
    }

    /// Count a pod that received the gate.
    pub fn pod_gated(&self) {
        self.gated_pods.inc();
        self.gated_pods_gauge.inc();
    }

    /// Total pods processed.
    #[must_use]
    pub fn processed_pods(&self) -> u64 {
        self.processed_pods.get()
    }

    /// Total pods gated.
    #[must_use]
    pub fn gated_pods(&self) -> u64 {
        self.gated_pods.get()
    }

    /// Number of response time observations.
    #[must_use]
    pub fn responses_observed(&self) -> u64 {
        self.response_time.get_sample_count()
    }

    /// Encode all metrics in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode_text(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }
}

impl std::fmt::Debug for WebhookMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookMetrics")
            .field("processed_pods", &self.processed_pods.get())
            .field("gated_pods", &self.gated_pods.get())
            .finish_non_exhaustive()
    }
}
