//! Scheduling gate admission webhook for archgate.
//!
//! Pods are gated at creation so the scheduler waits until their
//! architecture requirement is known. This crate provides:
//!
//! - The admission logic adding the gate and bookkeeping labels
//! - A bounded background pool confirming gated pods with an event
//! - Prometheus metrics for processed and gated pods
//! - The HTTP surface the API server calls
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Kubernetes API server                    │
//! └─────────────────────────────────────────────────────────────┘
//!                   │ AdmissionReview          ▲ get pod / create event
//!                   ▼                          │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      archgate-webhook                       │
//! │  ┌─────────────┐ ┌──────────────────┐ ┌─────────────────┐   │
//! │  │   Router    │▶│ SchedulingGate   │▶│  WorkerPool +   │   │
//! │  │ + Handlers  │ │ Webhook          │ │  Confirmation   │   │
//! │  └─────────────┘ └──────────────────┘ └─────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                   ┌──────────────────────┐
//!                   │  archgate-placement  │
//!                   │  (PodView, ignoring) │
//!                   └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use archgate_webhook::{
//!     create_router, ConfirmationTask, KubeGatedPodNotifier, SchedulingGateWebhook,
//!     WebhookConfig, WebhookMetrics, WebhookState, WorkerPool,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WebhookConfig::from_env();
//! let client = kube::Client::try_default().await?;
//!
//! let confirmation = ConfirmationTask::new(
//!     Arc::new(KubeGatedPodNotifier::new(client)),
//!     config.retry_policy,
//!     config.confirmation_timeout(),
//! );
//! let webhook = SchedulingGateWebhook::new(
//!     config.ignore_policy(),
//!     Arc::new(WebhookMetrics::new()?),
//!     WorkerPool::new(config.worker_pool_size),
//!     confirmation,
//! );
//!
//! let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
//! let app = create_router(WebhookState::new(webhook, config));
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod admission;
pub mod config;
pub mod confirm;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod metrics;
pub mod pool;
pub mod routes;
pub mod state;

#[cfg(test)]
mod mock;

pub use admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, AdmissionStatus};
pub use config::WebhookConfig;
pub use confirm::{ConfirmationTask, GatedPodNotifier, KubeGatedPodNotifier, RetryPolicy};
pub use error::{AdmissionError, ConfirmationError, PoolError};
pub use gate::{GateOutcome, SchedulingGateWebhook};
pub use metrics::{MetricsError, WebhookMetrics};
pub use pool::WorkerPool;
pub use routes::create_router;
pub use state::WebhookState;
