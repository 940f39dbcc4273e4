//! Archgate Webhook - Scheduling Gate Admission Service
//!
//! This is the main entry point for the webhook service. It writes the
//! registry configuration consumed by container tooling, then serves the
//! admission endpoint.
//!
//! # HTTP Endpoints
//!
//! - `POST /add-pod-scheduling-gate` - Pod admission review
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics
//!
//! TLS is terminated in front of this process.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use archgate_registry::{OciImageInspector, SystemConfig};
use archgate_webhook::{
    create_router, ConfirmationTask, KubeGatedPodNotifier, SchedulingGateWebhook, WebhookConfig,
    WebhookMetrics, WebhookState, WorkerPool,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,archgate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Archgate Webhook");

    // Load configuration from environment
    let config = WebhookConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        operator_namespace = %config.operator_namespace,
        ignored_namespace_prefixes = ?config.ignored_namespace_prefixes,
        worker_pool_size = config.worker_pool_size,
        confirmation_timeout_seconds = config.confirmation_timeout_seconds,
        registry_config_dir = %config.registry_config_dir.display(),
        "Webhook configuration loaded"
    );

    // Render the registry configuration for container tooling
    let settings = config.load_registry_settings()?;
    OciImageInspector::new(&settings)?;
    let paths = config.registry_config_paths();
    SystemConfig::from_settings(&settings).write_all(&paths)?;
    tracing::info!(
        registries_conf = %paths.registries_conf.display(),
        policy_conf = %paths.policy_conf.display(),
        certs_dir = %paths.certs_dir.display(),
        "Registry configuration written"
    );

    // Connect to the cluster
    let client = kube::Client::try_default().await?;
    tracing::info!("Connected to Kubernetes cluster");

    let confirmation = ConfirmationTask::new(
        Arc::new(KubeGatedPodNotifier::new(client)),
        config.retry_policy,
        config.confirmation_timeout(),
    );
    let webhook = SchedulingGateWebhook::new(
        config.ignore_policy(),
        Arc::new(WebhookMetrics::new()?),
        WorkerPool::new(config.worker_pool_size),
        confirmation,
    );

    // Start HTTP server
    let listen_addr = config.listen_addr.clone();
    let app = create_router(WebhookState::new(webhook, config));
    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
