//! Webhook application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use crate::config::WebhookConfig;
use crate::gate::SchedulingGateWebhook;

/// Shared application state for the webhook server.
#[derive(Debug, Clone)]
pub struct WebhookState {
    /// The admission logic.
    pub webhook: Arc<SchedulingGateWebhook>,
    /// Webhook configuration.
    pub config: Arc<WebhookConfig>,
}

impl WebhookState {
    /// Create a new webhook state.
    #[must_use]
    pub fn new(webhook: SchedulingGateWebhook, config: WebhookConfig) -> Self {
        Self {
            webhook: Arc::new(webhook),
            config: Arc::new(config),
        }
    }
}
