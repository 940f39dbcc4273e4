//! Webhook configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use archgate_placement::{IgnorePolicy, DEFAULT_IGNORED_NAMESPACE_PREFIXES};
use archgate_registry::{RegistrySettings, SystemConfigError, SystemConfigPaths};

use crate::confirm::RetryPolicy;

/// Configuration for the webhook service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebhookConfig {
    /// Listen address (e.g., "0.0.0.0:9443").
    #[serde(default = "WebhookConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Namespace the operator runs in; its pods are never gated.
    #[serde(default = "WebhookConfig::default_operator_namespace")]
    pub operator_namespace: String,

    /// Namespace prefixes reserved for infrastructure.
    #[serde(default = "WebhookConfig::default_ignored_prefixes")]
    pub ignored_namespace_prefixes: Vec<String>,

    /// Maximum concurrent confirmation jobs.
    #[serde(default = "WebhookConfig::default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// Deadline for a single confirmation job, in seconds.
    #[serde(default = "WebhookConfig::default_confirmation_timeout")]
    pub confirmation_timeout_seconds: u64,

    /// Backoff for the gated pod lookup.
    #[serde(default)]
    pub retry_policy: RetryPolicy,

    /// Base directory for the generated registry configuration.
    #[serde(default = "WebhookConfig::default_registry_config_dir")]
    pub registry_config_dir: PathBuf,

    /// JSON file with the cluster's registry settings, if any.
    #[serde(default)]
    pub registry_settings_file: Option<PathBuf>,

    /// Maximum admission request body size in bytes.
    #[serde(default = "WebhookConfig::default_max_body")]
    pub max_body_bytes: usize,
}

impl WebhookConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:9443".to_string()
    }

    fn default_operator_namespace() -> String {
        "archgate-system".to_string()
    }

    fn default_ignored_prefixes() -> Vec<String> {
        DEFAULT_IGNORED_NAMESPACE_PREFIXES
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    const fn default_worker_pool_size() -> usize {
        16
    }

    const fn default_confirmation_timeout() -> u64 {
        120
    }

    fn default_registry_config_dir() -> PathBuf {
        PathBuf::from("/tmp/archgate")
    }

    const fn default_max_body() -> usize {
        3 * 1024 * 1024
    }

    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `ARCHGATE_LISTEN_ADDR`
    /// - `ARCHGATE_NAMESPACE`: the operator's namespace
    /// - `ARCHGATE_IGNORED_NAMESPACE_PREFIXES`: comma-separated prefixes
    /// - `ARCHGATE_WORKER_POOL_SIZE`
    /// - `ARCHGATE_CONFIRMATION_TIMEOUT_SECONDS`
    /// - `ARCHGATE_RETRY_INITIAL_DELAY_MS`, `ARCHGATE_RETRY_FACTOR`, `ARCHGATE_RETRY_MAX_STEPS`
    /// - `ARCHGATE_REGISTRY_CONFIG_DIR`
    /// - `ARCHGATE_REGISTRY_SETTINGS_FILE`
    /// - `ARCHGATE_MAX_BODY_BYTES`
    ///
    /// Unparseable numbers keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("ARCHGATE_LISTEN_ADDR") {
            config.listen_addr = val;
        }
        if let Some(val) = lookup("ARCHGATE_NAMESPACE") {
            config.operator_namespace = val;
        }
        if let Some(val) = lookup("ARCHGATE_IGNORED_NAMESPACE_PREFIXES") {
            config.ignored_namespace_prefixes = val
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        parse_into(&lookup, "ARCHGATE_WORKER_POOL_SIZE", &mut config.worker_pool_size);
        parse_into(
            &lookup,
            "ARCHGATE_CONFIRMATION_TIMEOUT_SECONDS",
            &mut config.confirmation_timeout_seconds,
        );
        parse_into(
            &lookup,
            "ARCHGATE_RETRY_INITIAL_DELAY_MS",
            &mut config.retry_policy.initial_delay_ms,
        );
        parse_into(&lookup, "ARCHGATE_RETRY_FACTOR", &mut config.retry_policy.factor);
        parse_into(&lookup, "ARCHGATE_RETRY_MAX_STEPS", &mut config.retry_policy.max_steps);
        if let Some(val) = lookup("ARCHGATE_REGISTRY_CONFIG_DIR") {
            config.registry_config_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("ARCHGATE_REGISTRY_SETTINGS_FILE") {
            config.registry_settings_file = Some(PathBuf::from(val));
        }
        parse_into(&lookup, "ARCHGATE_MAX_BODY_BYTES", &mut config.max_body_bytes);

        config
    }

    /// The ignoring rule for this deployment.
    #[must_use]
    pub fn ignore_policy(&self) -> IgnorePolicy {
        IgnorePolicy {
            operator_namespace: self.operator_namespace.clone(),
            ignored_namespace_prefixes: self.ignored_namespace_prefixes.clone(),
        }
    }

    /// Get the confirmation deadline as a `Duration`.
    #[must_use]
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_seconds)
    }

    /// Where the registry configuration artifacts are written.
    #[must_use]
    pub fn registry_config_paths(&self) -> SystemConfigPaths {
        SystemConfigPaths::under(&self.registry_config_dir)
    }

    /// Read the registry settings file, or the defaults when none is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_registry_settings(&self) -> Result<RegistrySettings, SystemConfigError> {
        match &self.registry_settings_file {
            Some(path) => read_registry_settings(path),
            None => Ok(RegistrySettings::default()),
        }
    }
}

fn read_registry_settings(path: &Path) -> Result<RegistrySettings, SystemConfigError> {
    let data = std::fs::read_to_string(path)?;
    RegistrySettings::from_json(&data)
}

fn parse_into<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    if let Some(n) = lookup(key).and_then(|v| v.trim().parse().ok()) {
        *target = n;
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            operator_namespace: Self::default_operator_namespace(),
            ignored_namespace_prefixes: Self::default_ignored_prefixes(),
            worker_pool_size: Self::default_worker_pool_size(),
            confirmation_timeout_seconds: Self::default_confirmation_timeout(),
            retry_policy: RetryPolicy::default(),
            registry_config_dir: Self::default_registry_config_dir(),
            registry_settings_file: None,
            max_body_bytes: Self::default_max_body(),
        }
    }
}
