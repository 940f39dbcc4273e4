//! The signature `policy.json` artifact.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SystemConfigError;

const DOCKER_DAEMON_TRANSPORT: &str = "docker-daemon";
const DOCKER_TRANSPORT: &str = "docker";
const ATOMIC_TRANSPORT: &str = "atomic";

/// Transports that carry per-registry rules.
const REGISTRY_TRANSPORTS: [&str; 2] = [DOCKER_TRANSPORT, ATOMIC_TRANSPORT];

/// A single policy requirement, e.g. `{"type": "reject"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntry {
    /// Requirement type.
    #[serde(rename = "type")]
    pub kind: String,
}

impl PolicyEntry {
    /// Accept any image.
    #[must_use]
    pub fn insecure_accept_anything() -> Self {
        Self {
            kind: "insecureAcceptAnything".to_string(),
        }
    }

    /// Reject every image.
    #[must_use]
    pub fn reject() -> Self {
        Self {
            kind: "reject".to_string(),
        }
    }
}

type Transports = BTreeMap<String, BTreeMap<String, Vec<PolicyEntry>>>;

/// Top-level `policy.json` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConf {
    /// Requirements applied when no transport rule matches.
    pub default: Vec<PolicyEntry>,
    /// Per-transport, per-scope requirements.
    pub transports: Transports,
}

impl Default for PolicyConf {
    fn default() -> Self {
        Self {
            default: vec![PolicyEntry::insecure_accept_anything()],
            transports: default_transports(),
        }
    }
}

fn default_transports() -> Transports {
    let mut transports = Transports::new();
    transports.insert(
        DOCKER_DAEMON_TRANSPORT.to_string(),
        BTreeMap::from([(String::new(), vec![PolicyEntry::insecure_accept_anything()])]),
    );
    for transport in REGISTRY_TRANSPORTS {
        transports.insert(transport.to_string(), BTreeMap::new());
    }
    transports
}

impl PolicyConf {
    /// Restore the default transport rules.
    pub fn reset_transports(&mut self) {
        self.transports = default_transports();
    }

    /// Reject anything not matched by a transport rule.
    pub fn set_default_reject(&mut self) {
        self.default = vec![PolicyEntry::reject()];
    }

    /// Reject every image from `registry`.
    pub fn set_reject_for_registry(&mut self, registry: &str) {
        self.set_for_registry(registry, PolicyEntry::reject());
    }

    /// Accept every image from `registry`.
    pub fn set_accept_for_registry(&mut self, registry: &str) {
        self.set_for_registry(registry, PolicyEntry::insecure_accept_anything());
    }

    fn set_for_registry(&mut self, registry: &str, entry: PolicyEntry) {
        for transport in REGISTRY_TRANSPORTS {
            self.transports
                .entry(transport.to_string())
                .or_default()
                .insert(registry.to_string(), vec![entry.clone()]);
        }
    }

    /// Encode as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, SystemConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON document to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or any filesystem operation fails.
    pub fn write_to(&self, path: &Path) -> Result<(), SystemConfigError> {
        super::write_file(path, self.to_json()?.as_bytes())
    }
}
