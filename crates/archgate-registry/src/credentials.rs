//! Registry credentials from pod pull secrets.
//!
//! Pull secrets carry a Docker config payload, either the modern
//! `.dockerconfigjson` shape (`{"auths": {host: entry}}`) or the legacy
//! `.dockercfg` shape (`{host: entry}`). Each entry holds a base64
//! `user:password` pair in `auth`, or explicit `username`/`password` fields.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use base64::prelude::*;
use serde::Deserialize;

use crate::error::{ResolveError, Result};

const DOCKER_HUB: &str = "docker.io";
const DOCKER_HUB_ALIASES: [&str; 3] = ["index.docker.io", "registry-1.docker.io", "docker.io"];

/// Username/password for a single registry.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryCredentials {
    /// Registry username.
    pub username: String,
    /// Registry password or token.
    pub password: String,
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Credentials for every registry named in a pod's pull secrets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullCredentials {
    auths: BTreeMap<String, RegistryCredentials>,
}

#[derive(Debug, Deserialize)]
struct DockerConfigJson {
    auths: HashMap<String, AuthEntry>,
}

#[derive(Debug, Deserialize)]
struct AuthEntry {
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

impl PullCredentials {
    /// No credentials; every registry is accessed anonymously.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Parse a `.dockerconfigjson` or legacy `.dockercfg` payload.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidCredentials`] if the payload is not valid
    /// JSON in either shape or an `auth` field is not base64 `user:password`.
    pub fn from_docker_config(data: &[u8]) -> Result<Self> {
        let entries = match serde_json::from_slice::<DockerConfigJson>(data) {
            Ok(config) => config.auths,
            Err(_) => serde_json::from_slice::<HashMap<String, AuthEntry>>(data)
                .map_err(|e| ResolveError::InvalidCredentials(e.to_string()))?,
        };

        let mut auths = BTreeMap::new();
        for (server, entry) in entries {
            if let Some(creds) = entry.into_credentials()? {
                auths.insert(registry_host(&server), creds);
            }
        }
        Ok(Self { auths })
    }

    /// Parse and merge several pull secret payloads, in pod order.
    ///
    /// Payloads that fail to parse are skipped with a warning so that one bad
    /// secret does not block anonymous or other-secret access.
    #[must_use]
    pub fn from_secret_payloads<'a>(payloads: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut merged = Self::default();
        for (index, payload) in payloads.into_iter().enumerate() {
            match Self::from_docker_config(payload) {
                Ok(creds) => merged.merge(creds),
                Err(e) => tracing::warn!(index, error = %e, "Skipping unreadable pull secret"),
            }
        }
        merged
    }

    /// Merge another set of credentials. Existing entries win.
    pub fn merge(&mut self, other: Self) {
        for (registry, creds) in other.auths {
            self.auths.entry(registry).or_insert(creds);
        }
    }

    /// Credentials for a registry host, if any.
    #[must_use]
    pub fn for_registry(&self, registry: &str) -> Option<&RegistryCredentials> {
        self.auths.get(&registry_host(registry))
    }

    /// Number of registries with credentials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.auths.len()
    }

    /// Whether there are no credentials at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.auths.is_empty()
    }
}

impl AuthEntry {
    fn into_credentials(self) -> Result<Option<RegistryCredentials>> {
        if let (Some(username), Some(password)) = (self.username, self.password) {
            return Ok(Some(RegistryCredentials { username, password }));
        }

        let Some(auth) = self.auth.filter(|a| !a.is_empty()) else {
            return Ok(None);
        };
        let decoded = BASE64_STANDARD
            .decode(auth.trim())
            .map_err(|e| ResolveError::InvalidCredentials(format!("auth is not base64: {e}")))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| ResolveError::InvalidCredentials("auth is not UTF-8".to_string()))?;
        let (username, password) = decoded.split_once(':').ok_or_else(|| {
            ResolveError::InvalidCredentials("auth is not user:password".to_string())
        })?;

        Ok(Some(RegistryCredentials {
            username: username.to_string(),
            password: password.to_string(),
        }))
    }
}

/// Reduce a docker config server key to a bare registry host.
fn registry_host(server: &str) -> String {
    let host = server
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host = host.split('/').next().unwrap_or(host).to_ascii_lowercase();

    if DOCKER_HUB_ALIASES.contains(&host.as_str()) {
        DOCKER_HUB.to_string()
    } else {
        host
    }
}
