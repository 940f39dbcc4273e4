//! The `registries.conf` artifact.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SystemConfigError;

/// Unqualified search registries used when none are configured.
pub const DEFAULT_UNQUALIFIED_SEARCH_REGISTRIES: [&str; 2] =
    ["registry.access.redhat.com", "docker.io"];

/// Top-level `registries.conf` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistriesConf {
    /// Registries tried, in order, for short image names.
    pub unqualified_search_registries: Vec<String>,
    /// How short names are resolved (`enforcing`, `permissive`, `disabled` or empty).
    #[serde(default)]
    pub short_name_mode: String,
    /// Per-registry settings, in insertion order.
    #[serde(rename = "registry", default)]
    pub registries: Vec<RegistryConf>,
}

/// One `[[registry]]` table.
///
/// The tri-state flags are omitted from the output when `None`, which is
/// distinct from an explicit `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConf {
    /// Registry host, with optional port and namespace.
    pub location: String,
    /// Image prefix matched by this entry; empty means `location`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    /// Refuse pulls from this registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<bool>,
    /// Explicitly allow pulls from this registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<bool>,
    /// Allow plain HTTP and unverified TLS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    /// Pull-through mirrors, tried before `location`.
    #[serde(rename = "mirror", default, skip_serializing_if = "Vec::is_empty")]
    pub mirrors: Vec<Mirror>,
}

/// A `[[registry.mirror]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mirror {
    /// Mirror host.
    pub location: String,
}

impl Default for RegistriesConf {
    fn default() -> Self {
        Self {
            unqualified_search_registries: DEFAULT_UNQUALIFIED_SEARCH_REGISTRIES
                .iter()
                .map(ToString::to_string)
                .collect(),
            short_name_mode: String::new(),
            registries: Vec::new(),
        }
    }
}

impl RegistryConf {
    /// Whether this entry carries no settings at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocked.is_none()
            && self.allowed.is_none()
            && self.insecure.is_none()
            && self.mirrors.is_empty()
    }

    /// Replace the mirror list.
    pub fn set_mirrors<S: AsRef<str>>(&mut self, locations: &[S]) {
        self.mirrors = locations
            .iter()
            .map(|l| Mirror {
                location: l.as_ref().to_string(),
            })
            .collect();
    }
}

impl RegistriesConf {
    /// The entry for `location`.
    #[must_use]
    pub fn get(&self, location: &str) -> Option<&RegistryConf> {
        self.registries.iter().find(|r| r.location == location)
    }

    /// The entry for `location`, appended if it does not exist yet.
    pub fn get_or_create(&mut self, location: &str) -> &mut RegistryConf {
        let index = match self.registries.iter().position(|r| r.location == location) {
            Some(index) => index,
            None => {
                self.registries.push(RegistryConf {
                    location: location.to_string(),
                    ..RegistryConf::default()
                });
                self.registries.len() - 1
            }
        };
        &mut self.registries[index]
    }

    /// Drop entries that carry no settings.
    pub fn prune_empty(&mut self) {
        self.registries.retain(|r| !r.is_empty());
    }

    /// Encode as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, SystemConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Write the TOML document to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or any filesystem operation fails.
    pub fn write_to(&self, path: &Path) -> Result<(), SystemConfigError> {
        super::write_file(path, self.to_toml()?.as_bytes())
    }
}
