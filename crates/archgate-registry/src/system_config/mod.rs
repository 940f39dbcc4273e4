//! Registry system configuration consumed by container tooling.
//!
//! [`RegistrySettings`] is the operator-facing description of registries.
//! [`SystemConfig::from_settings`] renders it into three artifacts:
//!
//! - `registries.conf` (TOML): search registries, mirrors and the tri-state
//!   `insecure`/`allowed`/`blocked` flags
//! - `policy.json`: the signature policy, with reject rules for blocked
//!   registries
//! - `<certs_dir>/<registry>/ca.crt`: per-registry CA certificates

mod certs;
mod policy;
mod registries;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::SystemConfigError;

pub use certs::{RegistryCert, CA_FILE_NAME};
pub use policy::{PolicyConf, PolicyEntry};
pub use registries::{Mirror, RegistriesConf, RegistryConf, DEFAULT_UNQUALIFIED_SEARCH_REGISTRIES};

/// Settings for a single registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryEntrySettings {
    /// Registry host, optionally with a port.
    pub location: String,
    /// Pull-through mirror hosts.
    pub mirrors: Vec<String>,
    /// Allow plain HTTP and unverified TLS. `None` leaves the tooling default.
    pub insecure: Option<bool>,
    /// Add the registry to the allow list.
    pub allowed: Option<bool>,
    /// Refuse pulls from the registry.
    pub blocked: Option<bool>,
    /// PEM CA certificate trusted for this registry.
    pub ca_certificate: Option<String>,
}

impl RegistryEntrySettings {
    /// Registry host of the location, without any repository path.
    #[must_use]
    pub fn host(&self) -> &str {
        self.location.split('/').next().unwrap_or(&self.location)
    }

    /// Whether a normalized image name falls under this location.
    ///
    /// A host location matches at a `/` boundary; a repository location
    /// (`quay.io/org/app`) also matches at its tag or digest.
    #[must_use]
    pub fn matches(&self, image: &str) -> bool {
        if self.location.is_empty() {
            return false;
        }
        let Some(rest) = image.strip_prefix(self.location.as_str()) else {
            return false;
        };
        let repository_scoped = self.location.contains('/');
        rest.is_empty()
            || rest.starts_with('/')
            || (repository_scoped && rest.starts_with([':', '@']))
    }

    /// The image rewritten onto each mirror, in configured order.
    #[must_use]
    pub fn mirrored_images(&self, image: &str) -> Vec<String> {
        if !self.matches(image) {
            return Vec::new();
        }
        let rest = &image[self.location.len()..];
        self.mirrors
            .iter()
            .map(|mirror| format!("{}{rest}", mirror.trim_end_matches('/')))
            .collect()
    }
}

/// Operator-facing registry settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrySettings {
    /// Registries searched for short image names.
    pub unqualified_search_registries: Vec<String>,
    /// Per-registry settings.
    pub registries: Vec<RegistryEntrySettings>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            unqualified_search_registries: RegistriesConf::default().unqualified_search_registries,
            registries: Vec::new(),
        }
    }
}

impl RegistrySettings {
    /// Parse settings from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid settings JSON.
    pub fn from_json(data: &str) -> Result<Self, SystemConfigError> {
        Ok(serde_json::from_str(data)?)
    }

    /// Hosts of registries flagged insecure.
    #[must_use]
    pub fn insecure_registries(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .registries
            .iter()
            .filter(|r| r.insecure == Some(true))
            .map(|r| r.host().to_string())
            .collect();
        hosts.dedup();
        hosts
    }

    /// The most specific entry covering a normalized image name.
    #[must_use]
    pub fn entry_for(&self, image: &str) -> Option<&RegistryEntrySettings> {
        self.registries
            .iter()
            .filter(|r| r.matches(image))
            .max_by_key(|r| r.location.len())
    }

    /// Whether the signature policy would accept pulls of the image.
    ///
    /// Blocked registries are refused. Once any registry is allowed, only
    /// allowed registries are accepted.
    #[must_use]
    pub fn permits(&self, image: &str) -> bool {
        let entry = self.entry_for(image);
        if entry.is_some_and(|e| e.blocked == Some(true)) {
            return false;
        }
        let allow_list = self.registries.iter().any(|r| r.allowed == Some(true));
        !allow_list || entry.is_some_and(|e| e.allowed == Some(true))
    }
}

/// Where the generated artifacts are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemConfigPaths {
    /// `registries.conf` file.
    pub registries_conf: PathBuf,
    /// `policy.json` file.
    pub policy_conf: PathBuf,
    /// Directory holding one folder per registry with a `ca.crt`.
    pub certs_dir: PathBuf,
}

impl SystemConfigPaths {
    /// Standard layout under a base directory.
    #[must_use]
    pub fn under(base: &Path) -> Self {
        Self {
            registries_conf: base.join("containers").join("registries.conf"),
            policy_conf: base.join("containers").join("policy.json"),
            certs_dir: base.join("docker").join("certs.d"),
        }
    }
}

impl Default for SystemConfigPaths {
    fn default() -> Self {
        Self::under(Path::new("/tmp"))
    }
}

/// The three rendered artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemConfig {
    /// `registries.conf` contents.
    pub registries: RegistriesConf,
    /// `policy.json` contents.
    pub policy: PolicyConf,
    /// CA certificates to write.
    pub certs: Vec<RegistryCert>,
}

impl SystemConfig {
    /// Render settings into artifacts.
    ///
    /// Blocked registries get a reject rule. When any registry is allowed,
    /// the default policy becomes reject and only allowed registries are
    /// accepted. Registries without settings are pruned.
    #[must_use]
    pub fn from_settings(settings: &RegistrySettings) -> Self {
        let mut registries = RegistriesConf {
            unqualified_search_registries: settings.unqualified_search_registries.clone(),
            ..RegistriesConf::default()
        };
        let mut policy = PolicyConf::default();
        let mut certs = Vec::new();

        let allow_list = settings.registries.iter().any(|r| r.allowed == Some(true));
        if allow_list {
            policy.set_default_reject();
        }

        for entry in &settings.registries {
            let conf = registries.get_or_create(&entry.location);
            conf.insecure = entry.insecure;
            conf.allowed = entry.allowed;
            conf.blocked = entry.blocked;
            if !entry.mirrors.is_empty() {
                conf.set_mirrors(&entry.mirrors);
            }

            if entry.blocked == Some(true) {
                policy.set_reject_for_registry(&entry.location);
            } else if allow_list && entry.allowed == Some(true) {
                policy.set_accept_for_registry(&entry.location);
            }

            if let Some(pem) = &entry.ca_certificate {
                certs.push(RegistryCert::new(entry.location.clone(), pem.clone()));
            }
        }
        registries.prune_empty();

        Self {
            registries,
            policy,
            certs,
        }
    }

    /// Write every artifact.
    ///
    /// # Errors
    ///
    /// Returns the first encoding or filesystem error.
    pub fn write_all(&self, paths: &SystemConfigPaths) -> Result<(), SystemConfigError> {
        self.registries.write_to(&paths.registries_conf)?;
        self.policy.write_to(&paths.policy_conf)?;
        for cert in &self.certs {
            let path = cert.write_to(&paths.certs_dir)?;
            debug!(registry = %cert.registry, path = %path.display(), "Wrote registry certificate");
        }

        info!(
            registries = self.registries.registries.len(),
            certificates = self.certs.len(),
            registries_conf = %paths.registries_conf.display(),
            "Registry system configuration written"
        );
        Ok(())
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), SystemConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RegistrySettings {
        RegistrySettings::from_json(
            r#"{
                "registries": [
                    {"location": "registry.local:5000", "insecure": true},
                    {"location": "blocked.example.com", "blocked": true},
                    {"location": "docker.io", "mirrors": ["mirror.example.com"]},
                    {"location": "secure.example.com", "caCertificate": "PEM"},
                    {"location": "nothing.example.com"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn parses_settings_with_defaults() {
        let settings = settings();
        assert_eq!(
            settings.unqualified_search_registries,
            DEFAULT_UNQUALIFIED_SEARCH_REGISTRIES.to_vec()
        );
        assert_eq!(settings.registries.len(), 5);
        assert_eq!(settings.insecure_registries(), vec!["registry.local:5000"]);
    }

    #[test]
    fn entry_for_prefers_the_most_specific_location() {
        let settings = RegistrySettings {
            registries: vec![
                RegistryEntrySettings {
                    location: "quay.io".to_string(),
                    ..Default::default()
                },
                RegistryEntrySettings {
                    location: "quay.io/org/app".to_string(),
                    blocked: Some(true),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let entry = settings.entry_for("quay.io/org/app:v1").unwrap();
        assert_eq!(entry.location, "quay.io/org/app");
        assert_eq!(settings.entry_for("quay.io/org/other:v1").unwrap().location, "quay.io");
        assert!(settings.entry_for("quay.io.evil.com/org/app:v1").is_none());
        assert!(settings.entry_for("docker.io/library/nginx:latest").is_none());
    }

    #[test]
    fn host_locations_do_not_match_other_ports() {
        let entry = RegistryEntrySettings {
            location: "registry.local".to_string(),
            ..Default::default()
        };
        assert!(entry.matches("registry.local/app:v1"));
        assert!(!entry.matches("registry.local:5000/app:v1"));
    }

    #[test]
    fn mirrored_images_keep_the_repository_path() {
        let entry = RegistryEntrySettings {
            location: "docker.io".to_string(),
            mirrors: vec!["mirror.local:5000/hub/".to_string(), "backup.local".to_string()],
            ..Default::default()
        };
        assert_eq!(
            entry.mirrored_images("docker.io/library/nginx:latest"),
            vec![
                "mirror.local:5000/hub/library/nginx:latest",
                "backup.local/library/nginx:latest"
            ]
        );
        assert!(entry.mirrored_images("quay.io/org/app:v1").is_empty());
    }

    #[test]
    fn permits_follows_blocked_and_allowed_flags() {
        let settings = settings();
        assert!(!settings.permits("blocked.example.com/app:v1"));
        assert!(settings.permits("docker.io/library/nginx:latest"));
        assert!(settings.permits("unlisted.example.com/app:v1"));

        let allow_list = RegistrySettings {
            registries: vec![RegistryEntrySettings {
                location: "quay.io".to_string(),
                allowed: Some(true),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(allow_list.permits("quay.io/org/app:v1"));
        assert!(!allow_list.permits("docker.io/library/nginx:latest"));
    }

    #[test]
    fn renders_artifacts() {
        let config = SystemConfig::from_settings(&settings());

        let locations: Vec<_> = config
            .registries
            .registries
            .iter()
            .map(|r| r.location.as_str())
            .collect();
        assert_eq!(
            locations,
            vec!["registry.local:5000", "blocked.example.com", "docker.io"]
        );

        assert_eq!(
            config.policy.transports["docker"]["blocked.example.com"],
            vec![PolicyEntry::reject()]
        );
        assert_eq!(config.policy.default, vec![PolicyEntry::insecure_accept_anything()]);
        assert_eq!(config.certs, vec![RegistryCert::new("secure.example.com", "PEM")]);
    }

    #[test]
    fn allowed_registries_switch_default_to_reject() {
        let settings = RegistrySettings {
            registries: vec![RegistryEntrySettings {
                location: "quay.io".to_string(),
                allowed: Some(true),
                ..Default::default()
            }],
            ..Default::default()
        };
        let config = SystemConfig::from_settings(&settings);

        assert_eq!(config.policy.default, vec![PolicyEntry::reject()]);
        assert_eq!(
            config.policy.transports["atomic"]["quay.io"],
            vec![PolicyEntry::insecure_accept_anything()]
        );
    }

    #[test]
    fn write_all_creates_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SystemConfigPaths::under(dir.path());

        SystemConfig::from_settings(&settings()).write_all(&paths).unwrap();

        let registries = fs::read_to_string(&paths.registries_conf).unwrap();
        assert!(registries.contains("registry.local:5000"));
        assert!(registries.contains("mirror.example.com"));

        let policy: PolicyConf =
            serde_json::from_str(&fs::read_to_string(&paths.policy_conf).unwrap()).unwrap();
        assert_eq!(
            policy.transports["docker"]["blocked.example.com"],
            vec![PolicyEntry::reject()]
        );

        let cert = paths.certs_dir.join("secure.example.com").join(CA_FILE_NAME);
        assert_eq!(fs::read_to_string(cert).unwrap(), "PEM");
    }

    #[test]
    fn default_paths_live_under_tmp() {
        let paths = SystemConfigPaths::default();
        assert_eq!(paths.registries_conf, Path::new("/tmp/containers/registries.conf"));
        assert_eq!(paths.policy_conf, Path::new("/tmp/containers/policy.json"));
        assert_eq!(paths.certs_dir, Path::new("/tmp/docker/certs.d"));
    }
}
