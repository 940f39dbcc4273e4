//! Per-registry CA certificates.

use std::path::{Component, Path, PathBuf};

use crate::error::SystemConfigError;

/// File name of a registry's CA bundle inside its folder.
pub const CA_FILE_NAME: &str = "ca.crt";

/// A registry and the PEM CA certificate used to verify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCert {
    /// Registry name. A port may be written after `..`, e.g. `registry.example.com..5000`.
    pub registry: String,
    /// PEM-encoded certificate.
    pub certificate: String,
}

impl RegistryCert {
    /// Create a certificate entry.
    #[must_use]
    pub fn new(registry: impl Into<String>, certificate: impl Into<String>) -> Self {
        Self {
            registry: registry.into(),
            certificate: certificate.into(),
        }
    }

    /// Folder name for this registry: the first `..` becomes `:`.
    ///
    /// # Errors
    ///
    /// Returns [`SystemConfigError::InvalidRegistryLocation`] unless the name
    /// is a single plain path component.
    pub fn folder_name(&self) -> Result<String, SystemConfigError> {
        let folder = self.registry.replacen("..", ":", 1);
        let mut components = Path::new(&folder).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !folder.contains(['/', '\\']) => Ok(folder),
            _ => Err(SystemConfigError::InvalidRegistryLocation(
                self.registry.clone(),
            )),
        }
    }

    /// Write `<certs_dir>/<folder>/ca.crt`, returning the file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be created or the file written.
    pub fn write_to(&self, certs_dir: &Path) -> Result<PathBuf, SystemConfigError> {
        let path = certs_dir.join(self.folder_name()?).join(CA_FILE_NAME);
        super::write_file(&path, self.certificate.as_bytes())?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_name_rewrites_port_separator() {
        assert_eq!(
            RegistryCert::new("registry.example.com..5000", "")
                .folder_name()
                .unwrap(),
            "registry.example.com:5000"
        );
        assert_eq!(RegistryCert::new("quay.io", "").folder_name().unwrap(), "quay.io");
        assert_eq!(RegistryCert::new("a..1..2", "").folder_name().unwrap(), "a:1..2");
    }

    #[test]
    fn folder_name_rejects_path_components() {
        for location in ["", ".", "../../x", "quay.io/org", "/etc", "a\\b"] {
            assert!(
                matches!(
                    RegistryCert::new(location, "").folder_name(),
                    Err(SystemConfigError::InvalidRegistryLocation(_))
                ),
                "expected {location:?} to be rejected"
            );
        }
    }

    #[test]
    fn escaping_location_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let certs_dir = dir.path().join("certs.d");
        let cert = RegistryCert::new("../../escape", "PEM");

        assert!(cert.write_to(&certs_dir).is_err());
        assert!(!dir.path().join("escape").exists());
        assert!(!certs_dir.exists());
    }

    #[test]
    fn writes_ca_file() {
        let dir = tempfile::tempdir().unwrap();
        let cert = RegistryCert::new("registry.local..5000", "-----BEGIN CERTIFICATE-----\n");

        let path = cert.write_to(dir.path()).unwrap();

        assert_eq!(path, dir.path().join("registry.local:5000").join("ca.crt"));
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "-----BEGIN CERTIFICATE-----\n"
        );
    }
}
