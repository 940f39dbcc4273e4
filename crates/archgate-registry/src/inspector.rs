//! Remote image inspection.
//!
//! The [`ImageInspector`] trait is the seam between the resolver and the
//! network. [`OciImageInspector`] talks to registries through
//! `oci-distribution`: a manifest list (image index) yields every listed
//! platform's architecture, while a single-platform manifest yields the
//! architecture recorded in its config blob.
//!
//! Registry settings shape every lookup: blocked (or, under an allow list,
//! unlisted) registries are refused before any request, mirrors are tried in
//! order before the origin, insecure registries are reached over plain HTTP,
//! and a registry's CA certificate is trusted only for that registry.

use std::collections::HashMap;

use async_trait::async_trait;
use oci_distribution::client::{
    Certificate, CertificateEncoding, ClientConfig, ClientProtocol,
};
use oci_distribution::errors::{OciDistributionError, OciEnvelope, OciErrorCode};
use oci_distribution::manifest::OciManifest;
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::{Client, Reference};
use serde::Deserialize;
use tracing::debug;

use archgate_core::ArchitectureSet;

use crate::credentials::PullCredentials;
use crate::error::{ResolveError, Result, SystemConfigError};
use crate::system_config::RegistrySettings;

/// Placeholder architecture some tools write for attestation manifests.
const UNKNOWN_ARCH: &str = "unknown";

/// Fetches the set of architectures an image supports from its registry.
#[async_trait]
pub trait ImageInspector: Send + Sync {
    /// Inspect a normalized image name.
    ///
    /// On success the returned set is never empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be found, the registry rejects the
    /// credentials, the manifest cannot be parsed or the transport fails.
    async fn inspect(&self, image: &str, credentials: &PullCredentials)
        -> Result<ArchitectureSet>;
}

/// Registry-backed inspector using the OCI distribution protocol.
pub struct OciImageInspector {
    settings: RegistrySettings,
    default_client: Client,
    /// Clients trusting a registry's own CA certificates, keyed by host.
    scoped_clients: HashMap<String, Client>,
}

#[derive(Debug, Deserialize)]
struct ImageConfig {
    #[serde(default)]
    architecture: Option<String>,
}

impl OciImageInspector {
    /// Build an inspector honoring the registry settings.
    ///
    /// # Errors
    ///
    /// Returns [`SystemConfigError::Client`] if a registry's CA certificate
    /// is rejected. No client silently falls back to default settings.
    pub fn new(settings: &RegistrySettings) -> std::result::Result<Self, SystemConfigError> {
        let insecure = settings.insecure_registries();
        let protocol = if insecure.is_empty() {
            ClientProtocol::Https
        } else {
            ClientProtocol::HttpsExcept(insecure)
        };

        let mut certificates: HashMap<&str, Vec<Certificate>> = HashMap::new();
        for entry in &settings.registries {
            if let Some(pem) = &entry.ca_certificate {
                certificates.entry(entry.host()).or_default().push(Certificate {
                    encoding: CertificateEncoding::Pem,
                    data: pem.as_bytes().to_vec(),
                });
            }
        }

        let default_client = build_client("default", &protocol, Vec::new())?;
        let mut scoped_clients = HashMap::new();
        for (host, certs) in certificates {
            scoped_clients.insert(host.to_string(), build_client(host, &protocol, certs)?);
        }

        Ok(Self {
            settings: settings.clone(),
            default_client,
            scoped_clients,
        })
    }

    fn client_for(&self, registry: &str) -> &Client {
        self.scoped_clients
            .get(registry)
            .unwrap_or(&self.default_client)
    }

    /// Locations to try for an image: its mirrors in order, then the origin.
    fn sources(&self, image: &str) -> Vec<String> {
        let mut sources = self
            .settings
            .entry_for(image)
            .map(|entry| entry.mirrored_images(image))
            .unwrap_or_default();
        sources.push(image.to_string());
        sources
    }

    fn auth_for(reference: &Reference, credentials: &PullCredentials) -> RegistryAuth {
        credentials
            .for_registry(reference.registry())
            .map_or(RegistryAuth::Anonymous, |c| {
                RegistryAuth::Basic(c.username.clone(), c.password.clone())
            })
    }

    async fn inspect_at(&self, image: &str, credentials: &PullCredentials) -> Result<ArchitectureSet> {
        let reference: Reference = image
            .parse()
            .map_err(|e| ResolveError::InvalidReference(format!("{image}: {e}")))?;
        let auth = Self::auth_for(&reference, credentials);
        let client = self.client_for(reference.registry());

        debug!(image, registry = reference.registry(), "Fetching image manifest");

        let (manifest, digest) = client
            .pull_manifest(&reference, &auth)
            .await
            .map_err(|e| classify_error(&reference, e))?;

        let architectures = match manifest {
            OciManifest::ImageIndex(index) => index
                .manifests
                .iter()
                .filter_map(|entry| entry.platform.as_ref())
                .map(|platform| platform.architecture.as_str())
                .filter(|arch| is_known_architecture(arch))
                .collect(),
            OciManifest::Image(_) => config_architecture(client, &reference, &auth).await?,
        };

        if architectures.is_empty() {
            return Err(ResolveError::ManifestParse(format!(
                "{image}: no architecture found in manifest {digest}"
            )));
        }

        debug!(image, %digest, architectures = %architectures, "Inspected image");
        Ok(architectures)
    }
}

#[async_trait]
impl ImageInspector for OciImageInspector {
    async fn inspect(
        &self,
        image: &str,
        credentials: &PullCredentials,
    ) -> Result<ArchitectureSet> {
        if !self.settings.permits(image) {
            return Err(ResolveError::Blocked(image.to_string()));
        }

        let mut sources = self.sources(image);
        let origin = sources.pop().unwrap_or_else(|| image.to_string());
        for mirror in &sources {
            match self.inspect_at(mirror, credentials).await {
                Ok(architectures) => return Ok(architectures),
                Err(e) => debug!(image, mirror, error = %e, "Mirror lookup failed"),
            }
        }
        self.inspect_at(&origin, credentials).await
    }
}

fn build_client(
    registry: &str,
    protocol: &ClientProtocol,
    extra_root_certificates: Vec<Certificate>,
) -> std::result::Result<Client, SystemConfigError> {
    let config = ClientConfig {
        protocol: protocol.clone(),
        extra_root_certificates,
        ..Default::default()
    };
    Client::try_from(config).map_err(|e| SystemConfigError::Client {
        registry: registry.to_string(),
        message: e.to_string(),
    })
}

async fn config_architecture(
    client: &Client,
    reference: &Reference,
    auth: &RegistryAuth,
) -> Result<ArchitectureSet> {
    let (_manifest, _digest, config) = client
        .pull_manifest_and_config(reference, auth)
        .await
        .map_err(|e| classify_error(reference, e))?;

    let config: ImageConfig = serde_json::from_str(&config)
        .map_err(|e| ResolveError::ManifestParse(format!("{reference}: config: {e}")))?;

    Ok(config
        .architecture
        .filter(|a| is_known_architecture(a))
        .into_iter()
        .collect())
}

fn is_known_architecture(arch: &str) -> bool {
    !arch.is_empty() && arch != UNKNOWN_ARCH
}

fn classify_error(reference: &Reference, err: OciDistributionError) -> ResolveError {
    let context = format!("{reference}: {err}");
    match err {
        OciDistributionError::ImageManifestNotFoundError(_)
        | OciDistributionError::ServerError { code: 404, .. } => ResolveError::NotFound(context),
        OciDistributionError::AuthenticationFailure(_)
        | OciDistributionError::UnauthorizedError { .. }
        | OciDistributionError::ServerError {
            code: 401 | 403, ..
        } => ResolveError::Unauthorized(context),
        OciDistributionError::ManifestParsingError(_)
        | OciDistributionError::VersionedParsingError(_)
        | OciDistributionError::UnsupportedSchemaVersionError(_) => {
            ResolveError::ManifestParse(context)
        }
        OciDistributionError::RegistryError { envelope, .. } => classify_envelope(&envelope, context),
        _ => ResolveError::Transport(context),
    }
}

/// Map registry error codes; auth codes win over lookup codes.
fn classify_envelope(envelope: &OciEnvelope, context: String) -> ResolveError {
    let has = |wanted: &[OciErrorCode]| envelope.errors.iter().any(|e| wanted.contains(&e.code));

    if has(&[OciErrorCode::Unauthorized, OciErrorCode::Denied]) {
        ResolveError::Unauthorized(context)
    } else if has(&[
        OciErrorCode::ManifestUnknown,
        OciErrorCode::NameUnknown,
        OciErrorCode::BlobUnknown,
        OciErrorCode::ManifestBlobUnknown,
    ]) {
        ResolveError::NotFound(context)
    } else if has(&[OciErrorCode::ManifestInvalid]) {
        ResolveError::ManifestParse(context)
    } else {
        ResolveError::Transport(context)
    }
}
