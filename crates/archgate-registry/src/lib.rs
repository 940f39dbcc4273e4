//! Image architecture resolution for archgate.
//!
//! This crate answers one question: which CPU architectures does a container
//! image support? It provides:
//!
//! - [`ImageInspector`]: the remote manifest transport (backed by
//!   `oci-distribution` in [`OciImageInspector`])
//! - [`ArchitectureCache`]: a process-lifetime cache keyed by normalized image name
//! - [`CachingResolver`]: the injectable facade that combines both and collapses
//!   concurrent lookups of the same image into a single remote fetch
//! - [`PullCredentials`]: registry credentials parsed from pod pull secrets
//! - [`system_config`]: generation of the registries/policy/certificate
//!   artifacts consumed by container tooling
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────────┐
//! │ Placement engine │────▶│ ArchitectureResolver │
//! │ (per pod)        │     │ (trait)              │
//! └──────────────────┘     └──────────┬───────────┘
//!                                     │
//!                          ┌──────────▼───────────┐
//!                          │   CachingResolver    │
//!                          │ cache + single-flight│
//!                          └──────────┬───────────┘
//!                                     │ miss / Always pull
//!                          ┌──────────▼───────────┐
//!                          │  OciImageInspector   │
//!                          └──────────┬───────────┘
//!                                     │ HTTPS
//!                          ┌──────────▼───────────┐
//!                          │  Container registry  │
//!                          └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use archgate_core::ContainerImageRef;
//! use archgate_registry::{
//!     ArchitectureResolver, CachingResolver, OciImageInspector, PullCredentials,
//!     ResolverConfig, RegistrySettings,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let inspector = Arc::new(OciImageInspector::new(&RegistrySettings::default())?);
//! let resolver = CachingResolver::new(inspector, ResolverConfig::default());
//!
//! let image = ContainerImageRef::new("nginx:1.27", None)?;
//! let archs = resolver.resolve(&image, &PullCredentials::anonymous()).await?;
//! println!("nginx supports {archs}");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod credentials;
pub mod error;
pub mod inspector;
pub mod resolver;
pub mod system_config;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use cache::{ArchitectureCache, CacheEntry};
pub use credentials::{PullCredentials, RegistryCredentials};
pub use error::{ResolveError, Result, SystemConfigError};
pub use inspector::{ImageInspector, OciImageInspector};
pub use resolver::{ArchitectureResolver, CachingResolver, ResolverConfig};
pub use system_config::{RegistryEntrySettings, RegistrySettings, SystemConfig, SystemConfigPaths};

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockImageInspector;
