//! Architecture-aware pod placement for archgate.
//!
//! This crate turns a pod's container images into a node affinity
//! constraint. It provides:
//!
//! - [`PodView`]: an owned pod with the gate, selector and ignore queries
//! - Intersection: the architectures every image of the pod supports,
//!   rendered as a node selector requirement
//! - Affinity merging: the requirement is added to, or replaces its
//!   counterpart in, every required node selector term
//! - Label bookkeeping: presence labels mirroring the outcome
//! - [`set_node_affinity_arch_requirement`]: the primitive a reconciler
//!   calls for each gated pod
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              set_node_affinity_arch_requirement             │
//! └─────────────────────────────────────────────────────────────┘
//!          │                   │                     │
//!          ▼                   ▼                     ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────────┐
//! │  Intersection   │ │ Affinity merger │ │  Label bookkeeper   │
//! │  (per image)    │ │ (every term)    │ │  (outcome labels)   │
//! └─────────────────┘ └─────────────────┘ └─────────────────────┘
//!          │
//!          ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │          ArchitectureResolver (cache + single-flight)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use archgate_placement::{set_node_affinity_arch_requirement, PodView};
//! use archgate_registry::{CachingResolver, OciImageInspector, PullCredentials, ResolverConfig, RegistrySettings};
//! use k8s_openapi::api::core::v1::Pod;
//!
//! # async fn example(pod: Pod) -> Result<(), Box<dyn std::error::Error>> {
//! let inspector = Arc::new(OciImageInspector::new(&RegistrySettings::default())?);
//! let resolver = CachingResolver::new(inspector, ResolverConfig::default());
//!
//! let mut view = PodView::new(pod);
//! if set_node_affinity_arch_requirement(&mut view, &resolver, &PullCredentials::anonymous()).await? {
//!     view.remove_scheduling_gate();
//! }
//! let pod = view.into_pod();
//! # Ok(())
//! # }
//! ```
//!
//! # Testing
//!
//! The `test-utils` feature exposes [`testing::PodBuilder`] and a resolver
//! over a mock registry with a handful of fixture images.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod affinity;
pub mod error;
pub mod ignore;
pub mod intersect;
pub mod labels;
pub mod placement;
pub mod pod;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::{PlacementError, Result};
pub use ignore::{IgnorePolicy, DEFAULT_IGNORED_NAMESPACE_PREFIXES};
pub use intersect::{
    architecture_predicate, architecture_predicate_for, intersect_images_architecture,
    OPERATOR_EXISTS, OPERATOR_IN,
};
pub use placement::set_node_affinity_arch_requirement;
pub use pod::PodView;
