//! Core types and utilities for archgate.
//!
//! This crate provides the foundational types used throughout the archgate
//! pod-placement pipeline:
//!
//! - **Architecture sets**: unordered collections of CPU architecture identifiers
//!   with deterministic, sorted serialization
//! - **Image references**: normalized container image names paired with a
//!   cache-bypass flag derived from the container's pull policy
//! - **Well-known names**: the scheduling gate, bookkeeping labels and node
//!   label keys shared by the webhook and the placement engine
//!
//! # Example
//!
//! ```
//! use archgate_core::{ArchitectureSet, ContainerImageRef};
//!
//! let image = ContainerImageRef::new("nginx", Some("Always")).unwrap();
//! assert_eq!(image.name(), "docker.io/library/nginx:latest");
//! assert!(image.skip_cache());
//!
//! let multi: ArchitectureSet = ["arm64", "amd64"].into_iter().collect();
//! let single: ArchitectureSet = ["amd64"].into_iter().collect();
//! assert_eq!(multi.intersection(&single).to_vec(), vec!["amd64".to_string()]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod arch;
pub mod error;
pub mod image;
pub mod names;

pub use arch::ArchitectureSet;
pub use error::{CoreError, Result};
pub use image::{normalize_image_name, ContainerImageRef, PULL_POLICY_ALWAYS};
