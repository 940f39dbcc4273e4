//! Architecture sets.
//!
//! An [`ArchitectureSet`] is the unit of exchange between the image resolver
//! and the intersection engine. Backed by a `BTreeSet`, so iteration and
//! serialization are always alphabetically sorted regardless of the order in
//! which a registry reported its platforms.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The `amd64` architecture identifier.
pub const ARCH_AMD64: &str = "amd64";
/// The `arm64` architecture identifier.
pub const ARCH_ARM64: &str = "arm64";
/// The `ppc64le` architecture identifier.
pub const ARCH_PPC64LE: &str = "ppc64le";
/// The `s390x` architecture identifier.
pub const ARCH_S390X: &str = "s390x";

/// An unordered collection of architecture identifiers (e.g. `amd64`, `arm64`).
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchitectureSet(BTreeSet<String>);

impl ArchitectureSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an architecture. Returns `true` if it was not already present.
    pub fn insert(&mut self, arch: impl Into<String>) -> bool {
        self.0.insert(arch.into())
    }

    /// Check whether the set contains an architecture.
    #[must_use]
    pub fn contains(&self, arch: &str) -> bool {
        self.0.contains(arch)
    }

    /// Number of architectures in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Architectures common to both sets.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        Self(self.0.intersection(&other.0).cloned().collect())
    }

    /// Iterate over the architectures in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// The architectures as an alphabetically sorted vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for ArchitectureSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl IntoIterator for ArchitectureSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Debug for ArchitectureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

impl fmt::Display for ArchitectureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "{}", joined.join(","))
    }
}
