//! Which pods the placement pipeline leaves alone.

/// Namespaces reserved for cluster infrastructure.
pub const DEFAULT_IGNORED_NAMESPACE_PREFIXES: [&str; 2] = ["kube-", "hypershift-"];

/// Namespace rules for ignoring pods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnorePolicy {
    /// The namespace the operator itself runs in.
    pub operator_namespace: String,
    /// Namespace prefixes reserved for infrastructure.
    pub ignored_namespace_prefixes: Vec<String>,
}

impl IgnorePolicy {
    /// A policy with the default infrastructure prefixes.
    #[must_use]
    pub fn new(operator_namespace: impl Into<String>) -> Self {
        Self {
            operator_namespace: operator_namespace.into(),
            ignored_namespace_prefixes: DEFAULT_IGNORED_NAMESPACE_PREFIXES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Whether pods in `namespace` are ignored.
    #[must_use]
    pub fn ignores_namespace(&self, namespace: &str) -> bool {
        namespace == self.operator_namespace
            || self
                .ignored_namespace_prefixes
                .iter()
                .any(|prefix| namespace.starts_with(prefix.as_str()))
    }
}
