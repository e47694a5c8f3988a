//! Backing object store abstraction.
//!
//! The secrets manager persists every record through the [`ObjectStore`]
//! trait: a namespaced key-value store of opaque byte-map records,
//! addressable by name, queryable by label selector, with
//! optimistic-concurrency updates and an immutability flag. The manager
//! never retries store failures itself; conflicts surface as retryable
//! [`StoreError`]s for the caller's reconciliation loop.

pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::ManagedSecret;

pub use memory::MemoryStore;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by backing store implementations.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// A record with the same name already exists.
    #[error("record '{name}' already exists")]
    AlreadyExists { name: String },

    /// Optimistic-concurrency update lost the race.
    #[error("conflict updating '{name}': version {given} does not match {actual}")]
    Conflict { name: String, given: u64, actual: u64 },

    /// Data mutation attempted on an immutable record.
    #[error("record '{name}' is immutable")]
    Immutable { name: String },

    /// The record addressed by an update does not exist.
    #[error("record '{name}' not found")]
    NotFound { name: String },

    /// Transport or I/O failure.
    #[error("store I/O failure: {message}")]
    Io { message: String },
}

impl StoreError {
    /// Whether a caller-side retry of the enclosing operation makes sense.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict { .. } | StoreError::Io { .. })
    }
}

/// Equality-based label selector for [`ObjectStore::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: BTreeMap<String, String>,
}

impl LabelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality requirement.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements.insert(key.into(), value.into());
        self
    }

    /// Check whether a label set satisfies every requirement.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|(k, v)| labels.get(k) == Some(v))
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

/// Trait for backing stores.
///
/// Implementations must be Send + Sync for use in async contexts.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Fetch a record by name, `None` when absent.
    async fn get(&self, namespace: &str, name: &str) -> StoreResult<Option<ManagedSecret>>;

    /// List the records in a namespace matching a label selector.
    async fn list(&self, namespace: &str, selector: &LabelSelector)
        -> StoreResult<Vec<ManagedSecret>>;

    /// Create a record. Fails with [`StoreError::AlreadyExists`] when the
    /// name is taken. Returns the record with its initial version token.
    async fn create(&self, record: ManagedSecret) -> StoreResult<ManagedSecret>;

    /// Conditional update keyed on the record's version token. A stale
    /// token fails with [`StoreError::Conflict`]; a data change on an
    /// immutable record fails with [`StoreError::Immutable`].
    async fn update(&self, record: ManagedSecret) -> StoreResult<ManagedSecret>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_matches() {
        let selector = LabelSelector::new().with("managed-by", "secrets-manager").with("name", "ca");

        let mut labels = BTreeMap::new();
        labels.insert("managed-by".to_string(), "secrets-manager".to_string());
        labels.insert("name".to_string(), "ca".to_string());
        labels.insert("checksum".to_string(), "abc12345".to_string());
        assert!(selector.matches(&labels));

        labels.insert("name".to_string(), "other".to_string());
        assert!(!selector.matches(&labels));
    }

    #[test]
    fn test_store_error_retryability() {
        assert!(StoreError::Conflict { name: "x".into(), given: 1, actual: 2 }.is_retryable());
        assert!(StoreError::Io { message: "timeout".into() }.is_retryable());
        assert!(!StoreError::AlreadyExists { name: "x".into() }.is_retryable());
        assert!(!StoreError::Immutable { name: "x".into() }.is_retryable());
    }
}
