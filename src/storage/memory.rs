//! In-memory [`ObjectStore`].
//!
//! Hermetic store used by the integration tests and by embedders without a
//! real backing service. Semantics match the trait contract: version tokens
//! for optimistic concurrency, immutable records reject data changes, and
//! listings are name-sorted for determinism.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::ManagedSecret;

use super::{LabelSelector, ObjectStore, StoreError, StoreResult};

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(String, String), ManagedSecret>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a namespace, for test assertions.
    pub async fn len(&self, namespace: &str) -> usize {
        self.records.read().await.keys().filter(|(ns, _)| ns == namespace).count()
    }

    pub async fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace).await == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, namespace: &str, name: &str) -> StoreResult<Option<ManagedSecret>> {
        let records = self.records.read().await;
        Ok(records.get(&(namespace.to_string(), name.to_string())).cloned())
    }

    async fn list(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> StoreResult<Vec<ManagedSecret>> {
        let records = self.records.read().await;
        let mut matches: Vec<ManagedSecret> = records
            .iter()
            .filter(|((ns, _), record)| ns == namespace && selector.matches(&record.labels))
            .map(|(_, record)| record.clone())
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matches)
    }

    async fn create(&self, mut record: ManagedSecret) -> StoreResult<ManagedSecret> {
        let mut records = self.records.write().await;
        let key = (record.namespace.clone(), record.name.clone());
        if records.contains_key(&key) {
            return Err(StoreError::AlreadyExists { name: record.name });
        }
        record.version = 1;
        records.insert(key, record.clone());
        Ok(record)
    }

    async fn update(&self, mut record: ManagedSecret) -> StoreResult<ManagedSecret> {
        let mut records = self.records.write().await;
        let key = (record.namespace.clone(), record.name.clone());
        let existing = records
            .get(&key)
            .ok_or_else(|| StoreError::NotFound { name: record.name.clone() })?;

        if existing.version != record.version {
            return Err(StoreError::Conflict {
                name: record.name,
                given: record.version,
                actual: existing.version,
            });
        }
        if existing.immutable && existing.data != record.data {
            return Err(StoreError::Immutable { name: record.name });
        }

        record.version += 1;
        records.insert(key, record.clone());
        Ok(record)
    }
}
