//! In-memory index over the manager's records.
//!
//! Rebuilt in full at manager construction by listing every record carrying
//! the manager-identity labels; this load is the only place history is
//! reconstructed, so a restarted process converges to the same view as its
//! predecessor purely from backing-store contents.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use dashmap::DashMap;

use crate::domain::{label, ManagedSecret, MANAGED_BY_VALUE};
use crate::errors::{Result, TrustplaneError};
use crate::storage::{LabelSelector, ObjectStore};

/// The records tracked for one logical name.
#[derive(Debug, Clone)]
pub struct SecretSet {
    pub current: ManagedSecret,
    /// Populated only after a `KeepOld` rotation that was not suppressed.
    pub old: Option<ManagedSecret>,
    /// Populated only for CA-kind logical names.
    pub bundle: Option<ManagedSecret>,
}

/// Raw index slot. `current` may be empty right after a rotation signal
/// changed: the superseded record classifies as `old` on load and the new
/// generation does not exist until the next generate call.
#[derive(Debug, Clone, Default)]
pub(crate) struct IndexEntry {
    pub current: Option<ManagedSecret>,
    pub old: Option<ManagedSecret>,
    pub bundle: Option<ManagedSecret>,
}

/// Concurrent map from logical name to [`IndexEntry`]. Entry access is
/// serialized per logical name; distinct names proceed in parallel.
#[derive(Debug, Default)]
pub(crate) struct StoreIndex {
    entries: DashMap<String, IndexEntry>,
}

impl StoreIndex {
    /// Rebuild the index from the backing store.
    ///
    /// Classification: bundles carry `bundle-for`; a primary whose
    /// `last-rotation-initiation-time` label equals the manager's configured
    /// value for its logical name is `current`, anything else is `old`.
    /// Slot ties resolve to the larger `issued-at-time`.
    pub(crate) async fn load(
        store: &dyn ObjectStore,
        namespace: &str,
        identity: &str,
        rotation_labels: &HashMap<String, String>,
    ) -> Result<Self> {
        let selector = LabelSelector::new()
            .with(label::MANAGED_BY, MANAGED_BY_VALUE)
            .with(label::MANAGER_IDENTITY, identity);
        let records = store
            .list(namespace, &selector)
            .await
            .map_err(|e| TrustplaneError::store(e, "list managed secrets"))?;

        let mut currents: HashMap<String, ManagedSecret> = HashMap::new();
        let mut olds: HashMap<String, ManagedSecret> = HashMap::new();
        let mut bundles: HashMap<String, ManagedSecret> = HashMap::new();

        for record in records {
            if let Some(logical) = record.label(label::BUNDLE_FOR).map(str::to_string) {
                keep_newer(&mut bundles, &logical, record);
                continue;
            }
            let Some(logical) = record.logical_name().map(str::to_string) else {
                continue;
            };
            let expected =
                rotation_labels.get(&logical).map(String::as_str).unwrap_or_default();
            let actual = record.label(label::LAST_ROTATION_INITIATION_TIME).unwrap_or_default();

            if actual == expected {
                if let Some(displaced) = keep_newer(&mut currents, &logical, record) {
                    keep_newer(&mut olds, &logical, displaced);
                }
            } else {
                keep_newer(&mut olds, &logical, record);
            }
        }

        let index = Self::default();
        for (logical, current) in currents {
            index.entries.insert(
                logical.clone(),
                IndexEntry {
                    current: Some(current),
                    old: olds.remove(&logical),
                    bundle: bundles.remove(&logical),
                },
            );
        }
        // Superseded generations whose successor has not been minted yet.
        for (logical, old) in olds {
            index.entries.insert(
                logical.clone(),
                IndexEntry { current: None, old: Some(old), bundle: bundles.remove(&logical) },
            );
        }
        Ok(index)
    }

    /// Complete view for a logical name, only when a current exists.
    pub(crate) fn lookup(&self, logical_name: &str) -> Option<SecretSet> {
        let entry = self.entries.get(logical_name)?;
        let current = entry.current.clone()?;
        Some(SecretSet { current, old: entry.old.clone(), bundle: entry.bundle.clone() })
    }

    /// Raw slot, including current-less entries left by a rotation signal.
    pub(crate) fn lookup_entry(&self, logical_name: &str) -> IndexEntry {
        self.entries.get(logical_name).map(|entry| entry.value().clone()).unwrap_or_default()
    }

    pub(crate) fn record(&self, logical_name: impl Into<String>, entry: IndexEntry) {
        self.entries.insert(logical_name.into(), entry);
    }
}

/// Insert keeping the record with the larger issue time; returns the
/// displaced loser, if any.
fn keep_newer(
    slot: &mut HashMap<String, ManagedSecret>,
    logical: &str,
    record: ManagedSecret,
) -> Option<ManagedSecret> {
    match slot.entry(logical.to_string()) {
        Entry::Occupied(mut occupied) => {
            if record.issued_at().unwrap_or(0) >= occupied.get().issued_at().unwrap_or(0) {
                Some(std::mem::replace(occupied.get_mut(), record))
            } else {
                Some(record)
            }
        }
        Entry::Vacant(vacant) => {
            vacant.insert(record);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::MemoryStore;

    use super::*;

    fn managed(name: &str, logical: &str, rotation: &str, issued_at: i64) -> ManagedSecret {
        let mut secret = ManagedSecret::new(name, "cluster--foo");
        secret.labels.insert(label::MANAGED_BY.to_string(), MANAGED_BY_VALUE.to_string());
        secret.labels.insert(label::MANAGER_IDENTITY.to_string(), "test".to_string());
        secret.labels.insert(label::NAME.to_string(), logical.to_string());
        secret
            .labels
            .insert(label::LAST_ROTATION_INITIATION_TIME.to_string(), rotation.to_string());
        secret.labels.insert(label::ISSUED_AT_TIME.to_string(), issued_at.to_string());
        secret
    }

    #[tokio::test]
    async fn test_load_classifies_current_old_and_bundle() {
        let store = MemoryStore::new();
        store.create(managed("ca-aaaa1111", "ca", "", 100)).await.unwrap();
        store.create(managed("ca-bbbb2222", "ca", "1650000000", 200)).await.unwrap();

        let mut bundle = managed("ca-bundle-cccc3333", "ca", "1650000000", 200);
        bundle.labels.remove(label::NAME);
        bundle.labels.insert(label::BUNDLE_FOR.to_string(), "ca".to_string());
        store.create(bundle).await.unwrap();

        let rotation_labels =
            HashMap::from([("ca".to_string(), "1650000000".to_string())]);
        let index = StoreIndex::load(&store, "cluster--foo", "test", &rotation_labels)
            .await
            .unwrap();

        let set = index.lookup("ca").unwrap();
        assert_eq!(set.current.name, "ca-bbbb2222");
        assert_eq!(set.old.unwrap().name, "ca-aaaa1111");
        assert_eq!(set.bundle.unwrap().name, "ca-bundle-cccc3333");
    }

    #[tokio::test]
    async fn test_load_keeps_superseded_generation_without_successor() {
        let store = MemoryStore::new();
        store.create(managed("ca-aaaa1111", "ca", "", 100)).await.unwrap();

        // A rotation was signaled but nothing re-generated yet.
        let rotation_labels =
            HashMap::from([("ca".to_string(), "1650000000".to_string())]);
        let index = StoreIndex::load(&store, "cluster--foo", "test", &rotation_labels)
            .await
            .unwrap();

        assert!(index.lookup("ca").is_none());
        let entry = index.lookup_entry("ca");
        assert!(entry.current.is_none());
        assert_eq!(entry.old.unwrap().name, "ca-aaaa1111");
    }

    #[tokio::test]
    async fn test_load_ignores_foreign_identities() {
        let store = MemoryStore::new();
        let mut foreign = managed("config-aaaa1111", "config", "", 100);
        foreign.labels.insert(label::MANAGER_IDENTITY.to_string(), "other".to_string());
        store.create(foreign).await.unwrap();

        let index =
            StoreIndex::load(&store, "cluster--foo", "test", &HashMap::new()).await.unwrap();
        assert!(index.lookup("config").is_none());
        assert!(index.lookup_entry("config").old.is_none());
    }

    #[tokio::test]
    async fn test_load_resolves_current_ties_by_issue_time() {
        let store = MemoryStore::new();
        store.create(managed("config-aaaa1111", "config", "", 100)).await.unwrap();
        store.create(managed("config-bbbb2222", "config", "", 200)).await.unwrap();

        let index =
            StoreIndex::load(&store, "cluster--foo", "test", &HashMap::new()).await.unwrap();

        let set = index.lookup("config").unwrap();
        assert_eq!(set.current.name, "config-bbbb2222");
        assert_eq!(set.old.unwrap().name, "config-aaaa1111");
    }

    #[tokio::test]
    async fn test_record_and_lookup() {
        let index = StoreIndex::default();
        assert!(index.lookup("config").is_none());

        index.record(
            "config",
            IndexEntry {
                current: Some(managed("config-aaaa1111", "config", "", 1)),
                old: None,
                bundle: None,
            },
        );
        assert_eq!(index.lookup("config").unwrap().current.name, "config-aaaa1111");
    }
}
