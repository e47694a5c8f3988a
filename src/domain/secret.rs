//! Managed secret record and label vocabulary.
//!
//! A [`ManagedSecret`] is the unit the backing store persists: an opaque
//! byte-map plus the label set the manager uses to reconstruct its entire
//! view after a restart. Nothing else about a secret is durable.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Label keys carried by every record the manager owns.
pub mod label {
    /// Marks records owned by a secrets manager.
    pub const MANAGED_BY: &str = "managed-by";
    /// Caller-supplied identity, scoping records to one manager instance.
    pub const MANAGER_IDENTITY: &str = "manager-identity";
    /// Logical secret name (primary records).
    pub const NAME: &str = "name";
    /// Logical CA name a bundle aggregates (bundle records, instead of `name`).
    pub const BUNDLE_FOR: &str = "bundle-for";
    /// Truncated config fingerprint.
    pub const CHECKSUM: &str = "checksum";
    /// Externally signaled rotation instant (unix seconds, may be empty).
    pub const LAST_ROTATION_INITIATION_TIME: &str = "last-rotation-initiation-time";
    /// Issue instant (unix seconds), always present.
    pub const ISSUED_AT_TIME: &str = "issued-at-time";
    /// Expiry instant (unix seconds), only when the credential has a lifetime.
    pub const VALID_UNTIL_TIME: &str = "valid-until-time";
    /// Set to "true" when the caller opts into long-lived persistence.
    pub const PERSIST: &str = "persist";
}

/// Value of the `managed-by` label.
pub const MANAGED_BY_VALUE: &str = "secrets-manager";

/// A record in the backing store.
///
/// `version` is the store's optimistic-concurrency token; zero means the
/// record has not been persisted yet.
#[derive(Clone, PartialEq, Eq)]
pub struct ManagedSecret {
    pub name: String,
    pub namespace: String,
    pub data: BTreeMap<String, Vec<u8>>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub immutable: bool,
    pub version: u64,
}

impl ManagedSecret {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            data: BTreeMap::new(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            immutable: false,
            version: 0,
        }
    }

    /// Label value, `None` when absent.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Logical name, from the `name` label.
    pub fn logical_name(&self) -> Option<&str> {
        self.label(label::NAME)
    }

    /// Truncated config fingerprint, from the `checksum` label.
    pub fn checksum(&self) -> Option<&str> {
        self.label(label::CHECKSUM)
    }

    /// Whether this record is a trust bundle rather than a primary secret.
    pub fn is_bundle(&self) -> bool {
        self.labels.contains_key(label::BUNDLE_FOR)
    }

    /// Issue instant as unix seconds, when the label parses.
    pub fn issued_at(&self) -> Option<i64> {
        self.label(label::ISSUED_AT_TIME).and_then(|v| v.parse().ok())
    }
}

impl fmt::Debug for ManagedSecret {
    /// Data values are credential material and never printed; only the keys
    /// are shown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedSecret")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("data_keys", &self.data.keys().collect::<Vec<_>>())
            .field("labels", &self.labels)
            .field("annotations", &self.annotations)
            .field("immutable", &self.immutable)
            .field("version", &self.version)
            .finish()
    }
}

/// Policy governing what happens to the superseded `current` on rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationStrategy {
    /// Discard the previous current once the new one exists.
    #[default]
    InPlace,
    /// Demote the previous current to `old` instead of discarding it.
    KeepOld,
}

impl RotationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InPlace => "in_place",
            Self::KeepOld => "keep_old",
        }
    }
}

impl FromStr for RotationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_place" => Ok(Self::InPlace),
            "keep_old" => Ok(Self::KeepOld),
            _ => Err(format!("Unknown rotation strategy: {}", s)),
        }
    }
}

impl fmt::Display for RotationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_strategy_roundtrip() {
        for strategy in [RotationStrategy::InPlace, RotationStrategy::KeepOld] {
            let parsed: RotationStrategy = strategy.as_str().parse().unwrap();
            assert_eq!(strategy, parsed);
        }
    }

    #[test]
    fn test_debug_redacts_data_values() {
        let mut secret = ManagedSecret::new("ssh-keypair-abc12345", "cluster--foo");
        secret.data.insert("id_rsa".to_string(), b"super-secret-key".to_vec());

        let debug_output = format!("{:?}", secret);
        assert!(debug_output.contains("id_rsa"));
        assert!(!debug_output.contains("super-secret-key"));
    }

    #[test]
    fn test_label_accessors() {
        let mut secret = ManagedSecret::new("ca-cb09286a", "cluster--foo");
        secret.labels.insert(label::NAME.to_string(), "ca".to_string());
        secret.labels.insert(label::CHECKSUM.to_string(), "cb09286a".to_string());
        secret.labels.insert(label::ISSUED_AT_TIME.to_string(), "1650000000".to_string());

        assert_eq!(secret.logical_name(), Some("ca"));
        assert_eq!(secret.checksum(), Some("cb09286a"));
        assert_eq!(secret.issued_at(), Some(1650000000));
        assert!(!secret.is_bundle());
    }
}
