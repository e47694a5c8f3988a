//! Trust bundle assembly for CA logical names.
//!
//! The bundle record aggregates every still-present CA certificate for a
//! logical name (current first, then old) so dependents can accept
//! credentials signed by either generation during a rotation window. Its
//! name derives from the constituents' checksums, so an unchanged CA set
//! produces no redundant write.

use crate::domain::{data_key, label, ManagedSecret, MANAGED_BY_VALUE};
use crate::errors::{Result, TrustplaneError};

use super::naming;

/// Build the record the bundle should currently be.
pub(crate) fn desired_bundle(
    namespace: &str,
    identity: &str,
    logical_name: &str,
    rotation_label: &str,
    issued_at: i64,
    current: &ManagedSecret,
    old: Option<&ManagedSecret>,
) -> Result<ManagedSecret> {
    let mut checksums = Vec::with_capacity(2);
    let mut certificates = Vec::with_capacity(2);
    for record in std::iter::once(current).chain(old) {
        let checksum = record.checksum().ok_or_else(|| {
            TrustplaneError::internal(format!("record '{}' has no checksum label", record.name))
        })?;
        let certificate = record.data.get(data_key::CERTIFICATE_CA).ok_or_else(|| {
            TrustplaneError::internal(format!(
                "record '{}' carries no CA certificate",
                record.name
            ))
        })?;
        checksums.push(checksum);
        certificates.push(certificate.clone());
    }

    let name = naming::bundle_resource_name(logical_name, &checksums);
    let bundle_checksum = name.rsplit('-').next().unwrap_or_default().to_string();

    let mut bundle = ManagedSecret::new(name, namespace);
    bundle.data.insert(data_key::BUNDLE.to_string(), certificates.concat());
    bundle.labels.insert(label::MANAGED_BY.to_string(), MANAGED_BY_VALUE.to_string());
    bundle.labels.insert(label::MANAGER_IDENTITY.to_string(), identity.to_string());
    bundle.labels.insert(label::BUNDLE_FOR.to_string(), logical_name.to_string());
    bundle.labels.insert(label::CHECKSUM.to_string(), bundle_checksum);
    bundle
        .labels
        .insert(label::LAST_ROTATION_INITIATION_TIME.to_string(), rotation_label.to_string());
    bundle.labels.insert(label::ISSUED_AT_TIME.to_string(), issued_at.to_string());
    bundle.annotations.insert(label::ISSUED_AT_TIME.to_string(), issued_at.to_string());
    bundle.immutable = true;
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ca_record(name: &str, checksum: &str, pem: &str) -> ManagedSecret {
        let mut secret = ManagedSecret::new(name, "cluster--foo");
        secret.labels.insert(label::CHECKSUM.to_string(), checksum.to_string());
        secret.data.insert(data_key::CERTIFICATE_CA.to_string(), pem.as_bytes().to_vec());
        secret
    }

    #[test]
    fn test_bundle_concatenates_current_first() {
        let current = ca_record("ca-bbbb2222", "bbbb2222", "CURRENT\n");
        let old = ca_record("ca-aaaa1111", "aaaa1111", "OLD\n");

        let bundle =
            desired_bundle("cluster--foo", "test", "ca", "", 0, &current, Some(&old)).unwrap();
        assert_eq!(bundle.data.get(data_key::BUNDLE).unwrap(), b"CURRENT\nOLD\n");
        assert_eq!(bundle.label(label::BUNDLE_FOR), Some("ca"));
        assert!(bundle.logical_name().is_none());
        assert!(bundle.immutable);
    }

    #[test]
    fn test_bundle_name_is_stable_for_unchanged_set() {
        let current = ca_record("ca-bbbb2222", "bbbb2222", "CURRENT\n");

        let first = desired_bundle("cluster--foo", "test", "ca", "", 0, &current, None).unwrap();
        let second = desired_bundle("cluster--foo", "test", "ca", "", 5, &current, None).unwrap();
        assert_eq!(first.name, second.name);

        let old = ca_record("ca-aaaa1111", "aaaa1111", "OLD\n");
        let widened =
            desired_bundle("cluster--foo", "test", "ca", "", 0, &current, Some(&old)).unwrap();
        assert_ne!(first.name, widened.name);
    }
}
