//! Signing CA resolution for dependent certificates.
//!
//! Continuity policy: unless the caller forces the current generation, a
//! dependent keeps resolving to the CA's retained `old` generation, so a
//! single CA rotation does not remint every certificate signed by it. Once
//! the old generation is dropped, the next generate call picks up `current`.

use crate::crypto::IssuerMaterial;
use crate::domain::data_key;
use crate::errors::{Result, TrustplaneError};

use super::index::StoreIndex;

/// Signing material plus the checksum folded into dependents' names.
#[derive(Debug)]
pub(crate) struct ResolvedSigner {
    pub material: IssuerMaterial,
    pub checksum: String,
}

pub(crate) fn resolve(
    index: &StoreIndex,
    ca_logical_name: &str,
    use_current_ca: bool,
) -> Result<ResolvedSigner> {
    let set = index.lookup(ca_logical_name).ok_or_else(|| {
        TrustplaneError::validation(format!(
            "signing CA '{ca_logical_name}' has not been generated"
        ))
    })?;

    let record = if use_current_ca { set.current } else { set.old.unwrap_or(set.current) };

    let certificate_pem = record.data.get(data_key::CERTIFICATE_CA).ok_or_else(|| {
        TrustplaneError::validation(format!(
            "record '{}' carries no CA certificate",
            record.name
        ))
    })?;
    let private_key_pem = record.data.get(data_key::PRIVATE_KEY_CA).ok_or_else(|| {
        TrustplaneError::validation(format!("record '{}' carries no CA private key", record.name))
    })?;
    let checksum = record
        .checksum()
        .ok_or_else(|| {
            TrustplaneError::internal(format!("record '{}' has no checksum label", record.name))
        })?
        .to_string();

    Ok(ResolvedSigner {
        material: IssuerMaterial {
            certificate_pem: String::from_utf8_lossy(certificate_pem).into_owned(),
            private_key_pem: String::from_utf8_lossy(private_key_pem).into_owned(),
        },
        checksum,
    })
}

#[cfg(test)]
mod tests {
    use crate::domain::{label, ManagedSecret};
    use crate::manager::index::IndexEntry;

    use super::*;

    fn ca_record(name: &str, checksum: &str) -> ManagedSecret {
        let mut secret = ManagedSecret::new(name, "cluster--foo");
        secret.labels.insert(label::NAME.to_string(), "ca".to_string());
        secret.labels.insert(label::CHECKSUM.to_string(), checksum.to_string());
        secret
            .data
            .insert(data_key::CERTIFICATE_CA.to_string(), format!("cert-{name}").into_bytes());
        secret
            .data
            .insert(data_key::PRIVATE_KEY_CA.to_string(), format!("key-{name}").into_bytes());
        secret
    }

    fn index_with(old: Option<ManagedSecret>) -> StoreIndex {
        let index = StoreIndex::default();
        index.record(
            "ca",
            IndexEntry {
                current: Some(ca_record("ca-bbbb2222", "bbbb2222")),
                old,
                bundle: None,
            },
        );
        index
    }

    #[test]
    fn test_prefers_old_for_continuity() {
        let index = index_with(Some(ca_record("ca-aaaa1111", "aaaa1111")));
        let signer = resolve(&index, "ca", false).unwrap();
        assert_eq!(signer.checksum, "aaaa1111");
        assert_eq!(signer.material.certificate_pem, "cert-ca-aaaa1111");
    }

    #[test]
    fn test_use_current_ca_forces_adoption() {
        let index = index_with(Some(ca_record("ca-aaaa1111", "aaaa1111")));
        let signer = resolve(&index, "ca", true).unwrap();
        assert_eq!(signer.checksum, "bbbb2222");
    }

    #[test]
    fn test_falls_back_to_current_without_old() {
        let index = index_with(None);
        let signer = resolve(&index, "ca", false).unwrap();
        assert_eq!(signer.checksum, "bbbb2222");
    }

    #[test]
    fn test_unknown_ca_is_a_validation_error() {
        let index = StoreIndex::default();
        let err = resolve(&index, "ca", false).unwrap_err();
        assert!(matches!(err, TrustplaneError::Validation { .. }));
    }
}
