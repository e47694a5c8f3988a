//! Content-addressed resource naming.
//!
//! A secret's backing-store name is derived from its logical name plus a
//! truncated hash of everything that should force a remint: the config
//! content, the externally signaled rotation instant, and (for dependent
//! certificates) the checksum of the resolved signing CA. Identical input
//! resolves to an identical name, which is what makes `generate` idempotent
//! without a separate change-detection pass.

use sha2::{Digest, Sha256};

use crate::domain::SecretConfig;
use crate::errors::{Result, TrustplaneError};

/// Truncated-hash length carried in names and `checksum` labels.
const FINGERPRINT_LEN: usize = 8;

/// Compute the truncated fingerprint of a config.
pub fn fingerprint(
    config: &SecretConfig,
    last_rotation_initiation_time: &str,
    signing_ca_checksum: Option<&str>,
) -> Result<String> {
    let content = serde_json::to_vec(config).map_err(|e| {
        TrustplaneError::internal(format!("config serialization failed: {e}"))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&content);
    hasher.update(last_rotation_initiation_time.as_bytes());
    if let Some(checksum) = signing_ca_checksum {
        hasher.update(checksum.as_bytes());
    }
    Ok(hex::encode(hasher.finalize())[..FINGERPRINT_LEN].to_string())
}

/// Backing-store name for a primary record.
///
/// CA configs may request their logical name verbatim when an externally
/// referenced fixed name is required.
pub fn resource_name(config: &SecretConfig, fingerprint: &str, ignore_checksum_for_ca_name: bool) -> String {
    if ignore_checksum_for_ca_name && config.is_ca() {
        return config.name().to_string();
    }
    format!("{}-{}", config.name(), fingerprint)
}

/// Backing-store name for a trust bundle, derived from the fingerprints of
/// its constituents so an unchanged CA set yields an unchanged name.
pub fn bundle_resource_name(logical_name: &str, constituent_checksums: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for checksum in constituent_checksums {
        hasher.update(checksum.as_bytes());
    }
    let digest = hex::encode(hasher.finalize());
    format!("{}-bundle-{}", logical_name, &digest[..FINGERPRINT_LEN])
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::domain::{BasicAuthConfig, BasicAuthFormat, CertificateConfig, SecretConfig};

    use super::*;

    fn basic_auth(username: &str, password_length: usize) -> SecretConfig {
        SecretConfig::BasicAuth(BasicAuthConfig {
            name: "config".to_string(),
            format: BasicAuthFormat::Normal,
            username: username.to_string(),
            password_length,
        })
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let config = basic_auth("foo", 3);
        let first = fingerprint(&config, "", None).unwrap();
        let second = fingerprint(&config, "", None).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 8);
    }

    #[test]
    fn test_fingerprint_sensitivity() {
        let base = fingerprint(&basic_auth("foo", 3), "", None).unwrap();

        // Content change
        assert_ne!(base, fingerprint(&basic_auth("foo", 4), "", None).unwrap());
        assert_ne!(base, fingerprint(&basic_auth("bar", 3), "", None).unwrap());
        // Rotation signal
        assert_ne!(base, fingerprint(&basic_auth("foo", 3), "1650000000", None).unwrap());
        // Signing CA change
        assert_ne!(base, fingerprint(&basic_auth("foo", 3), "", Some("cb09286a")).unwrap());
    }

    #[test]
    fn test_resource_name_for_ca_configs() {
        let ca = SecretConfig::Certificate(CertificateConfig::ca("ca", "ca"));
        assert_eq!(resource_name(&ca, "cb09286a", false), "ca-cb09286a");
        assert_eq!(resource_name(&ca, "cb09286a", true), "ca");

        // The escape hatch only applies to CA configs.
        let config = basic_auth("foo", 3);
        assert_eq!(resource_name(&config, "cb09286a", true), "config-cb09286a");
    }

    #[test]
    fn test_bundle_name_tracks_constituents() {
        let one = bundle_resource_name("ca", &["aaaa1111"]);
        let two = bundle_resource_name("ca", &["aaaa1111", "bbbb2222"]);
        assert!(one.starts_with("ca-bundle-"));
        assert_ne!(one, two);
        assert_eq!(one, bundle_resource_name("ca", &["aaaa1111"]));
    }

    proptest! {
        #[test]
        fn prop_fingerprint_deterministic(username in "[a-z]{1,16}", length in 1usize..128) {
            let config = basic_auth(&username, length);
            prop_assert_eq!(
                fingerprint(&config, "", None).unwrap(),
                fingerprint(&config, "", None).unwrap()
            );
        }

        #[test]
        fn prop_rotation_time_changes_fingerprint(ts in 1i64..4_000_000_000i64) {
            let config = basic_auth("foo", 3);
            let unrotated = fingerprint(&config, "", None).unwrap();
            let rotated = fingerprint(&config, &ts.to_string(), None).unwrap();
            prop_assert_ne!(unrotated, rotated);
        }
    }
}
