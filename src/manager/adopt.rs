//! Backward-compatibility adapters.
//!
//! Before the manager mints a secret for a well-known logical name, these
//! adapters look for the record a pre-manager deployment would have written
//! and transplant its sensitive fields into the freshly minted data, so
//! adopting the manager does not rotate credentials operators depend on.
//! Each adapter knows exactly one legacy record name and shape; a legacy
//! record that exists but cannot be parsed surfaces as an adapter error.

use std::collections::BTreeMap;

use tracing::info;

use crate::domain::config::{
    basic_auth_data, parse_basic_auth_csv, parse_static_token_csv, static_token_csv,
};
use crate::domain::{data_key, label, CertificateKind, SecretConfig, MANAGED_BY_VALUE};
use crate::errors::{Result, TrustplaneError};
use crate::storage::ObjectStore;

/// Logical names with a known pre-manager layout, mapped to the legacy
/// record each adapter reads.
const LEGACY_BASIC_AUTH: &[(&str, &str)] = &[
    ("api-server-basic-auth", "api-server-basic-auth"),
    ("observability-ingress", "monitoring-ingress-credentials"),
    ("observability-ingress-users", "monitoring-ingress-credentials-users"),
];
const LEGACY_ETCD_ENCRYPTION: (&str, &str) =
    ("api-server-etcd-encryption-key", "etcd-encryption-secret");
const LEGACY_STATIC_TOKEN: (&str, &str) = ("api-server-static-token", "static-token");
const LEGACY_SSH_KEYPAIR: &str = "ssh-keypair";
const LEGACY_SSH_KEYPAIR_OLD: &str = "ssh-keypair.old";
const LEGACY_SERVICE_ACCOUNT_KEY: &str = "service-account-key";
const LEGACY_CLIENT_CA: (&str, &str) = ("ca-client", "ca");

const LEGACY_ENCRYPTION_CONFIG_KEY: &str = "encryption-configuration.yaml";

/// Rework freshly minted `data` with sensitive fields from a legacy record,
/// when one exists for this logical name. No-op for names without a known
/// legacy shape.
pub(crate) async fn apply_legacy_overrides(
    config: &SecretConfig,
    data: &mut BTreeMap<String, Vec<u8>>,
    store: &dyn ObjectStore,
    namespace: &str,
    identity: &str,
) -> Result<()> {
    match config {
        SecretConfig::BasicAuth(c) => {
            let Some((_, legacy_name)) =
                LEGACY_BASIC_AUTH.iter().find(|(logical, _)| *logical == c.name)
            else {
                return Ok(());
            };
            let Some(record) = read_legacy(store, namespace, legacy_name).await? else {
                return Ok(());
            };
            let password = legacy_password(&c.name, &record.data)?;
            *data = basic_auth_data(c.format, &c.username, &password)?;
            log_adoption(&c.name, legacy_name);
        }
        SecretConfig::EtcdEncryptionKey(c) if c.name == LEGACY_ETCD_ENCRYPTION.0 => {
            let Some(record) = read_legacy(store, namespace, LEGACY_ETCD_ENCRYPTION.1).await?
            else {
                return Ok(());
            };
            let document = record.data.get(LEGACY_ENCRYPTION_CONFIG_KEY).ok_or_else(|| {
                TrustplaneError::adapter(&c.name, "legacy record has no encryption configuration")
            })?;
            let (key_name, secret) = parse_encryption_configuration(&c.name, document)?;
            data.insert(data_key::ETCD_ENCRYPTION_KEY_NAME.into(), key_name.into_bytes());
            data.insert(data_key::ETCD_ENCRYPTION_SECRET.into(), secret.into_bytes());
            log_adoption(&c.name, LEGACY_ETCD_ENCRYPTION.1);
        }
        SecretConfig::StaticToken(c) if c.name == LEGACY_STATIC_TOKEN.0 => {
            let Some(record) = read_legacy(store, namespace, LEGACY_STATIC_TOKEN.1).await? else {
                return Ok(());
            };
            let legacy_csv = record.data.get(data_key::STATIC_TOKEN_CSV).ok_or_else(|| {
                TrustplaneError::adapter(&c.name, "legacy record has no token CSV")
            })?;
            let legacy_entries = parse_static_token_csv(legacy_csv)
                .map_err(|e| TrustplaneError::adapter(&c.name, e.to_string()))?;

            let minted_csv = data.get(data_key::STATIC_TOKEN_CSV).ok_or_else(|| {
                TrustplaneError::internal("minted static token data has no CSV".to_string())
            })?;
            let mut entries = parse_static_token_csv(minted_csv)?;
            for entry in &mut entries {
                if let Some(old) = legacy_entries.iter().find(|l| l.username == entry.username) {
                    entry.token = old.token.clone();
                }
            }
            data.insert(data_key::STATIC_TOKEN_CSV.into(), static_token_csv(&entries));
            log_adoption(&c.name, LEGACY_STATIC_TOKEN.1);
        }
        SecretConfig::Rsa(c) if c.name == LEGACY_SSH_KEYPAIR => {
            let Some(record) = read_legacy(store, namespace, LEGACY_SSH_KEYPAIR).await? else {
                return Ok(());
            };
            if !record.data.contains_key(data_key::RSA_PRIVATE_KEY) {
                return Err(TrustplaneError::adapter(&c.name, "legacy keypair has no private key"));
            }
            *data = record.data.clone();
            log_adoption(&c.name, LEGACY_SSH_KEYPAIR);
            adopt_old_ssh_keypair(store, namespace, identity).await?;
        }
        SecretConfig::Rsa(c) if c.name == LEGACY_SERVICE_ACCOUNT_KEY => {
            let Some(record) = read_legacy(store, namespace, LEGACY_SERVICE_ACCOUNT_KEY).await?
            else {
                return Ok(());
            };
            if !record.data.contains_key(data_key::RSA_PRIVATE_KEY) {
                return Err(TrustplaneError::adapter(&c.name, "legacy record has no private key"));
            }
            *data = record.data.clone();
            log_adoption(&c.name, LEGACY_SERVICE_ACCOUNT_KEY);
        }
        SecretConfig::Certificate(c)
            if c.name == LEGACY_CLIENT_CA.0 && c.kind == CertificateKind::Ca =>
        {
            let Some(record) = read_legacy(store, namespace, LEGACY_CLIENT_CA.1).await? else {
                return Ok(());
            };
            let certificate = record.data.get(data_key::CERTIFICATE_CA).ok_or_else(|| {
                TrustplaneError::adapter(&c.name, "cluster CA record has no certificate")
            })?;
            let private_key = record.data.get(data_key::PRIVATE_KEY_CA).ok_or_else(|| {
                TrustplaneError::adapter(&c.name, "cluster CA record has no private key")
            })?;
            // Transplanted verbatim; the pair is only parsed when a
            // dependent certificate asks this CA to sign.
            data.insert(data_key::CERTIFICATE_CA.into(), certificate.clone());
            data.insert(data_key::PRIVATE_KEY_CA.into(), private_key.clone());
            log_adoption(&c.name, LEGACY_CLIENT_CA.1);
        }
        _ => {}
    }
    Ok(())
}

async fn read_legacy(
    store: &dyn ObjectStore,
    namespace: &str,
    name: &str,
) -> Result<Option<crate::domain::ManagedSecret>> {
    store
        .get(namespace, name)
        .await
        .map_err(|e| TrustplaneError::store(e, format!("read legacy record '{name}'")))
}

fn log_adoption(logical_name: &str, legacy_name: &str) {
    info!(name = %logical_name, legacy = %legacy_name, "Adopted sensitive fields from legacy record");
}

fn legacy_password(logical_name: &str, data: &BTreeMap<String, Vec<u8>>) -> Result<String> {
    if let Some(csv) = data.get(data_key::BASIC_AUTH_CSV) {
        let (_, password) = parse_basic_auth_csv(csv)
            .map_err(|e| TrustplaneError::adapter(logical_name, e.to_string()))?;
        return Ok(password);
    }
    if let Some(password) = data.get(data_key::PASSWORD) {
        return String::from_utf8(password.clone())
            .map_err(|_| TrustplaneError::adapter(logical_name, "password is not UTF-8"));
    }
    Err(TrustplaneError::adapter(logical_name, "legacy record has no password material"))
}

/// First aescbc key of the legacy encryption configuration document.
fn parse_encryption_configuration(logical_name: &str, document: &[u8]) -> Result<(String, String)> {
    let parsed: serde_yaml::Value = serde_yaml::from_slice(document)
        .map_err(|e| TrustplaneError::adapter(logical_name, format!("configuration is not YAML: {e}")))?;

    let key = parsed
        .get("resources")
        .and_then(|r| r.get(0))
        .and_then(|r| r.get("providers"))
        .and_then(|p| p.as_sequence())
        .and_then(|providers| providers.iter().find_map(|p| p.get("aescbc")))
        .and_then(|aescbc| aescbc.get("keys"))
        .and_then(|k| k.get(0));

    match key {
        Some(entry) => {
            let name = entry.get("name").and_then(serde_yaml::Value::as_str);
            let secret = entry.get("secret").and_then(serde_yaml::Value::as_str);
            match (name, secret) {
                (Some(name), Some(secret)) => Ok((name.to_string(), secret.to_string())),
                _ => Err(TrustplaneError::adapter(
                    logical_name,
                    "aescbc key entry lacks name or secret",
                )),
            }
        }
        None => Err(TrustplaneError::adapter(
            logical_name,
            "configuration has no aescbc provider key",
        )),
    }
}

/// A pre-manager rotation may have left an `ssh-keypair.old` record behind;
/// label it so it survives as the retained old generation.
async fn adopt_old_ssh_keypair(
    store: &dyn ObjectStore,
    namespace: &str,
    identity: &str,
) -> Result<()> {
    let Some(record) = read_legacy(store, namespace, LEGACY_SSH_KEYPAIR_OLD).await? else {
        return Ok(());
    };

    let mut desired = record.clone();
    desired.labels = BTreeMap::from([
        (label::NAME.to_string(), LEGACY_SSH_KEYPAIR.to_string()),
        (label::MANAGED_BY.to_string(), MANAGED_BY_VALUE.to_string()),
        (label::MANAGER_IDENTITY.to_string(), identity.to_string()),
        (label::PERSIST.to_string(), "true".to_string()),
        (label::LAST_ROTATION_INITIATION_TIME.to_string(), String::new()),
    ]);
    desired.immutable = true;

    if desired.labels != record.labels || !record.immutable {
        store.update(desired).await.map_err(|e| {
            TrustplaneError::store(e, format!("adopt legacy record '{LEGACY_SSH_KEYPAIR_OLD}'"))
        })?;
        info!(legacy = LEGACY_SSH_KEYPAIR_OLD, "Adopted superseded legacy keypair");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY_ENCRYPTION_CONFIGURATION: &str = r#"apiVersion: apiserver.config.k8s.io/v1
kind: EncryptionConfiguration
resources:
- providers:
  - aescbc:
      keys:
      - name: old-key
        secret: old-secret
  - identity: {}
  resources:
  - secrets
"#;

    #[test]
    fn test_parse_encryption_configuration() {
        let (name, secret) =
            parse_encryption_configuration("etcd", LEGACY_ENCRYPTION_CONFIGURATION.as_bytes())
                .unwrap();
        assert_eq!(name, "old-key");
        assert_eq!(secret, "old-secret");
    }

    #[test]
    fn test_parse_encryption_configuration_rejects_garbage() {
        let err = parse_encryption_configuration("etcd", b"resources: 3").unwrap_err();
        assert!(matches!(err, TrustplaneError::Adapter { .. }));

        let err = parse_encryption_configuration("etcd", b"\xff\xfe").unwrap_err();
        assert!(matches!(err, TrustplaneError::Adapter { .. }));
    }

    #[test]
    fn test_legacy_password_prefers_csv() {
        let mut data = BTreeMap::new();
        data.insert(data_key::BASIC_AUTH_CSV.to_string(), b"csv-pw,admin,admin".to_vec());
        data.insert(data_key::PASSWORD.to_string(), b"plain-pw".to_vec());
        assert_eq!(legacy_password("x", &data).unwrap(), "csv-pw");

        data.remove(data_key::BASIC_AUTH_CSV);
        assert_eq!(legacy_password("x", &data).unwrap(), "plain-pw");

        data.clear();
        assert!(matches!(
            legacy_password("x", &data).unwrap_err(),
            TrustplaneError::Adapter { .. }
        ));
    }
}
