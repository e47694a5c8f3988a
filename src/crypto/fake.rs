//! Deterministic [`SecretSource`] for tests.
//!
//! Output is derived from a SHA-256 over the inputs plus a call counter, so
//! a test run is reproducible call-by-call while consecutive mints still
//! differ (a rotation must never accidentally reproduce the material it
//! replaces).

use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};

use crate::errors::Result;

use super::{CertificateMaterial, CertificateRequest, RsaKeyMaterial, SecretSource};

#[derive(Debug, Default)]
pub struct FakeSecretSource {
    counter: AtomicU64,
}

impl FakeSecretSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst)
    }
}

fn digest(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

fn pem_block(tag: &str, body: &str) -> String {
    format!("-----BEGIN {tag}-----\n{body}\n-----END {tag}-----\n")
}

impl SecretSource for FakeSecretSource {
    fn random_string(&self, length: usize) -> Result<String> {
        let seed = digest(&[b"fake-string", &self.next().to_be_bytes()]);
        Ok(seed.chars().cycle().take(length).collect())
    }

    fn random_bytes(&self, length: usize) -> Result<Vec<u8>> {
        let seed = digest(&[b"fake-bytes", &self.next().to_be_bytes()]);
        Ok(seed.into_bytes().into_iter().cycle().take(length).collect())
    }

    fn rsa_keypair(&self, bits: usize) -> Result<RsaKeyMaterial> {
        let seed = digest(&[b"fake-rsa", &bits.to_be_bytes(), &self.next().to_be_bytes()]);
        Ok(RsaKeyMaterial {
            private_key_pem: pem_block("RSA PRIVATE KEY", &seed),
            public_key_ssh: format!("ssh-rsa {seed}"),
        })
    }

    fn issue_certificate(&self, request: &CertificateRequest) -> Result<CertificateMaterial> {
        let issuer_pem =
            request.issuer.as_ref().map(|i| i.certificate_pem.as_str()).unwrap_or("self-signed");
        let seed = digest(&[
            b"fake-certificate",
            request.common_name.as_bytes(),
            request.kind.as_str().as_bytes(),
            issuer_pem.as_bytes(),
            &request.not_after.timestamp().to_be_bytes(),
            &self.next().to_be_bytes(),
        ]);
        Ok(CertificateMaterial {
            certificate_pem: pem_block("CERTIFICATE", &seed),
            private_key_pem: pem_block("PRIVATE KEY", &digest(&[b"fake-key", seed.as_bytes()])),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;

    use crate::domain::CertificateKind;

    use super::*;

    #[test]
    fn test_outputs_advance_per_call() {
        let source = FakeSecretSource::new();
        let first = source.random_string(16).unwrap();
        let second = source.random_string(16).unwrap();
        assert_eq!(first.len(), 16);
        assert_ne!(first, second);
    }

    #[test]
    fn test_certificates_are_pem_shaped_and_distinct() {
        let source = FakeSecretSource::new();
        let request = CertificateRequest {
            common_name: "ca".to_string(),
            organizations: vec![],
            dns_names: vec![],
            ip_addresses: vec![],
            kind: CertificateKind::Ca,
            not_before: Utc.timestamp_opt(0, 0).single().unwrap(),
            not_after: Utc.timestamp_opt(1, 0).single().unwrap(),
            issuer: None,
        };

        let first = source.issue_certificate(&request).unwrap();
        let second = source.issue_certificate(&request).unwrap();
        assert!(first.certificate_pem.starts_with("-----BEGIN CERTIFICATE-----"));
        assert_ne!(first.certificate_pem, second.certificate_pem);
    }
}
