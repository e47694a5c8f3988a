//! Options accepted by [`crate::manager::SecretsManager::generate`].

use std::time::Duration;

use crate::domain::RotationStrategy;

/// Declared dependency on a signing CA.
#[derive(Debug, Clone)]
pub struct SignedByCa {
    pub(crate) name: String,
    pub(crate) use_current_ca: bool,
}

/// Builder-style options for a generate call. Every effect is enumerated;
/// the default is an in-place rotation with no custom lifetime.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub(crate) validity: Option<Duration>,
    pub(crate) rotation: RotationStrategy,
    pub(crate) ignore_old_secrets: bool,
    pub(crate) persist: bool,
    pub(crate) signed_by_ca: Option<SignedByCa>,
    pub(crate) ignore_config_checksum_for_ca_name: bool,
}

impl GenerateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intended lifetime for secrets that support one. Ignored for
    /// certificate kinds, whose lifetime comes from certificate policy.
    pub fn validity(mut self, validity: Duration) -> Self {
        self.validity = Some(validity);
        self
    }

    /// Rotation strategy applied to the previous `current` when the
    /// resource name changes.
    pub fn rotate(mut self, strategy: RotationStrategy) -> Self {
        self.rotation = strategy;
        self
    }

    /// Suppress retention of `old` even under `KeepOld`.
    pub fn ignore_old_secrets(mut self) -> Self {
        self.ignore_old_secrets = true;
        self
    }

    /// Mark the record long-lived: `persist = "true"` label.
    pub fn persist(mut self) -> Self {
        self.persist = true;
        self
    }

    /// Sign the certificate with the named CA, preferring its retained
    /// `old` generation for continuity across one rotation window.
    pub fn signed_by_ca(mut self, ca_name: impl Into<String>) -> Self {
        self.signed_by_ca = Some(SignedByCa { name: ca_name.into(), use_current_ca: false });
        self
    }

    /// Sign the certificate with the named CA's `current` generation,
    /// forcing adoption of new material after a rotation.
    pub fn signed_by_current_ca(mut self, ca_name: impl Into<String>) -> Self {
        self.signed_by_ca = Some(SignedByCa { name: ca_name.into(), use_current_ca: true });
        self
    }

    /// Name the CA record by its logical name verbatim instead of
    /// appending the config checksum.
    pub fn ignore_config_checksum_for_ca_secret_name(mut self) -> Self {
        self.ignore_config_checksum_for_ca_name = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = GenerateOptions::new();
        assert_eq!(options.rotation, RotationStrategy::InPlace);
        assert!(options.validity.is_none());
        assert!(!options.ignore_old_secrets);
        assert!(!options.persist);
        assert!(options.signed_by_ca.is_none());
        assert!(!options.ignore_config_checksum_for_ca_name);
    }

    #[test]
    fn test_builder_chaining() {
        let options = GenerateOptions::new()
            .validity(Duration::from_secs(3600))
            .rotate(RotationStrategy::KeepOld)
            .ignore_old_secrets()
            .persist()
            .signed_by_current_ca("ca");

        assert_eq!(options.rotation, RotationStrategy::KeepOld);
        assert!(options.ignore_old_secrets);
        assert!(options.persist);
        let signed_by = options.signed_by_ca.unwrap();
        assert_eq!(signed_by.name, "ca");
        assert!(signed_by.use_current_ca);
    }
}
