//! Domain types: managed secret records and credential-request descriptors.

pub mod config;
pub mod secret;

pub use config::{
    data_key, AccessRequest, BasicAuthConfig, BasicAuthFormat, CertificateConfig, CertificateKind,
    ControlPlaneConfig, EtcdEncryptionKeyConfig, RsaConfig, SecretConfig, StaticTokenConfig,
    TokenProfile, DEFAULT_CERTIFICATE_VALIDITY,
};
pub use secret::{label, ManagedSecret, RotationStrategy, MANAGED_BY_VALUE};
