//! # Trustplane
//!
//! Trustplane issues, persists, and rotates credential material (passwords,
//! symmetric keys, asymmetric keypairs, X.509 certificates, bearer tokens)
//! for a managed cluster's control-plane components. It is the trust root
//! of the platform: every other component authenticates using artifacts
//! this crate produces.
//!
//! ## Architecture
//!
//! ```text
//! SecretConfig ──▶ SecretsManager::generate ──▶ ObjectStore
//!                        │      │
//!                 SecretSource  StoreIndex (rebuilt at construction)
//! ```
//!
//! The manager is stateless across restarts: its entire view is rebuilt
//! from labeled records in the backing store, names are content-addressed
//! (config fingerprint plus rotation signal), and CA rotation keeps the old
//! generation alongside the new one with an aggregate trust bundle so
//! dependents survive the rotation window.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use trustplane::crypto::OsSecretSource;
//! use trustplane::domain::{BasicAuthConfig, BasicAuthFormat, SecretConfig};
//! use trustplane::manager::{GenerateOptions, SecretsManager};
//! use trustplane::storage::MemoryStore;
//! use trustplane::utils::SystemClock;
//!
//! let manager = SecretsManager::new(
//!     Arc::new(SystemClock),
//!     Arc::new(OsSecretSource::new()),
//!     Arc::new(MemoryStore::new()),
//!     "cluster--foo",
//!     "controller",
//!     HashMap::new(),
//! )
//! .await?;
//!
//! let secret = manager
//!     .generate(
//!         &SecretConfig::BasicAuth(BasicAuthConfig {
//!             name: "observability-ingress".into(),
//!             format: BasicAuthFormat::Normal,
//!             username: "admin".into(),
//!             password_length: 32,
//!         }),
//!         GenerateOptions::new(),
//!     )
//!     .await?;
//! ```

pub mod crypto;
pub mod domain;
pub mod errors;
pub mod manager;
pub mod observability;
pub mod scheduler;
pub mod storage;
pub mod utils;

// Re-export commonly used types and traits
pub use domain::{ManagedSecret, RotationStrategy, SecretConfig};
pub use errors::{Result, TrustplaneError};
pub use manager::{GenerateOptions, SecretsManager};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "trustplane");
    }
}
