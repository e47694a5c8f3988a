//! # Error Handling
//!
//! Error handling for the trustplane secrets manager. The crate-wide
//! [`TrustplaneError`] carries the taxonomy the generate orchestrator
//! surfaces (validation, backing store, adapter, crypto); the storage layer
//! has its own [`crate::storage::StoreError`] which is nested as a source.

mod types;

pub use types::{Result, TrustplaneError};
