//! # Error Types
//!
//! Error types for the trustplane secrets manager using `thiserror`.

use crate::storage::StoreError;

/// Custom result type for trustplane operations
pub type Result<T> = std::result::Result<T, TrustplaneError>;

/// Main error type for the trustplane secrets manager
#[derive(thiserror::Error, Debug)]
pub enum TrustplaneError {
    /// Malformed secret config or unsatisfiable generate request
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Backing store failure. Propagated, never retried internally; the
    /// caller's reconciliation loop may safely re-invoke `generate`.
    #[error("Backing store error: {context}")]
    Store {
        #[source]
        source: StoreError,
        context: String,
    },

    /// A legacy record exists for a logical secret but cannot be parsed.
    /// Surfaced instead of silently rotating operator-relied-upon material.
    #[error("Adapter error for '{logical_name}': {reason}")]
    Adapter {
        logical_name: String,
        reason: String,
    },

    /// Cryptographic primitive failure (key generation, certificate
    /// issuance, encoding).
    #[error("Crypto error: {context}")]
    Crypto {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TrustplaneError {
    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a backing store error with context
    pub fn store<S: Into<String>>(source: StoreError, context: S) -> Self {
        Self::Store { source, context: context.into() }
    }

    /// Create an adapter error
    pub fn adapter<N: Into<String>, R: Into<String>>(logical_name: N, reason: R) -> Self {
        Self::Adapter { logical_name: logical_name.into(), reason: reason.into() }
    }

    /// Create a crypto error with source
    pub fn crypto<S: Into<String>>(context: S, source: anyhow::Error) -> Self {
        Self::Crypto { context: context.into(), source }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Check if this error should be retried by the caller's loop
    pub fn is_retryable(&self) -> bool {
        match self {
            TrustplaneError::Store { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}
