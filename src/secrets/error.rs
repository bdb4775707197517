//! Error taxonomy for the secret lifecycle.

use thiserror::Error;

use crate::crypto::CryptoError;

/// All failures a lifecycle operation can surface. None of these are
/// retriable: the caller must supply corrected input, and after exhaustion
/// or expiry the record is already gone.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretError {
    /// Bad input shape; rejected before any crypto or storage work.
    #[error("{0}")]
    Validation(String),

    /// Unknown ID, or a record purged on expiry. The two are deliberately
    /// indistinguishable so expiry does not leak past existence.
    #[error("Secret not found")]
    NotFound,

    /// Wrong password or tampered record; never reveals which.
    #[error("Invalid password provided")]
    InvalidPassword,

    /// The retrieval budget was spent.
    #[error("This secret has reached its maximum number of retrievals")]
    RetrievalsExhausted,

    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<CryptoError> for SecretError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidPassword => SecretError::InvalidPassword,
            CryptoError::Cipher => SecretError::Storage("encryption failure".to_string()),
        }
    }
}
