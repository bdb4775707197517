//! Password-based authenticated encryption.
//!
//! Composes a deliberately slow key derivation function with AES-256-GCM:
//!
//! ```text
//! password ──┐
//!            ├─ PBKDF2-HMAC-SHA256 (100k rounds) ──► key ──┐
//! salt ──────┘                                             ├─ AES-256-GCM ──► ciphertext + tag
//! nonce ────────────────────────────────────────────────────┘
//! ```
//!
//! Salt and nonce are generated fresh for every encryption; the parameter
//! triple (salt, nonce, auth tag) is stored hex-encoded next to the
//! ciphertext. Decryption with a wrong password and decryption of corrupted
//! data are indistinguishable: both surface [`CryptoError::InvalidPassword`].

mod cipher;
mod kdf;
mod service;

pub use cipher::{NONCE_LENGTH, TAG_LENGTH};
pub use kdf::{KeyDerivation, Pbkdf2Sha256, KEY_LENGTH, PBKDF2_ITERATIONS};
pub use service::{EncryptedPayload, EncryptionService, SALT_LENGTH};

use thiserror::Error;

/// Errors from the encryption layer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// Wrong password, tampered ciphertext, or malformed parameters.
    /// Deliberately a single variant so callers cannot build an oracle
    /// distinguishing the cases.
    #[error("Invalid password provided")]
    InvalidPassword,

    /// Sealing failed. Not reachable with well-formed keys and nonces.
    #[error("Encryption failed")]
    Cipher,
}
