//! Key derivation from passwords.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

/// Derived key length in bytes (256 bits for AES-256).
pub const KEY_LENGTH: usize = 32;

/// PBKDF2 iteration count. The cost of an offline guess scales linearly with
/// this number; lowering it weakens every secret already stored.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Stretches a password and salt into a fixed-size symmetric key.
///
/// Implementations must be deterministic: decryption re-derives the
/// encrypt-time key from the stored salt. The trait exists so lifecycle
/// tests can substitute a cheap derivation instead of paying the full
/// iterated-hash cost on every call.
pub trait KeyDerivation: Send + Sync {
    fn derive(&self, password: &[u8], salt: &[u8]) -> [u8; KEY_LENGTH];
}

/// Production KDF: PBKDF2-HMAC-SHA256 with [`PBKDF2_ITERATIONS`] rounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pbkdf2Sha256;

impl KeyDerivation for Pbkdf2Sha256 {
    fn derive(&self, password: &[u8], salt: &[u8]) -> [u8; KEY_LENGTH] {
        let mut key = [0u8; KEY_LENGTH];
        pbkdf2_hmac::<Sha256>(password, salt, PBKDF2_ITERATIONS, &mut key);
        key
    }
}
