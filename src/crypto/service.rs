//! The encryption service: KDF + cipher behind one portable contract.

use std::sync::Arc;

use rand::RngCore;

use super::cipher::{self, NONCE_LENGTH};
use super::kdf::KeyDerivation;
use super::CryptoError;

/// Salt length in bytes. Stored (and fed to the KDF) as its hex encoding.
pub const SALT_LENGTH: usize = 16;

/// Result of an encryption: ciphertext plus the parameter triple needed to
/// reverse it, all hex-encoded for portable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub ciphertext: String,
    pub nonce: String,
    pub salt: String,
    pub auth_tag: String,
}

/// Stateless encrypt/decrypt over a password. Pure aside from the random
/// salt and nonce drawn per call.
pub struct EncryptionService {
    kdf: Arc<dyn KeyDerivation>,
}

impl EncryptionService {
    pub fn new(kdf: Arc<dyn KeyDerivation>) -> Self {
        Self { kdf }
    }

    /// Encrypt `plaintext` under `password` with a fresh salt and nonce.
    ///
    /// Every call draws new randomness, so encrypting the same input twice
    /// never yields the same salt, nonce, or ciphertext.
    pub fn encrypt(&self, plaintext: &[u8], password: &str) -> Result<EncryptedPayload, CryptoError> {
        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        let mut nonce = [0u8; NONCE_LENGTH];
        rand::thread_rng().fill_bytes(&mut nonce);

        // The hex-encoded salt is both the stored form and the KDF input.
        let salt_hex = hex::encode(salt);
        let key = self.kdf.derive(password.as_bytes(), salt_hex.as_bytes());

        let (ciphertext, tag) = cipher::seal(plaintext, &key, &nonce)?;

        Ok(EncryptedPayload {
            ciphertext: hex::encode(ciphertext),
            nonce: hex::encode(nonce),
            salt: salt_hex,
            auth_tag: hex::encode(tag),
        })
    }

    /// Decrypt a hex-encoded ciphertext. Wrong password and corrupted record
    /// are indistinguishable by design.
    pub fn decrypt(
        &self,
        ciphertext: &str,
        password: &str,
        nonce: &str,
        salt: &str,
        auth_tag: &str,
    ) -> Result<Vec<u8>, CryptoError> {
        let ciphertext = hex::decode(ciphertext).map_err(|_| CryptoError::InvalidPassword)?;
        self.decrypt_bytes(&ciphertext, password, nonce, salt, auth_tag)
    }

    /// Decrypt raw ciphertext bytes (the stored form of file payloads).
    pub fn decrypt_bytes(
        &self,
        ciphertext: &[u8],
        password: &str,
        nonce: &str,
        salt: &str,
        auth_tag: &str,
    ) -> Result<Vec<u8>, CryptoError> {
        let nonce = hex::decode(nonce).map_err(|_| CryptoError::InvalidPassword)?;
        let tag = hex::decode(auth_tag).map_err(|_| CryptoError::InvalidPassword)?;

        let key = self.kdf.derive(password.as_bytes(), salt.as_bytes());
        cipher::open(ciphertext, &key, &nonce, &tag)
    }
}

#[cfg(test)]
mod tests {
    use super::super::kdf::Pbkdf2Sha256;
    use super::*;

    fn service() -> EncryptionService {
        EncryptionService::new(Arc::new(Pbkdf2Sha256))
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let svc = service();
        let payload = svc.encrypt(b"my deepest secret", "hunter2").unwrap();

        let plaintext = svc
            .decrypt(
                &payload.ciphertext,
                "hunter2",
                &payload.nonce,
                &payload.salt,
                &payload.auth_tag,
            )
            .unwrap();
        assert_eq!(plaintext, b"my deepest secret");
    }

    #[test]
    fn two_encryptions_are_pairwise_distinct() {
        let svc = service();
        let a = svc.encrypt(b"same data", "same password").unwrap();
        let b = svc.encrypt(b"same data", "same password").unwrap();

        assert_ne!(a.salt, b.salt);
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn wrong_password_never_returns_plaintext() {
        let svc = service();
        let payload = svc.encrypt(b"secret", "right").unwrap();

        let result = svc.decrypt(
            &payload.ciphertext,
            "wrong",
            &payload.nonce,
            &payload.salt,
            &payload.auth_tag,
        );
        assert_eq!(result, Err(CryptoError::InvalidPassword));
    }

    #[test]
    fn tampered_tag_is_rejected() {
        let svc = service();
        let mut payload = svc.encrypt(b"secret", "pw").unwrap();
        // Flip one nibble of the stored tag.
        let flipped = if payload.auth_tag.starts_with('0') { "1" } else { "0" };
        payload.auth_tag.replace_range(0..1, flipped);

        let result = svc.decrypt(
            &payload.ciphertext,
            "pw",
            &payload.nonce,
            &payload.salt,
            &payload.auth_tag,
        );
        assert_eq!(result, Err(CryptoError::InvalidPassword));
    }

    #[test]
    fn garbage_hex_is_rejected_like_a_wrong_password() {
        let svc = service();
        let payload = svc.encrypt(b"secret", "pw").unwrap();

        let result = svc.decrypt(
            "not hex at all",
            "pw",
            &payload.nonce,
            &payload.salt,
            &payload.auth_tag,
        );
        assert_eq!(result, Err(CryptoError::InvalidPassword));
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let svc = service();
        let payload = svc.encrypt(b"", "pw").unwrap();
        let plaintext = svc
            .decrypt(
                &payload.ciphertext,
                "pw",
                &payload.nonce,
                &payload.salt,
                &payload.auth_tag,
            )
            .unwrap();
        assert!(plaintext.is_empty());
    }

    #[test]
    fn binary_payload_roundtrips_via_decrypt_bytes() {
        let svc = service();
        let blob: Vec<u8> = (0..=255).collect();
        let payload = svc.encrypt(&blob, "pw").unwrap();

        let ciphertext = hex::decode(&payload.ciphertext).unwrap();
        let plaintext = svc
            .decrypt_bytes(
                &ciphertext,
                "pw",
                &payload.nonce,
                &payload.salt,
                &payload.auth_tag,
            )
            .unwrap();
        assert_eq!(plaintext, blob);
    }

    #[test]
    fn unicode_content_roundtrips() {
        let svc = service();
        let content = "Hello, 世界! 🎉";
        let payload = svc.encrypt(content.as_bytes(), "pw").unwrap();
        let plaintext = svc
            .decrypt(
                &payload.ciphertext,
                "pw",
                &payload.nonce,
                &payload.salt,
                &payload.auth_tag,
            )
            .unwrap();
        assert_eq!(String::from_utf8(plaintext).unwrap(), content);
    }
}
