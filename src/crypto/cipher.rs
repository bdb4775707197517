//! AES-256-GCM with a detached authentication tag.

use aes_gcm::aead::KeyInit;
use aes_gcm::{AeadInPlace, Aes256Gcm, Nonce, Tag};

use super::kdf::KEY_LENGTH;
use super::CryptoError;

/// Nonce length in bytes (96 bits for AES-GCM).
pub const NONCE_LENGTH: usize = 12;

/// Authentication tag length in bytes.
pub const TAG_LENGTH: usize = 16;

/// Encrypt `plaintext` under `key` and `nonce`, returning ciphertext and tag
/// separately. The nonce must never be reused with the same key.
pub fn seal(
    plaintext: &[u8],
    key: &[u8; KEY_LENGTH],
    nonce: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    if nonce.len() != NONCE_LENGTH {
        return Err(CryptoError::Cipher);
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Cipher)?;
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(nonce), b"", &mut buffer)
        .map_err(|_| CryptoError::Cipher)?;

    Ok((buffer, tag.to_vec()))
}

/// Decrypt and verify. Fails closed: a wrong key, a tampered ciphertext or
/// tag, and malformed parameter lengths all return the same error, and no
/// partial plaintext is ever exposed.
pub fn open(
    ciphertext: &[u8],
    key: &[u8; KEY_LENGTH],
    nonce: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if nonce.len() != NONCE_LENGTH || tag.len() != TAG_LENGTH {
        return Err(CryptoError::InvalidPassword);
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidPassword)?;
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(nonce),
            b"",
            &mut buffer,
            Tag::from_slice(tag),
        )
        .map_err(|_| CryptoError::InvalidPassword)?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; KEY_LENGTH] {
        let mut key = [0u8; KEY_LENGTH];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        key
    }

    #[test]
    fn seal_open_roundtrip() {
        let key = test_key();
        let nonce = [7u8; NONCE_LENGTH];

        let (ciphertext, tag) = seal(b"attack at dawn", &key, &nonce).unwrap();
        assert_eq!(tag.len(), TAG_LENGTH);
        assert_ne!(ciphertext, b"attack at dawn");

        let plaintext = open(&ciphertext, &key, &nonce, &tag).unwrap();
        assert_eq!(plaintext, b"attack at dawn");
    }

    #[test]
    fn wrong_key_fails_closed() {
        let key = test_key();
        let mut other = test_key();
        other[0] = 255;
        let nonce = [7u8; NONCE_LENGTH];

        let (ciphertext, tag) = seal(b"secret", &key, &nonce).unwrap();
        assert_eq!(
            open(&ciphertext, &other, &nonce, &tag),
            Err(CryptoError::InvalidPassword)
        );
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = test_key();
        let nonce = [7u8; NONCE_LENGTH];

        let (mut ciphertext, tag) = seal(b"secret", &key, &nonce).unwrap();
        ciphertext[0] ^= 0x01;
        assert_eq!(
            open(&ciphertext, &key, &nonce, &tag),
            Err(CryptoError::InvalidPassword)
        );
    }

    #[test]
    fn tampered_tag_fails() {
        let key = test_key();
        let nonce = [7u8; NONCE_LENGTH];

        let (ciphertext, mut tag) = seal(b"secret", &key, &nonce).unwrap();
        tag[0] ^= 0x01;
        assert_eq!(
            open(&ciphertext, &key, &nonce, &tag),
            Err(CryptoError::InvalidPassword)
        );
    }

    #[test]
    fn malformed_lengths_fail_like_a_wrong_key() {
        let key = test_key();
        let nonce = [7u8; NONCE_LENGTH];
        let (ciphertext, tag) = seal(b"secret", &key, &nonce).unwrap();

        assert_eq!(
            open(&ciphertext, &key, &nonce[..4], &tag),
            Err(CryptoError::InvalidPassword)
        );
        assert_eq!(
            open(&ciphertext, &key, &nonce, &tag[..8]),
            Err(CryptoError::InvalidPassword)
        );
    }
}
