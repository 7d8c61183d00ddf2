// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authenticated encryption with associated data (AES-256-GCM).
use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use thiserror::Error;

pub const AEAD_KEY_SIZE: usize = 32;

pub const AEAD_NONCE_SIZE: usize = 12;

/// Encrypts plaintext and authenticates the associated data alongside it.
pub fn aead_encrypt(
    key: &[u8; AEAD_KEY_SIZE],
    nonce: &[u8; AEAD_NONCE_SIZE],
    plaintext: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>, AeadError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| AeadError::InvalidKeySize)?;
    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad: associated_data,
            },
        )
        .map_err(|_| AeadError::EncryptionFailed)
}

/// Decrypts ciphertext, verifying the authentication tag over both the ciphertext and the
/// associated data.
pub fn aead_decrypt(
    key: &[u8; AEAD_KEY_SIZE],
    nonce: &[u8; AEAD_NONCE_SIZE],
    ciphertext: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>, AeadError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| AeadError::InvalidKeySize)?;
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: associated_data,
            },
        )
        .map_err(|_| AeadError::DecryptionFailed)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AeadError {
    #[error("invalid aead key size")]
    InvalidKeySize,

    #[error("aead encryption failed")]
    EncryptionFailed,

    #[error("ciphertext or associated data did not authenticate")]
    DecryptionFailed,
}

#[cfg(test)]
mod tests {
    use super::{AeadError, aead_decrypt, aead_encrypt};

    #[test]
    fn round_trip_with_associated_data() {
        let key = [7u8; 32];
        let nonce = [3u8; 12];

        let ciphertext = aead_encrypt(&key, &nonce, b"secret", b"metadata").unwrap();
        let plaintext = aead_decrypt(&key, &nonce, &ciphertext, b"metadata").unwrap();
        assert_eq!(plaintext, b"secret");
    }

    #[test]
    fn tampered_inputs_fail() {
        let key = [7u8; 32];
        let nonce = [3u8; 12];
        let ciphertext = aead_encrypt(&key, &nonce, b"secret", b"metadata").unwrap();

        // Flipped ciphertext bit.
        let mut tampered = ciphertext.clone();
        tampered[0] ^= 1;
        assert_eq!(
            aead_decrypt(&key, &nonce, &tampered, b"metadata"),
            Err(AeadError::DecryptionFailed)
        );

        // Changed associated data.
        assert_eq!(
            aead_decrypt(&key, &nonce, &ciphertext, b"other metadata"),
            Err(AeadError::DecryptionFailed)
        );
    }
}
