// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chunked RSA-OAEP encryption for contacts without an established session.
//!
//! Messages are split into chunks below the RSA-2048 OAEP ceiling, every chunk is encrypted on
//! its own and the base64-encoded chunks are joined with a `|` delimiter. There is no
//! ratcheting and no forward secrecy on this path, a leaked private key reveals every message
//! ever encrypted towards it.
use rsa::{Oaep, RsaPrivateKey};
use sha2::Sha256;
use thiserror::Error;

use crate::crypto::{Rng, RngError};
use crate::encoding::{EncodingError, from_base64, to_base64};
use crate::keys::{KeyFormatError, KeyPair, PrivateKey, PublicKey};

/// Modulus size of generated legacy key pairs.
pub const RSA_KEY_BITS: usize = 2048;

/// Most plaintext bytes fitting into one RSA-2048 OAEP-SHA256 chunk, the modulus size minus
/// twice the digest size minus two.
const MAX_CHUNK_SIZE: usize = 190;

const CHUNK_DELIMITER: &str = "|";

/// Plain public-key encryption used where no ratcheting session exists.
#[derive(Clone, Debug)]
pub struct LegacyCipher;

impl LegacyCipher {
    /// Generates an RSA-2048 key pair for the legacy path.
    pub fn generate_key_pair(rng: &Rng) -> Result<KeyPair, LegacyCipherError> {
        let mut rng_inner = rng.inner()?;
        let private = RsaPrivateKey::new(&mut *rng_inner, RSA_KEY_BITS)
            .map_err(LegacyCipherError::KeyGeneration)?;
        drop(rng_inner);

        Ok(KeyPair::new(
            PublicKey::from_rsa(&private.to_public_key())?,
            PrivateKey::from_rsa(&private)?,
        ))
    }

    /// Encrypts a message towards the given RSA public key.
    pub fn encrypt(
        message: &str,
        public_key: &PublicKey,
        rng: &Rng,
    ) -> Result<String, LegacyCipherError> {
        let rsa_public = public_key.to_rsa()?;
        let bytes = message.as_bytes();
        let mut rng_inner = rng.inner()?;

        // An empty message still produces one (empty) chunk so it survives the round trip.
        let chunks: Vec<&[u8]> = if bytes.is_empty() {
            vec![&[]]
        } else {
            bytes.chunks(MAX_CHUNK_SIZE).collect()
        };

        let mut encrypted_chunks = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let ciphertext = rsa_public
                .encrypt(&mut *rng_inner, Oaep::new::<Sha256>(), chunk)
                .map_err(LegacyCipherError::ChunkEncryption)?;
            encrypted_chunks.push(to_base64(&ciphertext));
        }

        Ok(encrypted_chunks.join(CHUNK_DELIMITER))
    }

    /// Decrypts a pipe-delimited legacy payload.
    ///
    /// The whole message fails when any single chunk fails, there is no partial recovery.
    pub fn decrypt(blob: &str, private_key: &PrivateKey) -> Result<String, LegacyCipherError> {
        let rsa_private = private_key.to_rsa()?;

        if blob.is_empty() {
            return Err(EncodingError::EmptyChunkList.into());
        }

        let mut plaintext = Vec::new();
        for (index, chunk) in blob.split(CHUNK_DELIMITER).enumerate() {
            let ciphertext = from_base64(chunk)?;
            let decrypted = rsa_private
                .decrypt(Oaep::new::<Sha256>(), &ciphertext)
                .map_err(|_| DecryptionError::OaepChunk(index))?;
            plaintext.extend_from_slice(&decrypted);
        }

        String::from_utf8(plaintext).map_err(|_| EncodingError::InvalidUtf8.into())
    }
}

/// Authentication or unpadding failure while decrypting.
#[derive(Debug, Error)]
pub enum DecryptionError {
    #[error("rsa-oaep unpadding failed for chunk {0}")]
    OaepChunk(usize),
}

#[derive(Debug, Error)]
pub enum LegacyCipherError {
    #[error(transparent)]
    Rng(#[from] RngError),

    #[error(transparent)]
    KeyFormat(#[from] KeyFormatError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    #[error("rsa key generation failed: {0}")]
    KeyGeneration(rsa::Error),

    #[error("rsa-oaep encryption failed: {0}")]
    ChunkEncryption(rsa::Error),
}

#[cfg(test)]
mod tests {
    use crate::crypto::Rng;
    use crate::encoding::{EncodingError, from_base64};
    use crate::keys::KeyAlgorithm;
    use crate::test_utils::rsa_key_pair;

    use super::{DecryptionError, LegacyCipher, LegacyCipherError};

    #[test]
    fn generated_key_pairs_are_rsa() {
        let key_pair = rsa_key_pair();
        assert_eq!(key_pair.public_key().algorithm(), KeyAlgorithm::Rsa);
        assert_eq!(key_pair.private_key().algorithm(), KeyAlgorithm::Rsa);
        assert!(
            key_pair
                .public_key()
                .as_pem()
                .starts_with("-----BEGIN PUBLIC KEY-----")
        );
    }

    #[test]
    fn chunked_round_trips() {
        let rng = Rng::from_seed([1; 32]);
        let key_pair = rsa_key_pair();

        // Boundary sizes around the single-chunk ceiling plus a large multi-chunk message.
        for len in [0, 189, 190, 191, 244, 245, 246, 10_000] {
            let message = "x".repeat(len);
            let blob = LegacyCipher::encrypt(&message, key_pair.public_key(), &rng).unwrap();
            let decrypted = LegacyCipher::decrypt(&blob, key_pair.private_key()).unwrap();
            assert_eq!(decrypted, message);
        }
    }

    #[test]
    fn unicode_messages() {
        let rng = Rng::from_seed([2; 32]);
        let key_pair = rsa_key_pair();

        let message = "grüße aus köln 👋";
        let blob = LegacyCipher::encrypt(message, key_pair.public_key(), &rng).unwrap();
        assert_eq!(
            LegacyCipher::decrypt(&blob, key_pair.private_key()).unwrap(),
            message
        );
    }

    #[test]
    fn wire_format_is_pipe_delimited_base64() {
        let rng = Rng::from_seed([3; 32]);
        let key_pair = rsa_key_pair();

        // 400 bytes span three chunks.
        let message = "a".repeat(400);
        let blob = LegacyCipher::encrypt(&message, key_pair.public_key(), &rng).unwrap();

        let chunks: Vec<&str> = blob.split('|').collect();
        assert_eq!(chunks.len(), 3);
        for chunk in chunks {
            // 256 ciphertext bytes per chunk, base64-encoded.
            assert_eq!(from_base64(chunk).unwrap().len(), 256);
        }
    }

    #[test]
    fn rejects_malformed_payloads() {
        let key_pair = rsa_key_pair();

        // Empty blobs carry no chunks.
        assert!(matches!(
            LegacyCipher::decrypt("", key_pair.private_key()),
            Err(LegacyCipherError::Encoding(EncodingError::EmptyChunkList))
        ));

        // Broken base64.
        assert!(matches!(
            LegacyCipher::decrypt("???", key_pair.private_key()),
            Err(LegacyCipherError::Encoding(EncodingError::Base64(_)))
        ));

        // Valid base64 which is no valid ciphertext.
        assert!(matches!(
            LegacyCipher::decrypt("AAAA", key_pair.private_key()),
            Err(LegacyCipherError::Decryption(DecryptionError::OaepChunk(0)))
        ));
    }

    #[test]
    fn tampered_chunks_fail_the_whole_message() {
        let rng = Rng::from_seed([4; 32]);
        let key_pair = rsa_key_pair();

        let message = "b".repeat(400);
        let blob = LegacyCipher::encrypt(&message, key_pair.public_key(), &rng).unwrap();

        // Corrupt the middle chunk.
        let mut chunks: Vec<String> = blob.split('|').map(str::to_string).collect();
        let replacement = if chunks[1].starts_with('A') { "B" } else { "A" };
        chunks[1].replace_range(0..1, replacement);
        let tampered = chunks.join("|");

        assert!(matches!(
            LegacyCipher::decrypt(&tampered, key_pair.private_key()),
            Err(LegacyCipherError::Decryption(DecryptionError::OaepChunk(1)))
        ));
    }
}
