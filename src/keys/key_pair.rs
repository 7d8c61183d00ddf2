// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation of identity, signed pre-key and one-time pre-key pairs.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{Rng, RngError};
use crate::keys::pem::{KeyFormatError, PrivateKey, PublicKey, X25519_KEY_SIZE};
use crate::keys::prekey::{
    OneTimePreKey, OneTimePreKeyId, PreKeyId, SignatureError, SignedPreKey, sign_prekey,
};

/// Pair of matching public and private key, both PEM-encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    public_key: PublicKey,
    private_key: PrivateKey,
}

impl KeyPair {
    pub fn new(public_key: PublicKey, private_key: PrivateKey) -> Self {
        Self {
            public_key,
            private_key,
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}

/// Factory for fresh asymmetric key material.
///
/// All methods are pure functions over the given random number generator. Persisting the
/// returned key pairs, including removing one-time pre-keys once they were handed out, is the
/// caller's responsibility.
#[derive(Clone, Debug)]
pub struct KeyPairFactory;

impl KeyPairFactory {
    /// Generates a long-lived X25519 identity key pair.
    pub fn generate_identity_key_pair(rng: &Rng) -> Result<KeyPair, KeyGenError> {
        generate_x25519_pair(rng)
    }

    /// Generates a fresh pre-key pair and signs its raw public key with the given identity
    /// private key.
    ///
    /// RSA identity keys produce an RSA-PSS (SHA-256) signature. X25519 identity keys can not
    /// sign and fall back to an HMAC-SHA256 tag keyed with the encoded private key, see
    /// [`crate::keys::prekey::PreKeySignature`] for the implications.
    pub fn generate_signed_pre_key(
        identity_private_key: &PrivateKey,
        key_id: PreKeyId,
        rng: &Rng,
    ) -> Result<SignedPreKey, KeyGenError> {
        let key_pair = generate_x25519_pair(rng)?;
        let signature = sign_prekey(key_pair.public_key(), identity_private_key, rng)?;
        Ok(SignedPreKey::new(key_id, key_pair, signature))
    }

    /// Generates a pre-key pair meant to be consumed by exactly one handshake.
    pub fn generate_one_time_pre_key(
        key_id: OneTimePreKeyId,
        rng: &Rng,
    ) -> Result<OneTimePreKey, KeyGenError> {
        Ok(OneTimePreKey::new(key_id, generate_x25519_pair(rng)?))
    }
}

fn generate_x25519_pair(rng: &Rng) -> Result<KeyPair, KeyGenError> {
    let secret = x25519_dalek::StaticSecret::from(rng.random_array::<X25519_KEY_SIZE>()?);
    let private_key = PrivateKey::from_x25519(&secret)?;
    let public_key = PublicKey::from_x25519(&x25519_dalek::PublicKey::from(&secret))?;
    Ok(KeyPair::new(public_key, private_key))
}

#[derive(Debug, Error)]
pub enum KeyGenError {
    #[error(transparent)]
    Rng(#[from] RngError),

    #[error(transparent)]
    KeyFormat(#[from] KeyFormatError),

    #[error(transparent)]
    Signature(#[from] SignatureError),
}

#[cfg(test)]
mod tests {
    use crate::crypto::Rng;
    use crate::keys::pem::KeyAlgorithm;
    use crate::keys::prekey::PreKeySignature;
    use crate::test_utils::rsa_key_pair;

    use super::KeyPairFactory;

    #[test]
    fn fresh_identity_key_pairs() {
        let rng = Rng::from_seed([1; 32]);

        let key_pair_1 = KeyPairFactory::generate_identity_key_pair(&rng).unwrap();
        let key_pair_2 = KeyPairFactory::generate_identity_key_pair(&rng).unwrap();

        assert_eq!(key_pair_1.public_key().algorithm(), KeyAlgorithm::X25519);

        // Every call yields fresh key material.
        assert_ne!(key_pair_1.public_key(), key_pair_2.public_key());
        assert_ne!(key_pair_1.private_key(), key_pair_2.private_key());

        // Public half matches the private half.
        assert_eq!(
            &key_pair_1.private_key().public_key().unwrap(),
            key_pair_1.public_key()
        );
    }

    #[test]
    fn signed_prekeys_with_x25519_identity() {
        let rng = Rng::from_seed([2; 32]);
        let identity = KeyPairFactory::generate_identity_key_pair(&rng).unwrap();

        let prekey =
            KeyPairFactory::generate_signed_pre_key(identity.private_key(), 1, &rng).unwrap();
        assert_eq!(prekey.key_id(), 1);
        assert_eq!(prekey.public_key().algorithm(), KeyAlgorithm::X25519);

        // Curve identities can not produce a real signature and fall back to a keyed tag.
        assert!(matches!(
            prekey.signature(),
            PreKeySignature::HmacFallback(_)
        ));
    }

    #[test]
    fn signed_prekeys_with_rsa_identity() {
        let rng = Rng::from_seed([3; 32]);
        let identity = rsa_key_pair();

        let prekey =
            KeyPairFactory::generate_signed_pre_key(identity.private_key(), 7, &rng).unwrap();

        assert_eq!(prekey.key_id(), 7);
        assert!(matches!(prekey.signature(), PreKeySignature::Pss(_)));
        assert!(prekey.verify(identity.public_key()).is_ok());
    }

    #[test]
    fn one_time_prekeys_are_unique() {
        let rng = Rng::from_seed([4; 32]);

        let prekey_1 = KeyPairFactory::generate_one_time_pre_key(0, &rng).unwrap();
        let prekey_2 = KeyPairFactory::generate_one_time_pre_key(1, &rng).unwrap();

        assert_ne!(prekey_1.public_key(), prekey_2.public_key());
        assert_ne!(prekey_1.key_id(), prekey_2.key_id());
    }
}
