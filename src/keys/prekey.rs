// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signed pre-keys, one-time pre-keys and the published bundle a peer uses to initiate a
//! handshake.
use rsa::pss::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::crypto::hmac::{HMAC_TAG_SIZE, hmac_sha256};
use crate::crypto::{Rng, RngError};
use crate::keys::key_pair::KeyPair;
use crate::keys::pem::{KeyAlgorithm, KeyFormatError, PrivateKey, PublicKey};

/// Identifier of a signed pre-key.
pub type PreKeyId = u64;

/// Identifier of a one-time pre-key.
pub type OneTimePreKeyId = u64;

/// Pre-key pair with a signature binding it to the owner's identity key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPreKey {
    key_id: PreKeyId,
    key_pair: KeyPair,
    signature: PreKeySignature,
}

impl SignedPreKey {
    pub fn new(key_id: PreKeyId, key_pair: KeyPair, signature: PreKeySignature) -> Self {
        Self {
            key_id,
            key_pair,
            signature,
        }
    }

    pub fn key_id(&self) -> PreKeyId {
        self.key_id
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn public_key(&self) -> &PublicKey {
        self.key_pair.public_key()
    }

    pub fn signature(&self) -> &PreKeySignature {
        &self.signature
    }

    /// Checks the signature against the claimed identity key.
    pub fn verify(&self, identity_public_key: &PublicKey) -> Result<(), SignatureError> {
        verify_prekey(self.public_key(), &self.signature, identity_public_key)
    }
}

/// Pre-key pair meant to be consumed by exactly _one_ handshake.
///
/// Single use is not enforced here, the store handing out these keys has to remove them once
/// used.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneTimePreKey {
    key_id: OneTimePreKeyId,
    key_pair: KeyPair,
}

impl OneTimePreKey {
    pub fn new(key_id: OneTimePreKeyId, key_pair: KeyPair) -> Self {
        Self { key_id, key_pair }
    }

    pub fn key_id(&self) -> OneTimePreKeyId {
        self.key_id
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn public_key(&self) -> &PublicKey {
        self.key_pair.public_key()
    }
}

/// Signature over the raw public bytes of a pre-key.
///
/// The scheme follows the owner's identity key: RSA identities sign with RSA-PSS (SHA-256),
/// X25519 identities fall back to an HMAC-SHA256 tag keyed with the PEM-encoded identity
/// private key. The fallback can only be recomputed by the key owner, for everybody else it is
/// an opaque value carrying no authenticity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreKeySignature {
    Pss(#[serde(with = "crate::encoding::serde_base64")] Vec<u8>),
    HmacFallback(#[serde(with = "crate::encoding::serde_base64")] [u8; HMAC_TAG_SIZE]),
}

/// Public pre-key material a peer publishes so others can initiate a handshake with them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreKeyBundle {
    identity_key: PublicKey,
    signed_prekey: PublicKey,
    prekey_signature: PreKeySignature,
    onetime_prekey: Option<(OneTimePreKeyId, PublicKey)>,
}

impl PreKeyBundle {
    pub fn new(
        identity_key: PublicKey,
        signed_prekey: &SignedPreKey,
        onetime_prekey: Option<&OneTimePreKey>,
    ) -> Self {
        Self {
            identity_key,
            signed_prekey: signed_prekey.public_key().clone(),
            prekey_signature: signed_prekey.signature().clone(),
            onetime_prekey: onetime_prekey
                .map(|prekey| (prekey.key_id(), prekey.public_key().clone())),
        }
    }

    pub fn identity_key(&self) -> &PublicKey {
        &self.identity_key
    }

    pub fn signed_prekey(&self) -> &PublicKey {
        &self.signed_prekey
    }

    pub fn prekey_signature(&self) -> &PreKeySignature {
        &self.prekey_signature
    }

    pub fn onetime_prekey(&self) -> Option<&PublicKey> {
        self.onetime_prekey.as_ref().map(|(_, key)| key)
    }

    pub fn onetime_prekey_id(&self) -> Option<OneTimePreKeyId> {
        self.onetime_prekey.as_ref().map(|(id, _)| *id)
    }

    /// Checks that the signed pre-key is bound to the bundle's identity key before trusting
    /// it.
    pub fn verify(&self) -> Result<(), SignatureError> {
        verify_prekey(
            &self.signed_prekey,
            &self.prekey_signature,
            &self.identity_key,
        )
    }
}

/// Signs the raw public bytes of a pre-key with the given identity key.
pub fn sign_prekey(
    prekey: &PublicKey,
    identity_private_key: &PrivateKey,
    rng: &Rng,
) -> Result<PreKeySignature, SignatureError> {
    let prekey_bytes = prekey.to_x25519()?.to_bytes();

    match identity_private_key.algorithm() {
        KeyAlgorithm::Rsa => {
            let signing_key = SigningKey::<Sha256>::new(identity_private_key.to_rsa()?);
            let mut rng_inner = rng.inner()?;
            let signature = signing_key.try_sign_with_rng(&mut *rng_inner, &prekey_bytes)?;
            Ok(PreKeySignature::Pss(signature.to_vec()))
        }
        KeyAlgorithm::X25519 => {
            let tag = hmac_sha256(identity_private_key.as_pem().as_bytes(), &[&prekey_bytes]);
            Ok(PreKeySignature::HmacFallback(tag))
        }
    }
}

/// Verifies a pre-key signature against the claimed identity key.
///
/// HMAC fallback tags can not be checked with public material and are rejected with
/// [`SignatureError::UnverifiableFallback`], callers have to decide how much trust to put into
/// such a bundle.
pub fn verify_prekey(
    prekey: &PublicKey,
    signature: &PreKeySignature,
    identity_public_key: &PublicKey,
) -> Result<(), SignatureError> {
    match signature {
        PreKeySignature::Pss(bytes) => {
            let prekey_bytes = prekey.to_x25519()?.to_bytes();
            let verifying_key = VerifyingKey::<Sha256>::new(identity_public_key.to_rsa()?);
            let signature = Signature::try_from(bytes.as_slice())?;
            verifying_key.verify(&prekey_bytes, &signature)?;
            Ok(())
        }
        PreKeySignature::HmacFallback(_) => Err(SignatureError::UnverifiableFallback),
    }
}

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error(transparent)]
    Rng(#[from] RngError),

    #[error(transparent)]
    KeyFormat(#[from] KeyFormatError),

    #[error("pss signature operation failed: {0}")]
    Pss(#[from] rsa::signature::Error),

    #[error("hmac fallback tags can not be verified with public key material")]
    UnverifiableFallback,
}

#[cfg(test)]
mod tests {
    use crate::crypto::Rng;
    use crate::keys::key_pair::KeyPairFactory;
    use crate::test_utils::rsa_key_pair;

    use super::{PreKeyBundle, PreKeySignature, SignatureError, sign_prekey, verify_prekey};

    #[test]
    fn pss_signatures_verify() {
        let rng = Rng::from_seed([1; 32]);
        let identity = rsa_key_pair();

        let prekey =
            KeyPairFactory::generate_signed_pre_key(identity.private_key(), 1, &rng).unwrap();
        assert!(prekey.verify(identity.public_key()).is_ok());

        // A tampered signature is rejected.
        let PreKeySignature::Pss(bytes) = prekey.signature() else {
            panic!("rsa identities produce pss signatures");
        };
        let mut tampered = bytes.clone();
        tampered[0] ^= 1;
        assert!(matches!(
            verify_prekey(
                prekey.public_key(),
                &PreKeySignature::Pss(tampered),
                identity.public_key()
            ),
            Err(SignatureError::Pss(_))
        ));

        // The signature does not transfer to a different pre-key.
        let other =
            KeyPairFactory::generate_signed_pre_key(identity.private_key(), 2, &rng).unwrap();
        assert!(
            verify_prekey(
                other.public_key(),
                prekey.signature(),
                identity.public_key()
            )
            .is_err()
        );
    }

    #[test]
    fn fallback_tags_are_unverifiable() {
        let rng = Rng::from_seed([3; 32]);
        let identity = KeyPairFactory::generate_identity_key_pair(&rng).unwrap();
        let prekey =
            KeyPairFactory::generate_signed_pre_key(identity.private_key(), 1, &rng).unwrap();

        assert!(matches!(
            prekey.verify(identity.public_key()),
            Err(SignatureError::UnverifiableFallback)
        ));

        // The owner can recompute the tag deterministically.
        let again = sign_prekey(prekey.public_key(), identity.private_key(), &rng).unwrap();
        assert_eq!(&again, prekey.signature());
    }

    #[test]
    fn bundles_carry_the_public_halves() {
        let rng = Rng::from_seed([4; 32]);
        let identity = KeyPairFactory::generate_identity_key_pair(&rng).unwrap();
        let prekey =
            KeyPairFactory::generate_signed_pre_key(identity.private_key(), 1, &rng).unwrap();
        let onetime = KeyPairFactory::generate_one_time_pre_key(9, &rng).unwrap();

        let bundle = PreKeyBundle::new(identity.public_key().clone(), &prekey, Some(&onetime));
        assert_eq!(bundle.identity_key(), identity.public_key());
        assert_eq!(bundle.signed_prekey(), prekey.public_key());
        assert_eq!(bundle.prekey_signature(), prekey.signature());
        assert_eq!(bundle.onetime_prekey(), Some(onetime.public_key()));
        assert_eq!(bundle.onetime_prekey_id(), Some(9));

        // Serialized bundles survive the round trip.
        let json = serde_json::to_string(&bundle).unwrap();
        assert_eq!(serde_json::from_str::<PreKeyBundle>(&json).unwrap(), bundle);
    }

    #[test]
    fn bundle_verification() {
        let rng = Rng::from_seed([5; 32]);
        let identity = rsa_key_pair();
        let prekey =
            KeyPairFactory::generate_signed_pre_key(identity.private_key(), 3, &rng).unwrap();

        let bundle = PreKeyBundle::new(identity.public_key().clone(), &prekey, None);
        assert!(bundle.verify().is_ok());
    }
}
