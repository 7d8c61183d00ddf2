// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key material handling: PEM codecs, key pair generation and pre-key signing.
mod key_pair;
mod pem;
mod prekey;

pub use key_pair::{KeyGenError, KeyPair, KeyPairFactory};
pub use pem::{KeyAlgorithm, KeyFormatError, PrivateKey, PublicKey};
pub use prekey::{
    OneTimePreKey, OneTimePreKeyId, PreKeyBundle, PreKeyId, PreKeySignature, SignatureError,
    SignedPreKey, sign_prekey, verify_prekey,
};
