// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared helpers for tests.
use std::sync::OnceLock;

use crate::crypto::Rng;
use crate::keys::KeyPair;
use crate::legacy::LegacyCipher;

/// RSA-2048 key pair shared across tests, generating one is expensive.
pub fn rsa_key_pair() -> &'static KeyPair {
    static KEY_PAIR: OnceLock<KeyPair> = OnceLock::new();
    KEY_PAIR.get_or_init(|| {
        let rng = Rng::from_seed([99; 32]);
        LegacyCipher::generate_key_pair(&rng).expect("rsa key generation")
    })
}
