// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cryptographic primitives: randomness, hashing, key derivation and authenticated encryption.
pub mod aead;
pub mod hkdf;
pub mod hmac;
mod rng;
mod secret;
pub mod sha2;

pub use rng::{Rng, RngError};
pub use secret::Secret;
