// SPDX-License-Identifier: MIT OR Apache-2.0

//! HKDF-SHA256 key derivation (extract-and-expand).
use hkdf::Hkdf;
use sha2::Sha256;
use thiserror::Error;

/// Derives `okm.len()` bytes of fresh key material from the given input key material.
///
/// A missing salt is treated like a salt of hash-length zero bytes, following RFC 5869.
pub fn hkdf_sha256(
    salt: Option<&[u8]>,
    input_key_material: &[u8],
    info: &[u8],
    okm: &mut [u8],
) -> Result<(), HkdfError> {
    Hkdf::<Sha256>::new(salt, input_key_material)
        .expand(info, okm)
        .map_err(|_| HkdfError::InvalidLength)
}

#[derive(Debug, Error)]
pub enum HkdfError {
    #[error("requested invalid number of output bytes from hkdf")]
    InvalidLength,
}
