// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base64 helpers for the string surfaces of the crate.
//!
//! Binary values leaving the crate (ciphertexts, signatures, secrets inside serialized session
//! state) travel as base64 strings with the standard alphabet and padding.
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// Encodes bytes as a base64 string.
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes a base64 string into bytes.
pub fn from_base64(value: &str) -> Result<Vec<u8>, EncodingError> {
    Ok(STANDARD.decode(value)?)
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),

    #[error("decrypted payload is not valid utf-8")]
    InvalidUtf8,

    #[error("encrypted payload contains no chunks")]
    EmptyChunkList,
}

/// Serde adapter serializing byte fields as base64 strings.
///
/// Used with `#[serde(with = "crate::encoding::serde_base64")]` on `Vec<u8>` and `[u8; N]`
/// fields.
pub mod serde_base64 {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Engine, STANDARD};

    pub fn serialize<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: AsRef<[u8]> + ?Sized,
    {
        serializer.serialize_str(&STANDARD.encode(value.as_ref()))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<Vec<u8>>,
    {
        let value = String::deserialize(deserializer)?;
        let bytes = STANDARD.decode(&value).map_err(serde::de::Error::custom)?;
        T::try_from(bytes).map_err(|_| serde::de::Error::custom("unexpected number of bytes"))
    }
}
