// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-checkable fingerprints ("security codes") over two identity keys.
use serde::Serialize;
use thiserror::Error;

use crate::crypto::sha2::sha2_256;
use crate::encoding::to_base64;
use crate::keys::PublicKey;

/// Number of digits in a security code.
pub const SECURITY_CODE_DIGITS: usize = 60;

/// Digits per displayed group.
const GROUP_SIZE: usize = 5;

/// Hash bytes feeding the code, two digits per byte.
const FINGERPRINT_SIZE: usize = 30;

const QR_PAYLOAD_TYPE: &str = "contact_verification";

const QR_PAYLOAD_VERSION: u32 = 1;

/// Derives verification material two contacts compare out-of-band to detect an interposed
/// key.
///
/// Both operations are deterministic. The security code is additionally independent of
/// argument order, both parties compute the identical code without coordinating who goes
/// first.
#[derive(Clone, Debug)]
pub struct VerificationCodeGenerator;

impl VerificationCodeGenerator {
    /// Derives the 60-digit security code for two identity keys, grouped in blocks of five
    /// digits for display.
    ///
    /// The keys are ordered by their encoded form before hashing, swapping the arguments
    /// yields the same code.
    pub fn security_code(key_a: &PublicKey, key_b: &PublicKey) -> String {
        let (first, second) = order_keys(key_a, key_b);
        let digest = sha2_256(&[first.as_pem().as_bytes(), second.as_pem().as_bytes()]);

        let mut digits = String::with_capacity(SECURITY_CODE_DIGITS);
        for byte in &digest[..FINGERPRINT_SIZE] {
            digits.push_str(&format!("{:02}", byte % 100));
        }

        let mut code =
            String::with_capacity(SECURITY_CODE_DIGITS + SECURITY_CODE_DIGITS / GROUP_SIZE);
        for (index, digit) in digits.chars().enumerate() {
            if index > 0 && index % GROUP_SIZE == 0 {
                code.push(' ');
            }
            code.push(digit);
        }
        code
    }

    /// Derives a payload for QR display over both keys, embedding their security code. The
    /// payload is serialized as JSON and base64-encoded.
    ///
    /// Unlike the security code the payload keeps the keys in argument order, scanners can
    /// tell "our" key from "their" key.
    pub fn qr_payload(key_a: &PublicKey, key_b: &PublicKey) -> Result<String, VerificationError> {
        let payload = QrPayload {
            payload_type: QR_PAYLOAD_TYPE,
            version: QR_PAYLOAD_VERSION,
            key_a: key_a.as_pem(),
            key_b: key_b.as_pem(),
            security_code: &Self::security_code(key_a, key_b),
        };
        Ok(to_base64(&serde_json::to_vec(&payload)?))
    }
}

/// Orders two keys by their encoded form, smaller first.
fn order_keys<'a>(key_a: &'a PublicKey, key_b: &'a PublicKey) -> (&'a PublicKey, &'a PublicKey) {
    if key_a.as_pem() <= key_b.as_pem() {
        (key_a, key_b)
    } else {
        (key_b, key_a)
    }
}

#[derive(Serialize)]
struct QrPayload<'a> {
    #[serde(rename = "type")]
    payload_type: &'a str,
    version: u32,
    key_a: &'a str,
    key_b: &'a str,
    security_code: &'a str,
}

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("qr payload could not be serialized: {0}")]
    Json(#[from] serde_json::Error),
}
