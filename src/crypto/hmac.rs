// SPDX-License-Identifier: MIT OR Apache-2.0

//! HMAC-SHA256 message authentication, used as the one-way step of all key chains.
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const HMAC_TAG_SIZE: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 function over the concatenation of all given messages.
pub fn hmac_sha256(key: &[u8], messages: &[&[u8]]) -> [u8; HMAC_TAG_SIZE] {
    let mut mac = HmacSha256::new_from_slice(key).expect("hmac accepts keys of any size");
    for message in messages {
        mac.update(message);
    }
    mac.finalize().into_bytes().into()
}
