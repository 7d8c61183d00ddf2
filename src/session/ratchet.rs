// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ratcheting message encryption on top of an established session.
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

use crate::crypto::aead::{AEAD_KEY_SIZE, AEAD_NONCE_SIZE, AeadError, aead_decrypt, aead_encrypt};
use crate::crypto::hkdf::{HkdfError, hkdf_sha256};
use crate::crypto::hmac::hmac_sha256;
use crate::crypto::{Rng, RngError};
use crate::session::state::{SESSION_KEY_SIZE, SessionState};

/// Derivation label advancing a chain key by one message.
const CHAIN_KEY_LABEL: &[u8] = b"chain_key_update";

/// Derivation label producing the per-message key from the current chain key.
const MESSAGE_KEY_LABEL: &[u8] = b"message_key";

/// Derivation label rolling the reserve sending key forward.
const NEXT_KEY_LABEL: &[u8] = b"next_key_update";

/// Expansion label splitting a message key into AEAD nonce and key.
const MESSAGE_KEY_INFO: &[u8] = b"message key material";

/// Size of the random value attached to every envelope.
pub const EPHEMERAL_KEY_SIZE: usize = 32;

/// Encrypts and decrypts messages over a [`SessionState`], deriving a fresh key for every
/// message.
///
/// Per message the chain key is moved forward with a one-way HMAC step, so a compromised state
/// never reveals keys of messages processed before the compromise. Both methods take the
/// session by value and return the updated copy next to their output, mirroring the
/// handshake's state handling.
///
/// The receiving side replays the chain from its own stored counter, decryption is therefore
/// strictly in-order for one direction per session.
#[derive(Clone, Debug)]
pub struct RatchetCipher;

/// Encrypted message with everything the other party needs to decrypt it next to its session
/// id.
///
/// All fields serialize as base64 strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// AEAD ciphertext of the message body.
    #[serde(with = "crate::encoding::serde_base64")]
    ciphertext: Vec<u8>,

    /// Serialized [`Metadata`], authenticated as associated data.
    #[serde(with = "crate::encoding::serde_base64")]
    metadata: Vec<u8>,

    /// Fresh random value attached for traceability, not part of any key derivation.
    #[serde(with = "crate::encoding::serde_base64")]
    ephemeral_key: [u8; EPHEMERAL_KEY_SIZE],
}

impl EncryptedEnvelope {
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }

    pub fn ephemeral_key(&self) -> &[u8; EPHEMERAL_KEY_SIZE] {
        &self.ephemeral_key
    }

    /// Parses the metadata bytes carried by this envelope.
    pub fn parsed_metadata(&self) -> Result<Metadata, serde_json::Error> {
        serde_json::from_slice(&self.metadata)
    }
}

/// Plaintext message metadata, bound to the ciphertext through the AEAD associated data.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    message_number: u64,
    timestamp: u64,
}

impl Metadata {
    /// Position of the message in the sender's chain, starting at zero.
    pub fn message_number(&self) -> u64 {
        self.message_number
    }

    /// Seconds since the UNIX epoch at encryption time.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

impl RatchetCipher {
    /// Encrypts a message, ratcheting the session forward by one step.
    ///
    /// The returned state has to be persisted before encrypting or decrypting the next
    /// message, the consumed input state must never be used again.
    pub fn encrypt(
        y: SessionState,
        plaintext: &[u8],
        rng: &Rng,
    ) -> Result<(SessionState, EncryptedEnvelope), RatchetError> {
        let ephemeral_key: [u8; EPHEMERAL_KEY_SIZE] = rng.random_array()?;

        // One-way chain step. The message key comes from the pre-update chain key.
        let new_chain_key = hmac_sha256(y.chain_key().as_bytes(), &[CHAIN_KEY_LABEL]);
        let message_key = hmac_sha256(y.chain_key().as_bytes(), &[MESSAGE_KEY_LABEL]);
        let new_next_sending_key =
            hmac_sha256(y.next_sending_key().as_bytes(), &[NEXT_KEY_LABEL]);
        let new_root_key = hmac_sha256(y.root_key().as_bytes(), &[&new_chain_key]);

        let metadata = Metadata {
            message_number: y.message_number(),
            timestamp: unix_timestamp()?,
        };
        let metadata_bytes = serde_json::to_vec(&metadata)?;

        let (nonce, aead_key) = expand_message_key(&message_key)?;
        let ciphertext = aead_encrypt(&aead_key, &nonce, plaintext, &metadata_bytes)?;

        let y_i = y.advance(new_root_key, new_chain_key, new_next_sending_key);
        let envelope = EncryptedEnvelope {
            ciphertext,
            metadata: metadata_bytes,
            ephemeral_key,
        };

        Ok((y_i, envelope))
    }

    /// Decrypts an envelope, ratcheting the session forward on success.
    ///
    /// The message key is reached by replaying the chain from the stored chain key by the
    /// session's own message number. When the ciphertext or its metadata fail authentication
    /// the input state is handed back untouched along with no plaintext, a failed decryption
    /// never corrupts the session.
    pub fn decrypt(
        y: SessionState,
        envelope: &EncryptedEnvelope,
    ) -> Result<(SessionState, Option<Vec<u8>>), RatchetError> {
        // Replay the chain forward from the last persisted position.
        let mut chain_key = *y.chain_key().as_bytes();
        for _ in 0..y.message_number() {
            chain_key = hmac_sha256(&chain_key, &[CHAIN_KEY_LABEL]);
        }

        let message_key = hmac_sha256(&chain_key, &[MESSAGE_KEY_LABEL]);
        let new_chain_key = hmac_sha256(&chain_key, &[CHAIN_KEY_LABEL]);
        let new_next_sending_key =
            hmac_sha256(y.next_sending_key().as_bytes(), &[NEXT_KEY_LABEL]);
        let new_root_key = hmac_sha256(y.root_key().as_bytes(), &[&new_chain_key]);
        chain_key.zeroize();

        let (nonce, aead_key) = expand_message_key(&message_key)?;
        match aead_decrypt(&aead_key, &nonce, &envelope.ciphertext, &envelope.metadata) {
            Ok(plaintext) => {
                let y_i = y.advance(new_root_key, new_chain_key, new_next_sending_key);
                Ok((y_i, Some(plaintext)))
            }
            Err(AeadError::DecryptionFailed) => Ok((y, None)),
            Err(error) => Err(error.into()),
        }
    }
}

/// Splits a message key into the AEAD nonce and key.
fn expand_message_key(
    message_key: &[u8; SESSION_KEY_SIZE],
) -> Result<([u8; AEAD_NONCE_SIZE], [u8; AEAD_KEY_SIZE]), HkdfError> {
    let mut output = [0u8; AEAD_NONCE_SIZE + AEAD_KEY_SIZE];
    hkdf_sha256(None, message_key, MESSAGE_KEY_INFO, &mut output)?;

    let mut nonce = [0u8; AEAD_NONCE_SIZE];
    let mut key = [0u8; AEAD_KEY_SIZE];
    nonce.copy_from_slice(&output[..AEAD_NONCE_SIZE]);
    key.copy_from_slice(&output[AEAD_NONCE_SIZE..]);
    output.zeroize();

    Ok((nonce, key))
}

fn unix_timestamp() -> Result<u64, SystemTimeError> {
    let duration = SystemTime::now().duration_since(UNIX_EPOCH)?;
    Ok(duration.as_secs())
}

#[derive(Debug, Error)]
pub enum RatchetError {
    #[error(transparent)]
    Rng(#[from] RngError),

    #[error(transparent)]
    Hkdf(#[from] HkdfError),

    #[error(transparent)]
    Aead(#[from] AeadError),

    #[error("metadata could not be serialized: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error(transparent)]
    SystemTime(#[from] SystemTimeError),
}
