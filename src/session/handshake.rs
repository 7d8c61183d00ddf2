// SPDX-License-Identifier: MIT OR Apache-2.0

//! X3DH-style key agreement establishing a fresh encryption session between two parties.
use serde::{Deserialize, Serialize};
use thiserror::Error;
use x25519_dalek::SharedSecret;
use zeroize::Zeroize;

use crate::crypto::hkdf::{HkdfError, hkdf_sha256};
use crate::crypto::{Rng, RngError, Secret};
use crate::encoding::to_base64;
use crate::keys::{KeyFormatError, KeyPair, OneTimePreKeyId, PreKeyBundle, PublicKey};
use crate::session::state::{SESSION_KEY_SIZE, SessionState};

/// Application string separating this protocol's key derivation from other HKDF uses.
const PROTOCOL_INFO: &[u8] = b"WhatsApp-like Signal Protocol";

/// Number of random characters in a session id before encoding.
const SESSION_ID_LENGTH: usize = 32;

/// Derived bytes, split into root, chain and next-sending key.
const SESSION_SECRETS_SIZE: usize = 3 * SESSION_KEY_SIZE;

/// Establishes sessions from identity, signed pre-key and ephemeral key material.
///
/// The initiating party calls [`HandshakeEngine::initiate`] with the peer's published
/// [`PreKeyBundle`] and sends the returned [`HandshakeMessage`] along. The peer derives the
/// matching session with [`HandshakeEngine::respond`]. Both sides end up with identical root,
/// chain and next-sending keys under the same session id.
///
/// Four Diffie-Hellman agreements bind the session to both identities and the initiator's
/// fresh ephemeral key:
///
/// ```text
/// DH1 = DH(initiator identity,        responder signed pre-key)
/// DH2 = DH(initiator signed pre-key,  responder identity)
/// DH3 = DH(initiator ephemeral,       responder signed pre-key)
/// DH4 = DH(initiator ephemeral,       responder one-time pre-key)   if one was published
/// ```
///
/// The concatenated secrets are stretched with HKDF-SHA256 into the three session keys.
///
/// Neither method checks the pre-key signature, callers wanting an authenticated bundle run
/// [`PreKeyBundle::verify`] first.
#[derive(Clone, Debug)]
pub struct HandshakeEngine;

/// First message of a handshake, transporting the initiator's ephemeral public key and the
/// session id to the responding party.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeMessage {
    session_id: String,
    ephemeral_key: PublicKey,
    onetime_prekey_id: Option<OneTimePreKeyId>,
}

impl HandshakeMessage {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn ephemeral_key(&self) -> &PublicKey {
        &self.ephemeral_key
    }

    pub fn onetime_prekey_id(&self) -> Option<OneTimePreKeyId> {
        self.onetime_prekey_id
    }
}

impl HandshakeEngine {
    /// Establishes a new session towards the owner of the given pre-key bundle.
    ///
    /// Generates an ephemeral key pair which only lives for this handshake. Returns the
    /// initial session state along with the handshake message for the peer. The bundle's
    /// one-time pre-key is consumed, the caller has to make sure it is never handed out again.
    pub fn initiate(
        local_identity: &KeyPair,
        local_signed_prekey: &KeyPair,
        remote_bundle: &PreKeyBundle,
        rng: &Rng,
    ) -> Result<(SessionState, HandshakeMessage), HandshakeError> {
        let ephemeral_secret = x25519_dalek::StaticSecret::from(rng.random_array::<32>()?);
        let ephemeral_public = x25519_dalek::PublicKey::from(&ephemeral_secret);

        let identity_secret = local_identity.private_key().to_x25519()?;
        let prekey_secret = local_signed_prekey.private_key().to_x25519()?;
        let remote_identity = remote_bundle.identity_key().to_x25519()?;
        let remote_prekey = remote_bundle.signed_prekey().to_x25519()?;

        let dh1 = identity_secret.diffie_hellman(&remote_prekey);
        let dh2 = prekey_secret.diffie_hellman(&remote_identity);
        let dh3 = ephemeral_secret.diffie_hellman(&remote_prekey);
        let dh4 = match remote_bundle.onetime_prekey() {
            Some(onetime_prekey) => {
                Some(ephemeral_secret.diffie_hellman(&onetime_prekey.to_x25519()?))
            }
            None => None,
        };

        let secrets = derive_session_secrets(&dh1, &dh2, &dh3, dh4.as_ref())?;
        let session_id = generate_session_id(rng)?;
        let message = HandshakeMessage {
            session_id: session_id.clone(),
            ephemeral_key: PublicKey::from_x25519(&ephemeral_public)?,
            onetime_prekey_id: remote_bundle.onetime_prekey_id(),
        };

        Ok((build_session(session_id, secrets), message))
    }

    /// Accepts a handshake and derives the session matching the initiator's.
    ///
    /// The four agreements are mirrored with the local secret keys so both parties converge on
    /// identical key material. A handshake message referencing a one-time pre-key requires the
    /// matching key pair, it counts as consumed afterwards.
    pub fn respond(
        local_identity: &KeyPair,
        local_signed_prekey: &KeyPair,
        local_onetime_prekey: Option<&KeyPair>,
        remote_identity_key: &PublicKey,
        remote_signed_prekey: &PublicKey,
        message: &HandshakeMessage,
    ) -> Result<SessionState, HandshakeError> {
        let identity_secret = local_identity.private_key().to_x25519()?;
        let prekey_secret = local_signed_prekey.private_key().to_x25519()?;
        let remote_identity = remote_identity_key.to_x25519()?;
        let remote_prekey = remote_signed_prekey.to_x25519()?;
        let remote_ephemeral = message.ephemeral_key.to_x25519()?;

        let dh1 = prekey_secret.diffie_hellman(&remote_identity);
        let dh2 = identity_secret.diffie_hellman(&remote_prekey);
        let dh3 = prekey_secret.diffie_hellman(&remote_ephemeral);
        let dh4 = match message.onetime_prekey_id {
            Some(id) => {
                let onetime_prekey =
                    local_onetime_prekey.ok_or(HandshakeError::MissingOneTimePreKey(id))?;
                Some(
                    onetime_prekey
                        .private_key()
                        .to_x25519()?
                        .diffie_hellman(&remote_ephemeral),
                )
            }
            None => None,
        };

        let secrets = derive_session_secrets(&dh1, &dh2, &dh3, dh4.as_ref())?;
        Ok(build_session(message.session_id.clone(), secrets))
    }
}

struct SessionSecrets {
    root_key: Secret<SESSION_KEY_SIZE>,
    chain_key: Secret<SESSION_KEY_SIZE>,
    next_sending_key: Secret<SESSION_KEY_SIZE>,
}

/// Stretches the agreed secrets into the three session keys.
fn derive_session_secrets(
    dh1: &SharedSecret,
    dh2: &SharedSecret,
    dh3: &SharedSecret,
    dh4: Option<&SharedSecret>,
) -> Result<SessionSecrets, HandshakeError> {
    let mut input = Vec::with_capacity(4 * SESSION_KEY_SIZE);
    input.extend_from_slice(dh1.as_bytes());
    input.extend_from_slice(dh2.as_bytes());
    input.extend_from_slice(dh3.as_bytes());
    if let Some(dh4) = dh4 {
        input.extend_from_slice(dh4.as_bytes());
    }

    let mut output = [0u8; SESSION_SECRETS_SIZE];
    let result = hkdf_sha256(None, &input, PROTOCOL_INFO, &mut output);
    input.zeroize();
    result?;

    let mut root_key = [0u8; SESSION_KEY_SIZE];
    let mut chain_key = [0u8; SESSION_KEY_SIZE];
    let mut next_sending_key = [0u8; SESSION_KEY_SIZE];
    root_key.copy_from_slice(&output[..SESSION_KEY_SIZE]);
    chain_key.copy_from_slice(&output[SESSION_KEY_SIZE..2 * SESSION_KEY_SIZE]);
    next_sending_key.copy_from_slice(&output[2 * SESSION_KEY_SIZE..]);
    output.zeroize();

    Ok(SessionSecrets {
        root_key: Secret::from_bytes(root_key),
        chain_key: Secret::from_bytes(chain_key),
        next_sending_key: Secret::from_bytes(next_sending_key),
    })
}

fn build_session(session_id: String, secrets: SessionSecrets) -> SessionState {
    SessionState::new(
        session_id,
        secrets.root_key,
        secrets.chain_key,
        secrets.next_sending_key,
    )
}

/// Random session token, base64-encoded for transport and storage.
fn generate_session_id(rng: &Rng) -> Result<String, RngError> {
    let token = rng.random_alphanumeric(SESSION_ID_LENGTH)?;
    Ok(to_base64(token.as_bytes()))
}

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error(transparent)]
    Rng(#[from] RngError),

    #[error(transparent)]
    KeyFormat(#[from] KeyFormatError),

    #[error(transparent)]
    Hkdf(#[from] HkdfError),

    #[error("handshake references one-time pre-key {0} but no matching key pair was supplied")]
    MissingOneTimePreKey(OneTimePreKeyId),
}
