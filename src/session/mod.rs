// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session establishment and ratcheting message encryption.
mod handshake;
mod ratchet;
mod state;

pub use handshake::{HandshakeEngine, HandshakeError, HandshakeMessage};
pub use ratchet::{EPHEMERAL_KEY_SIZE, EncryptedEnvelope, Metadata, RatchetCipher, RatchetError};
pub use state::{SESSION_KEY_SIZE, SessionState};
