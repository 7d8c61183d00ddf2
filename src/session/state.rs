// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

use crate::crypto::Secret;

/// Size of every key the session tracks.
pub const SESSION_KEY_SIZE: usize = 32;

/// Ratcheting state shared between two parties.
///
/// A session is created once per contact by the handshake and moved forward by every encrypted
/// or decrypted message. All operations take the state by value and return an updated copy,
/// the caller owns the authoritative version and has to persist it before touching the session
/// again. Two writers advancing the same state concurrently lose one of the updates, access
/// has to be serialized per session outside of this crate.
///
/// The state is serializable for persistence, secrets travel as base64 strings.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "test_utils"), derive(Clone))]
pub struct SessionState {
    /// Opaque token identifying this session, shared by both parties.
    session_id: String,

    /// Root of the key hierarchy, folded with every new chain key.
    root_key: Secret<SESSION_KEY_SIZE>,

    /// Current position in the message key chain.
    chain_key: Secret<SESSION_KEY_SIZE>,

    /// Reserve key rolled forward with every message.
    next_sending_key: Secret<SESSION_KEY_SIZE>,

    /// Number of messages this state has processed so far.
    message_number: u64,
}

impl SessionState {
    pub(crate) fn new(
        session_id: String,
        root_key: Secret<SESSION_KEY_SIZE>,
        chain_key: Secret<SESSION_KEY_SIZE>,
        next_sending_key: Secret<SESSION_KEY_SIZE>,
    ) -> Self {
        Self {
            session_id,
            root_key,
            chain_key,
            next_sending_key,
            message_number: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn message_number(&self) -> u64 {
        self.message_number
    }

    pub(crate) fn root_key(&self) -> &Secret<SESSION_KEY_SIZE> {
        &self.root_key
    }

    pub(crate) fn chain_key(&self) -> &Secret<SESSION_KEY_SIZE> {
        &self.chain_key
    }

    pub(crate) fn next_sending_key(&self) -> &Secret<SESSION_KEY_SIZE> {
        &self.next_sending_key
    }

    /// Replaces all key material and counts the processed message.
    pub(crate) fn advance(
        mut self,
        root_key: [u8; SESSION_KEY_SIZE],
        chain_key: [u8; SESSION_KEY_SIZE],
        next_sending_key: [u8; SESSION_KEY_SIZE],
    ) -> Self {
        self.root_key = Secret::from_bytes(root_key);
        self.chain_key = Secret::from_bytes(chain_key);
        self.next_sending_key = Secret::from_bytes(next_sending_key);
        self.message_number += 1;
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::crypto::Secret;

    use super::SessionState;

    fn test_state() -> SessionState {
        SessionState::new(
            "session".to_string(),
            Secret::from_bytes([1; 32]),
            Secret::from_bytes([2; 32]),
            Secret::from_bytes([3; 32]),
        )
    }

    #[test]
    fn serde_round_trip() {
        let state = test_state();

        let json = serde_json::to_string(&state).unwrap();
        let restored: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, restored);
        assert_eq!(restored.message_number(), 0);
        assert_eq!(restored.session_id(), "session");
    }

    #[test]
    fn advancing_swaps_keys_and_counts() {
        let state = test_state();

        let advanced = state.clone().advance([4; 32], [5; 32], [6; 32]);
        assert_eq!(advanced.message_number(), 1);
        assert_ne!(state.chain_key(), advanced.chain_key());
        assert_eq!(advanced.chain_key(), &Secret::from_bytes([5; 32]));
    }
}
