// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end message encryption core: an X3DH-style handshake establishing shared sessions, a
//! ratcheting cipher deriving a fresh key per message and a legacy chunked RSA-OAEP path for
//! contacts without a session.
//!
//! ## Design
//!
//! Every operation is a pure transform over key material and session state. The crate holds no
//! connections, storage or background tasks. Callers own persistence of key pairs, pre-keys
//! and [`SessionState`] records and pass state in and out on every call. Updated state comes
//! back as a new value and has to be persisted before the next operation on the same session,
//! with exactly one writer per session at a time.
//!
//! ## Typical flow
//!
//! 1. Both parties create identity and signed pre-key pairs with [`KeyPairFactory`] and
//!    publish a [`PreKeyBundle`], optionally with one-time pre-keys.
//! 2. The initiator derives a session and a [`HandshakeMessage`] with
//!    [`HandshakeEngine::initiate`], the peer mirrors it with [`HandshakeEngine::respond`].
//! 3. Messages travel as [`EncryptedEnvelope`]s produced and consumed by [`RatchetCipher`],
//!    ratcheting the session forward with every message.
//! 4. Contacts compare fingerprints from [`VerificationCodeGenerator`] out-of-band.
//!
//! Without an established session [`LegacyCipher`] encrypts directly towards a contact's RSA
//! key, trading forward secrecy for simplicity.
//!
//! ## Security
//!
//! The signed pre-key fallback for X25519 identities is an HMAC tag keyed with private
//! material and verifiable only by its owner, treat such bundles accordingly. The ratchet
//! replays its chain from the receiver's own counter, decryption is strictly in-order for one
//! direction per session.
mod crypto;
mod encoding;
mod keys;
mod legacy;
mod session;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
mod verification;

pub use crypto::{Rng, RngError};
pub use encoding::EncodingError;
pub use keys::{
    KeyAlgorithm, KeyFormatError, KeyGenError, KeyPair, KeyPairFactory, OneTimePreKey,
    OneTimePreKeyId, PreKeyBundle, PreKeyId, PreKeySignature, PrivateKey, PublicKey,
    SignatureError, SignedPreKey, sign_prekey, verify_prekey,
};
pub use legacy::{DecryptionError, LegacyCipher, LegacyCipherError, RSA_KEY_BITS};
pub use session::{
    EPHEMERAL_KEY_SIZE, EncryptedEnvelope, HandshakeEngine, HandshakeError, HandshakeMessage,
    Metadata, RatchetCipher, RatchetError, SESSION_KEY_SIZE, SessionState,
};
pub use verification::{SECURITY_CODE_DIGITS, VerificationCodeGenerator, VerificationError};
