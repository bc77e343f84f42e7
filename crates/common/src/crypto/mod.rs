//! Cryptographic primitives for Sepa
//!
//! This module provides the end-to-end encryption layer for shared text. The
//! server never needs any of it: a paste or a channel message is an opaque
//! string as far as the store is concerned.
//!
//! - **Handshake**: RSA-OAEP (2048-bit, e = 65537, SHA-256) keypairs for wrapping
//!   a session secret to a recipient
//! - **Encryption**: AES-256-GCM for the shared text with a fresh 96-bit nonce per call
//! - **Transport**: every binary value crosses the boundary as standard base64
//!
//! # Security Model
//!
//! ## Capabilities
//! Keys are split by what their holder may do with them:
//! - [`PublicKey`] can be exported and can wrap a [`Secret`]
//! - [`PrivateKey`] can only unwrap; it can not be exported or serialized
//! - [`Secret`] can seal and open text and is encoded only to be wrapped
//!
//! ## Handshake
//! 1. Recipient generates a [`KeyPair`] and publishes the base64 SPKI public key
//! 2. Sender generates a fresh [`Secret`] and wraps its base64 encoding with
//!    RSA-OAEP under the recipient's public key ([`WrappedSecret`])
//! 3. Sender seals text with the secret: `<base64-nonce>:<base64-ciphertext-with-tag>`
//! 4. Recipient unwraps the secret with its private key and opens the text
//!
//! The async [`RecipientSession`] and [`SenderSession`] types drive these
//!  steps and hand back a [`SharedSession`] once both sides hold the secret.

mod error;
mod keys;
mod sealed;
mod secret;
mod session;
mod wrapped;

pub use error::CryptoError;
pub use keys::{KeyPair, PrivateKey, PublicKey, MODULUS_BITS, PUBLIC_EXPONENT};
pub use sealed::{SealedText, SEALED_DELIMITER};
pub use secret::{Secret, NONCE_SIZE, SECRET_SIZE, TAG_SIZE};
pub use session::{RecipientSession, SenderSession, SharedSession};
pub use wrapped::WrappedSecret;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encode bytes as standard (padded) base64
pub(crate) fn to_base64(bytes: impl AsRef<[u8]>) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard (padded) base64
pub(crate) fn from_base64(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(encoded)
}
