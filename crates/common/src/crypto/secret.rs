//! Payload encryption using AES-256-GCM
//!
//! A `Secret` is the one-time symmetric key of a sharing session. It is the
//! only thing needed to read a sealed text, so it only ever leaves its origin
//! wrapped under a recipient's public key (see [`super::WrappedSecret`]) or
//! deliberately shared out of band by the user.

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand_core::{OsRng, RngCore};

use super::error::CryptoError;
use super::sealed::SealedText;
use super::{from_base64, to_base64};

/// Size of an AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;
/// Size of an AES-256 key in bytes (256 bits)
pub const SECRET_SIZE: usize = 32;
/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// A 256-bit symmetric key for sealing shared text
///
/// Sealing produces a [`SealedText`]: a fresh random nonce and the AES-GCM
/// ciphertext with its 16 byte tag appended. Opening verifies the tag before
/// anything is returned.
///
/// # Examples
///
/// ```ignore
/// let secret = Secret::generate();
/// let sealed = secret.seal("hello world")?;
/// let transport = sealed.to_string(); // "<base64-nonce>:<base64-ciphertext>"
///
/// let recovered = secret.open(&SealedText::parse(&transport)?)?;
/// assert_eq!(recovered, "hello world");
/// ```
#[derive(PartialEq, Eq, Clone)]
pub struct Secret([u8; SECRET_SIZE]);

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

impl Secret {
    /// Generate a new random secret from the operating system RNG
    pub fn generate() -> Self {
        let mut buff = [0; SECRET_SIZE];
        OsRng.fill_bytes(&mut buff);
        Self(buff)
    }

    /// Create a secret from a byte slice
    ///
    /// # Errors
    ///
    /// Returns `KeyImportFailed` if the slice is not exactly `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, CryptoError> {
        if data.len() != SECRET_SIZE {
            return Err(CryptoError::KeyImportFailed(format!(
                "invalid secret size, expected {}, got {}",
                SECRET_SIZE,
                data.len()
            )));
        }
        let mut buff = [0; SECRET_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    /// Import a secret from its standard base64 transport encoding
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = from_base64(encoded)
            .map_err(|e| CryptoError::KeyImportFailed(format!("secret base64 decode error: {}", e)))?;
        Self::from_slice(&bytes)
    }

    /// Encode the secret as standard base64
    pub fn to_base64(&self) -> String {
        to_base64(self.0)
    }

    /// Get a reference to the secret key bytes
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.bytes()))
    }

    /// Seal UTF-8 text under this secret
    ///
    /// A new random nonce is drawn for every call, so sealing the same text
    ///  twice never yields the same output.
    pub fn seal(&self, plaintext: &str) -> Result<SealedText, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng
            .try_fill_bytes(&mut nonce_bytes)
            .map_err(|e| CryptoError::Encryption(format!("failed to generate nonce: {}", e)))?;

        let ciphertext = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CryptoError::Encryption("aes-gcm encrypt error".into()))?;

        Ok(SealedText::new(nonce_bytes, ciphertext))
    }

    /// Open a sealed text, verifying its authentication tag
    ///
    /// # Errors
    ///
    /// Returns `DecryptionFailed` if the tag does not verify (tampered data,
    ///  wrong secret or wrong nonce) or the plaintext is not valid UTF-8.
    pub fn open(&self, sealed: &SealedText) -> Result<String, CryptoError> {
        let plaintext = self
            .cipher()
            .decrypt(Nonce::from_slice(sealed.nonce()), sealed.ciphertext())
            .map_err(|_| CryptoError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
    }
}
