/// Errors raised by the secure channel primitives
///
/// None of these are recoverable by retrying with the same input, and none of
///  them ever come with partial plaintext attached.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The transport string could not be parsed; no decryption was attempted
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),
    /// Authentication failed: tampered data, wrong key or wrong nonce
    #[error("decryption failed")]
    DecryptionFailed,
    /// A key encoding was malformed or uses unsupported parameters
    #[error("key import failed: {0}")]
    KeyImportFailed(String),
    #[error("key generation failed: {0}")]
    KeyGeneration(String),
    #[error("encryption failed: {0}")]
    Encryption(String),
    /// A blocking crypto task panicked or was cancelled before finishing
    #[error("crypto worker failed: {0}")]
    Worker(String),
}
