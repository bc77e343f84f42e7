//! Async hybrid-encryption handshake
//!
//! ```text
//!   recipient                                  sender
//!   ---------                                  ------
//!   RecipientSession::start()      KeyGen
//!   public_key() ───────────────── publish ──► SenderSession::new()
//!                                              offer(public_key)     KeyWrap
//!   accept(wrapped) ◄─────────────────────────
//!       │                          KeyUnwrap   session().seal(text)  PayloadEncrypt
//!       ▼                                            │
//!   SharedSession::open(sealed) ◄────────────────────┘  PayloadDecrypt
//! ```
//!
//! Sessions share no state with each other. Only key generation and key
//!  unwrapping are expensive enough to be moved onto the blocking pool.

use tokio::task::{spawn_blocking, JoinError};

use super::error::CryptoError;
use super::keys::{KeyPair, PublicKey};
use super::sealed::SealedText;
use super::secret::Secret;
use super::wrapped::WrappedSecret;

fn worker_failed(err: JoinError) -> CryptoError {
    CryptoError::Worker(err.to_string())
}

/// Receiving side of a handshake: owns the one-time keypair
#[derive(Debug)]
pub struct RecipientSession {
    keys: KeyPair,
    public_key: String,
}

impl RecipientSession {
    /// Generate the session keypair and export its public half
    pub async fn start() -> Result<Self, CryptoError> {
        let keys = spawn_blocking(KeyPair::generate)
            .await
            .map_err(|e| CryptoError::KeyGeneration(format!("key generation task failed: {}", e)))??;
        let public_key = keys.public().to_base64()?;
        tracing::debug!("recipient session started");
        Ok(Self { keys, public_key })
    }

    /// The base64 SPKI public key to publish to the sender
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Unwrap the sender's secret, consuming the keypair
    pub async fn accept(self, wrapped_key: &str) -> Result<SharedSession, CryptoError> {
        let wrapped = WrappedSecret::from_base64(wrapped_key)?;
        let (_, private) = self.keys.into_parts();
        let secret = spawn_blocking(move || private.unwrap_secret(&wrapped))
            .await
            .map_err(worker_failed)??;
        tracing::debug!("recipient session accepted wrapped secret");
        Ok(SharedSession::from(secret))
    }
}

/// Sending side of a handshake: owns the fresh session secret
///
/// One sender can offer the same secret to any number of recipients.
#[derive(Debug)]
pub struct SenderSession {
    secret: Secret,
}

impl Default for SenderSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SenderSession {
    /// Start a session with a freshly generated secret
    pub fn new() -> Self {
        Self {
            secret: Secret::generate(),
        }
    }

    /// Wrap the session secret to a recipient's published public key
    pub async fn offer(&self, public_key: &str) -> Result<String, CryptoError> {
        let recipient = PublicKey::from_base64(public_key)?;
        let wrapped = recipient.wrap_secret(&self.secret)?;
        Ok(wrapped.to_base64())
    }

    /// The shared half of the session, for sealing text
    pub fn session(&self) -> SharedSession {
        SharedSession::from(self.secret.clone())
    }
}

/// Both parties' view once the secret is established
#[derive(Debug, Clone)]
pub struct SharedSession {
    secret: Secret,
}

impl From<Secret> for SharedSession {
    fn from(secret: Secret) -> Self {
        Self { secret }
    }
}

impl SharedSession {
    /// Seal text into the `<nonce>:<ciphertext>` transport string
    pub async fn seal(&self, text: &str) -> Result<String, CryptoError> {
        Ok(self.secret.seal(text)?.to_string())
    }

    /// Parse and open a transport string
    pub async fn open(&self, sealed: &str) -> Result<String, CryptoError> {
        let sealed = SealedText::parse(sealed)?;
        self.secret.open(&sealed)
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_worker_panic_is_not_a_decryption_failure() {
        let join_err = spawn_blocking(|| -> Secret { panic!("worker died") })
            .await
            .unwrap_err();

        let err = worker_failed(join_err);
        assert!(matches!(err, CryptoError::Worker(_)));
        assert!(!matches!(err, CryptoError::DecryptionFailed));
    }

    #[tokio::test]
    async fn test_full_handshake() {
        let recipient = RecipientSession::start().await.unwrap();
        let sender = SenderSession::new();

        let wrapped = sender.offer(recipient.public_key()).await.unwrap();
        let sealed = sender.session().seal("hello world").await.unwrap();

        let shared = recipient.accept(&wrapped).await.unwrap();
        assert_eq!(shared.secret(), sender.session().secret());
        assert_eq!(shared.open(&sealed).await.unwrap(), "hello world");
    }

    #[tokio::test]
    async fn test_offer_rejects_bad_public_key() {
        let sender = SenderSession::new();
        let result = sender.offer("bm90IGEga2V5").await;
        assert!(matches!(result, Err(CryptoError::KeyImportFailed(_))));
    }

    #[tokio::test]
    async fn test_accept_rejects_malformed_wrapped_key() {
        let recipient = RecipientSession::start().await.unwrap();
        let result = recipient.accept("***").await;
        assert!(matches!(result, Err(CryptoError::MalformedCiphertext(_))));
    }

    #[tokio::test]
    async fn test_open_without_delimiter() {
        let shared = SenderSession::new().session();
        let result = shared.open("no delimiter here").await;
        assert!(matches!(result, Err(CryptoError::MalformedCiphertext(_))));
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let a = SenderSession::new();
        let b = SenderSession::new();
        assert_ne!(a.session().secret(), b.session().secret());

        let sealed = a.session().seal("only for a").await.unwrap();
        let result = b.session().open(&sealed).await;
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }
}
