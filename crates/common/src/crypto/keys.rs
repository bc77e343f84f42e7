use std::fmt;

use rand_core::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use super::error::CryptoError;
use super::secret::Secret;
use super::wrapped::WrappedSecret;
use super::{from_base64, to_base64};

/// Size of the RSA modulus in bits
pub const MODULUS_BITS: usize = 2048;
/// RSA public exponent (F4)
pub const PUBLIC_EXPONENT: u32 = 65537;

fn oaep() -> Oaep {
    Oaep::new::<Sha256>()
}

/// An RSA-OAEP keypair generated by the recipient of a share
///
/// The pair only lives for one handshake. The public half is published, the
///  private half stays in memory on the recipient's side and is dropped once
///  the session secret has been unwrapped.
///
/// # Examples
///
/// ```ignore
/// let keys = KeyPair::generate()?;
/// let published = keys.public().to_base64()?;
///
/// // on the sender's side
/// let recipient = PublicKey::from_base64(&published)?;
/// let wrapped = recipient.wrap_secret(&Secret::generate())?;
///
/// // back on the recipient's side
/// let secret = keys.private().unwrap_secret(&wrapped)?;
/// ```
#[derive(Debug)]
pub struct KeyPair {
    public: PublicKey,
    private: PrivateKey,
}

impl KeyPair {
    /// Generate a fresh 2048-bit keypair with public exponent 65537
    ///
    /// This is CPU heavy; async callers should go through
    ///  [`super::RecipientSession::start`].
    pub fn generate() -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::new(&mut OsRng, MODULUS_BITS)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let public = RsaPublicKey::from(&private);
        Ok(Self {
            public: PublicKey(public),
            private: PrivateKey(private),
        })
    }

    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    pub fn private(&self) -> &PrivateKey {
        &self.private
    }

    pub fn into_parts(self) -> (PublicKey, PrivateKey) {
        (self.public, self.private)
    }
}

/// Public half of a handshake keypair
///
/// Can be exported and can wrap secrets. Nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(RsaPublicKey);

impl PublicKey {
    /// Import a public key from base64 encoded SPKI DER
    ///
    /// # Errors
    ///
    /// Returns `KeyImportFailed` if the encoding is malformed or the key does
    ///  not use a 2048-bit modulus with exponent 65537.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let der = from_base64(encoded).map_err(|e| {
            CryptoError::KeyImportFailed(format!("public key base64 decode error: {}", e))
        })?;
        let key = RsaPublicKey::from_public_key_der(&der).map_err(|e| {
            CryptoError::KeyImportFailed(format!("public key spki decode error: {}", e))
        })?;

        if key.n().bits() != MODULUS_BITS {
            return Err(CryptoError::KeyImportFailed(format!(
                "unsupported modulus size, expected {}, got {}",
                MODULUS_BITS,
                key.n().bits()
            )));
        }
        if *key.e() != BigUint::from(PUBLIC_EXPONENT) {
            return Err(CryptoError::KeyImportFailed(
                "unsupported public exponent".into(),
            ));
        }

        Ok(Self(key))
    }

    /// Export the key as base64 encoded SPKI DER
    pub fn to_base64(&self) -> Result<String, CryptoError> {
        let der = self
            .0
            .to_public_key_der()
            .map_err(|e| CryptoError::Encryption(format!("public key spki encode error: {}", e)))?;
        Ok(to_base64(der.as_bytes()))
    }

    /// Wrap a secret for the holder of the matching private key
    ///
    /// The base64 encoding of the secret is what gets encrypted, so the
    ///  recipient recovers exactly the transport form of the key.
    pub fn wrap_secret(&self, secret: &Secret) -> Result<WrappedSecret, CryptoError> {
        let encoded = secret.to_base64();
        let wrapped = self
            .0
            .encrypt(&mut OsRng, oaep(), encoded.as_bytes())
            .map_err(|e| CryptoError::Encryption(format!("rsa-oaep encrypt error: {}", e)))?;
        Ok(WrappedSecret::from(wrapped))
    }
}

/// Private half of a handshake keypair
///
/// Deliberately has no export, serialization or clone: the only thing it can
///  do is unwrap secrets that were wrapped to its public half.
pub struct PrivateKey(RsaPrivateKey);

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

impl PrivateKey {
    /// Recover a secret wrapped to our public key
    ///
    /// # Errors
    ///
    /// Returns `DecryptionFailed` if the OAEP decryption is rejected (wrapped
    ///  for someone else, or tampered with), and `KeyImportFailed` if the
    ///  recovered bytes are not a valid secret encoding.
    pub fn unwrap_secret(&self, wrapped: &WrappedSecret) -> Result<Secret, CryptoError> {
        let decrypted = self
            .0
            .decrypt(oaep(), wrapped.bytes())
            .map_err(|_| CryptoError::DecryptionFailed)?;
        let encoded = String::from_utf8(decrypted).map_err(|_| {
            CryptoError::KeyImportFailed("unwrapped secret is not valid base64".into())
        })?;
        Secret::from_base64(&encoded)
    }
}
