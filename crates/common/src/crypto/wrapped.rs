use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::CryptoError;
use super::{from_base64, to_base64};

/// A [`super::Secret`] encrypted to a recipient's [`super::PublicKey`]
///
/// This is the only form in which a session secret may cross the network. On
///  the wire it is the standard base64 of the RSA-OAEP ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WrappedSecret(Vec<u8>);

impl From<Vec<u8>> for WrappedSecret {
    fn from(bytes: Vec<u8>) -> Self {
        WrappedSecret(bytes)
    }
}

impl WrappedSecret {
    /// Parse a wrapped secret from its base64 transport encoding
    ///
    /// # Errors
    ///
    /// Returns `MalformedCiphertext` if the input is empty or not valid base64.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        if encoded.is_empty() {
            return Err(CryptoError::MalformedCiphertext(
                "empty wrapped secret".into(),
            ));
        }
        let bytes = from_base64(encoded).map_err(|e| {
            CryptoError::MalformedCiphertext(format!("wrapped secret base64 decode error: {}", e))
        })?;
        Ok(Self(bytes))
    }

    pub fn to_base64(&self) -> String {
        to_base64(&self.0)
    }

    /// Get a reference to the raw RSA-OAEP ciphertext
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for WrappedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl TryFrom<String> for WrappedSecret {
    type Error = CryptoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_base64(&value)
    }
}

impl From<WrappedSecret> for String {
    fn from(wrapped: WrappedSecret) -> Self {
        wrapped.to_base64()
    }
}
