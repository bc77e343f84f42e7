use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::CryptoError;
use super::secret::{NONCE_SIZE, TAG_SIZE};
use super::{from_base64, to_base64};

/// Separator between the nonce and ciphertext halves of the transport format
pub const SEALED_DELIMITER: char = ':';

/// Text sealed under a [`super::Secret`]
///
/// # Wire Format
///
/// ```text
/// <base64 nonce (12 bytes)>:<base64 ciphertext || tag (16 bytes)>
/// ```
///
/// Parsing is purely structural. A `SealedText` that parses is not known to be
///  authentic until it has been opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SealedText {
    nonce: [u8; NONCE_SIZE],
    ciphertext: Vec<u8>,
}

impl SealedText {
    pub(crate) fn new(nonce: [u8; NONCE_SIZE], ciphertext: Vec<u8>) -> Self {
        Self { nonce, ciphertext }
    }

    /// Parse the `<nonce>:<ciphertext>` transport string
    ///
    /// # Errors
    ///
    /// Returns `MalformedCiphertext` if the delimiter or either half is missing,
    ///  a half is not valid base64, the nonce is not 12 bytes, or the
    ///  ciphertext is too short to carry an authentication tag.
    pub fn parse(transport: &str) -> Result<Self, CryptoError> {
        let (nonce_b64, ciphertext_b64) = transport
            .split_once(SEALED_DELIMITER)
            .ok_or_else(|| malformed("expected '<nonce>:<ciphertext>'"))?;

        if nonce_b64.is_empty() || ciphertext_b64.is_empty() {
            return Err(malformed("expected '<nonce>:<ciphertext>'"));
        }

        let nonce_bytes =
            from_base64(nonce_b64).map_err(|e| malformed(&format!("nonce: {}", e)))?;
        let nonce: [u8; NONCE_SIZE] = nonce_bytes.as_slice().try_into().map_err(|_| {
            malformed(&format!(
                "invalid nonce size, expected {}, got {}",
                NONCE_SIZE,
                nonce_bytes.len()
            ))
        })?;

        let ciphertext =
            from_base64(ciphertext_b64).map_err(|e| malformed(&format!("ciphertext: {}", e)))?;
        if ciphertext.len() < TAG_SIZE {
            return Err(malformed("ciphertext shorter than authentication tag"));
        }

        Ok(Self { nonce, ciphertext })
    }

    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// Ciphertext with the authentication tag appended
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

fn malformed(reason: &str) -> CryptoError {
    CryptoError::MalformedCiphertext(reason.to_string())
}

impl fmt::Display for SealedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            to_base64(self.nonce),
            SEALED_DELIMITER,
            to_base64(&self.ciphertext)
        )
    }
}

impl FromStr for SealedText {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SealedText {
    type Error = CryptoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SealedText> for String {
    fn from(sealed: SealedText) -> Self {
        sealed.to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::Secret;

    fn assert_malformed(input: &str) {
        assert!(
            matches!(
                SealedText::parse(input),
                Err(CryptoError::MalformedCiphertext(_))
            ),
            "accepted {:?}",
            input
        );
    }

    #[test]
    fn test_transport_roundtrip() {
        let secret = Secret::generate();
        let sealed = secret.seal("over the wire").unwrap();

        let transport = sealed.to_string();
        let parsed: SealedText = transport.parse().unwrap();

        assert_eq!(parsed, sealed);
        assert_eq!(secret.open(&parsed).unwrap(), "over the wire");
    }

    #[test]
    fn test_transport_shape() {
        let sealed = Secret::generate().seal("shape").unwrap();
        let transport = sealed.to_string();

        let (nonce, ciphertext) = transport.split_once(':').unwrap();
        // 12 bytes of base64 is 16 characters without padding
        assert_eq!(nonce.len(), 16);
        assert_eq!(
            from_base64(ciphertext).unwrap().len(),
            "shape".len() + TAG_SIZE
        );
    }

    #[test]
    fn test_missing_delimiter() {
        assert_malformed("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");
        assert_malformed("");
    }

    #[test]
    fn test_missing_halves() {
        assert_malformed(":AAAAAAAAAAAAAAAAAAAAAA==");
        assert_malformed("AAAAAAAAAAAAAAAA:");
        assert_malformed(":");
    }

    #[test]
    fn test_invalid_base64() {
        assert_malformed("!!!!:AAAAAAAAAAAAAAAAAAAAAA==");
        assert_malformed("AAAAAAAAAAAAAAAA:not*base64");
    }

    #[test]
    fn test_extra_delimiter() {
        assert_malformed("AAAAAAAAAAAAAAAA:AAAAAAAAAAAAAAAAAAAAAA==:AAAA");
    }

    #[test]
    fn test_wrong_nonce_length() {
        // 9 byte nonce
        assert_malformed("AAAAAAAAAAAA:AAAAAAAAAAAAAAAAAAAAAA==");
    }

    #[test]
    fn test_ciphertext_without_tag() {
        assert_malformed("AAAAAAAAAAAAAAAA:AAAA");
    }

    #[test]
    fn test_serde_as_string() {
        let sealed = Secret::generate().seal("json").unwrap();
        let json = serde_json::to_string(&sealed).unwrap();
        assert_eq!(json, format!("\"{}\"", sealed));

        let back: SealedText = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sealed);

        assert!(serde_json::from_str::<SealedText>("\"no delimiter\"").is_err());
    }
}
