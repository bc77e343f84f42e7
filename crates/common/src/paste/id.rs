use std::fmt;
use std::ops::Deref;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Length of a generated paste id
pub const PASTE_ID_LEN: usize = 6;
/// Alphabet paste ids are drawn from
pub const PASTE_ID_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Short opaque identifier of a stored paste
///
/// Generated ids are `PASTE_ID_LEN` characters of `[a-z0-9]` (36^6, about
///  2.2 billion ids) drawn from a cryptographically secure RNG, so they are
///  not guessable by enumerating recent ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasteId(String);

impl PasteId {
    /// Draw a fresh random id
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let id = (0..PASTE_ID_LEN)
            .map(|_| PASTE_ID_ALPHABET[rng.random_range(0..PASTE_ID_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for PasteId {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for PasteId {
    fn from(id: &str) -> Self {
        PasteId(id.to_string())
    }
}

impl fmt::Display for PasteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
