/**
 * Live, code-protected relay channels for
 *  running the key exchange between a host
 *  and its receivers.
 */
pub mod channel;
/**
 * Cryptographic types and operations.
 *  - RSA-OAEP keypairs for wrapping session secrets
 *  - AES-256-GCM sealing of shared text
 *  - Async handshake sessions
 */
pub mod crypto;
/**
 * Ephemeral, in-process storage of pastes
 *  keyed by short random ids.
 */
pub mod paste;

pub mod prelude {
    pub use crate::channel::{ChannelError, ChannelRegistry};
    pub use crate::crypto::{
        CryptoError, KeyPair, PublicKey, RecipientSession, SealedText, Secret, SenderSession,
        SharedSession, WrappedSecret,
    };
    pub use crate::paste::{MemoryPasteStore, PasteId, PasteStore, PasteStoreError, StoredItem};
}
