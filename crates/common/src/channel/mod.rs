//! Live channels: code-protected relay rooms for the encryption handshake
//!
//! A host opens a channel under a name and an access code. Receivers join
//!  with the code, publish a handshake public key, pick up the session secret
//!  the host wrapped for them, and then read the sealed text the host keeps
//!  updating. The relay never holds anything it could decrypt.

mod access_code;
mod registry;

pub use registry::{
    normalize_channel_name, ChannelError, ChannelRegistry, ChannelText, PendingReceiver,
    DEFAULT_IDLE_TTL, DEFAULT_MAX_RECEIVERS,
};
