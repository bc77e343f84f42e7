//! Ephemeral paste store
//!
//! Maps short random ids to the text that was shared under them. Pastes are
//!  never updated, deleted or expired; they live until the store is dropped.

mod id;
mod memory;
mod store;

pub use id::{PasteId, PASTE_ID_ALPHABET, PASTE_ID_LEN};
pub use memory::MemoryPasteStore;
pub use store::{PasteStore, PasteStoreError, StoredItem, MAX_ID_ATTEMPTS};
