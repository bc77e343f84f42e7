//! Shared test utilities for paste and handshake integration tests
#![allow(dead_code)]

use ::common::crypto::{RecipientSession, SenderSession, SharedSession};
use ::common::paste::MemoryPasteStore;

/// Run a full handshake, returning the sender's and recipient's views
pub async fn handshake() -> (SharedSession, SharedSession) {
    let recipient = RecipientSession::start().await.unwrap();
    let sender = SenderSession::new();

    let wrapped = sender.offer(recipient.public_key()).await.unwrap();
    let received = recipient.accept(&wrapped).await.unwrap();

    (sender.session(), received)
}

/// A fresh, empty store
pub fn setup_store() -> MemoryPasteStore {
    MemoryPasteStore::new()
}
