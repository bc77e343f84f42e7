use std::fmt::Debug;

use async_trait::async_trait;
use serde::Serialize;
use time::OffsetDateTime;

use super::id::PasteId;

/// How many ids `create` draws before giving up on a collision streak
pub const MAX_ID_ATTEMPTS: u32 = 8;

/// A single stored paste
///
/// Immutable once inserted; the store hands out clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredItem {
    pub id: PasteId,
    /// The shared text; plaintext or a sealed transport string, the store
    ///  does not care which
    pub payload: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PasteStoreError {
    /// The backend failed in a way the caller can't do anything about
    #[error("unhandled paste store provider error: {0}")]
    Provider(String),
    /// The payload is empty or whitespace only
    #[error("content is required")]
    InvalidInput,
    /// No paste exists under this id
    #[error("paste not found: {0}")]
    NotFound(String),
    /// An insert hit an id that is already taken
    #[error("paste id already in use: {0}")]
    Conflict(PasteId),
    /// Every id drawn during a create collided
    #[error("no free paste id after {0} attempts")]
    IdSpaceExhausted(u32),
}

/// Storage backend for pastes
///
/// Backends implement `insert` and `fetch`; the provided `create` and `get`
///  layer input validation, id generation and the collision policy on top,
///  so every backend behaves the same at the API boundary.
#[async_trait]
pub trait PasteStore: Send + Sync + Debug + 'static {
    /// Insert an item under its id
    ///
    /// Must be an atomic check-and-set: fails with
    ///  `Err(PasteStoreError::Conflict)` if the id is already present and
    ///  never overwrites an existing item.
    async fn insert(&self, item: StoredItem) -> Result<(), PasteStoreError>;

    /// Look up an item by id
    async fn fetch(&self, id: &str) -> Result<Option<StoredItem>, PasteStoreError>;

    /// Store a new paste and return its id
    ///
    /// # Errors
    /// * `InvalidInput` - the payload is empty after trimming; nothing is stored
    /// * `IdSpaceExhausted` - `MAX_ID_ATTEMPTS` generated ids all collided
    async fn create(&self, payload: String) -> Result<PasteId, PasteStoreError> {
        let mut next_id = PasteId::generate;
        self.create_with(payload, &mut next_id).await
    }

    /// `create`, drawing ids from `next_id` instead of the default generator
    async fn create_with(
        &self,
        payload: String,
        next_id: &mut (dyn FnMut() -> PasteId + Send),
    ) -> Result<PasteId, PasteStoreError> {
        if payload.trim().is_empty() {
            return Err(PasteStoreError::InvalidInput);
        }

        let created_at = OffsetDateTime::now_utc();
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = next_id();
            let item = StoredItem {
                id: id.clone(),
                payload: payload.clone(),
                created_at,
            };
            match self.insert(item).await {
                Ok(()) => {
                    tracing::debug!(%id, attempt, "paste stored");
                    return Ok(id);
                }
                Err(PasteStoreError::Conflict(taken)) => {
                    tracing::warn!(id = %taken, attempt, "paste id collision, drawing another");
                }
                Err(e) => return Err(e),
            }
        }

        Err(PasteStoreError::IdSpaceExhausted(MAX_ID_ATTEMPTS))
    }

    /// Retrieve a paste
    ///
    /// # Errors
    /// * `NotFound` - nothing was ever stored under `id`
    async fn get(&self, id: &str) -> Result<StoredItem, PasteStoreError> {
        self.fetch(id)
            .await?
            .ok_or_else(|| PasteStoreError::NotFound(id.to_string()))
    }
}
