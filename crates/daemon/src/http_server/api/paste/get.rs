use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use common::paste::{PasteStoreError, StoredItem};

use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::http_server::api::error_response;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct GetRequest {
    /// Id of the paste to fetch
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResponse {
    pub id: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl From<StoredItem> for GetResponse {
    fn from(item: StoredItem) -> Self {
        Self {
            id: item.id.to_string(),
            content: item.payload,
            timestamp: item.created_at,
        }
    }
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GetError> {
    let item = state.pastes().get(&id).await?;
    tracing::debug!("GET PASTE: served {}", id);
    Ok(Json(GetResponse::from(item)))
}

#[derive(Debug, thiserror::Error)]
pub enum GetError {
    #[error("Paste not found")]
    NotFound,
    #[error("Failed to read paste: {0}")]
    Store(PasteStoreError),
}

impl From<PasteStoreError> for GetError {
    fn from(err: PasteStoreError) -> Self {
        match err {
            PasteStoreError::NotFound(_) => GetError::NotFound,
            other => GetError::Store(other),
        }
    }
}

impl IntoResponse for GetError {
    fn into_response(self) -> Response {
        match self {
            GetError::NotFound => error_response(StatusCode::NOT_FOUND, self.to_string()),
            GetError::Store(e) => {
                tracing::error!("GET PASTE ERROR: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read paste")
            }
        }
    }
}

impl ApiRequest for GetRequest {
    type Response = GetResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let mut full_url = base_url.join("/api/paste/")?;
        full_url
            .path_segments_mut()
            .map_err(|_| ApiError::InvalidBase(base_url.to_string()))?
            .pop_if_empty()
            .push(&self.id);
        Ok(client.get(full_url))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_request_escapes_id() {
        let base = Url::parse("http://localhost:3000").unwrap();
        let request = GetRequest {
            id: "a/b".to_string(),
        }
        .build_request(&base, &Client::new())
        .unwrap()
        .build()
        .unwrap();
        assert_eq!(request.url().path(), "/api/paste/a%2Fb");
    }
}
