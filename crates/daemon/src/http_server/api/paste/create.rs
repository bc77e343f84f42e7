use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::paste::PasteStoreError;

use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::http_server::api::{error_response, JsonBody};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Text to share; plaintext or a sealed transport string
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResponse {
    pub id: String,
    /// Where a browser would view the paste
    pub url: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    JsonBody(req): JsonBody<CreateRequest>,
) -> Result<impl IntoResponse, CreateError> {
    let content = req.content.unwrap_or_default();
    tracing::info!("CREATE PASTE: received {} bytes", content.len());

    let id = state.pastes().create(content).await.map_err(|e| {
        match &e {
            PasteStoreError::InvalidInput => tracing::warn!("CREATE PASTE: empty content"),
            _ => tracing::error!("CREATE PASTE: store failure: {}", e),
        }
        e
    })?;

    tracing::info!("CREATE PASTE: stored paste {}", id);
    Ok((
        StatusCode::CREATED,
        Json(CreateResponse {
            url: format!("/paste/{}", id),
            id: id.to_string(),
        }),
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error("Content is required")]
    MissingContent,
    #[error("Failed to store paste: {0}")]
    Store(PasteStoreError),
}

impl From<PasteStoreError> for CreateError {
    fn from(err: PasteStoreError) -> Self {
        match err {
            PasteStoreError::InvalidInput => CreateError::MissingContent,
            other => CreateError::Store(other),
        }
    }
}

impl IntoResponse for CreateError {
    fn into_response(self) -> Response {
        match self {
            CreateError::MissingContent => {
                error_response(StatusCode::BAD_REQUEST, self.to_string())
            }
            CreateError::Store(_) => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store paste")
            }
        }
    }
}

// Client implementation - builds request for this operation
impl ApiRequest for CreateRequest {
    type Response = CreateResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/paste")?;
        Ok(client.post(full_url).json(&self))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_missing_content_deserializes() {
        let req: CreateRequest = serde_json::from_str("{}").unwrap();
        assert!(req.content.is_none());
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(
            CreateError::from(PasteStoreError::InvalidInput)
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CreateError::from(PasteStoreError::IdSpaceExhausted(8))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
