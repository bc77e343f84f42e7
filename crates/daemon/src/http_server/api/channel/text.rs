use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use common::crypto::SealedText;

use super::ChannelApiError;
use crate::http_server::api::{HostToken, JsonBody};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTextRequest {
    pub ciphertext: SealedText,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTextResponse {
    pub version: u64,
}

pub async fn update_handler(
    State(state): State<ServiceState>,
    Path(name): Path<String>,
    HostToken(token): HostToken,
    JsonBody(req): JsonBody<UpdateTextRequest>,
) -> Result<impl IntoResponse, ChannelApiError> {
    let version = state
        .channels()
        .update_text(&name, &token, req.ciphertext)?;
    tracing::debug!("UPDATE TEXT: '{}' now at version {}", name.trim(), version);
    Ok(Json(UpdateTextResponse { version }))
}

/// Latest sealed text for a joined receiver; `404` until the host pushes some
pub async fn get_handler(
    State(state): State<ServiceState>,
    Path((name, receiver_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ChannelApiError> {
    let text = state
        .channels()
        .text(&name, &receiver_id)?
        .ok_or(ChannelApiError::NotReady("no text shared yet"))?;
    Ok(Json(text))
}
