use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use super::ChannelApiError;
use crate::http_server::api::JsonBody;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnounceRequest {
    pub receiver_id: String,
    /// Base64 SPKI public key the host should wrap the secret to
    pub public_key: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(name): Path<String>,
    JsonBody(req): JsonBody<AnnounceRequest>,
) -> Result<impl IntoResponse, ChannelApiError> {
    state
        .channels()
        .announce(&name, &req.receiver_id, &req.public_key)?;
    tracing::info!("ANNOUNCE: receiver published a key on '{}'", name.trim());
    Ok(StatusCode::NO_CONTENT)
}
