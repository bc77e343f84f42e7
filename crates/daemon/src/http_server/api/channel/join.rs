use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::ChannelApiError;
use crate::http_server::api::JsonBody;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    pub receiver_id: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(name): Path<String>,
    JsonBody(req): JsonBody<JoinRequest>,
) -> Result<impl IntoResponse, ChannelApiError> {
    let receiver_id = state.channels().join(&name, &req.code).await?;
    tracing::info!("JOIN CHANNEL: receiver joined '{}'", name.trim());
    Ok(Json(JoinResponse { receiver_id }))
}
