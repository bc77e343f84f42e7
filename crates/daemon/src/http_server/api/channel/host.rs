use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use common::channel::normalize_channel_name;

use super::ChannelApiError;
use crate::http_server::api::JsonBody;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRequest {
    pub channel: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostResponse {
    /// Normalized channel name
    pub channel: String,
    /// Secret the host presents as `x-host-token` from now on
    pub host_token: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    JsonBody(req): JsonBody<HostRequest>,
) -> Result<impl IntoResponse, ChannelApiError> {
    let channel = normalize_channel_name(&req.channel)?;
    let host_token = state.channels().host(&channel, &req.code).await?;

    tracing::info!("HOST CHANNEL: opened '{}'", channel);
    Ok((
        StatusCode::CREATED,
        Json(HostResponse {
            channel,
            host_token,
        }),
    ))
}
