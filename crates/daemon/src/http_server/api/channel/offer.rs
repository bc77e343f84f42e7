use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use common::crypto::WrappedSecret;

use super::ChannelApiError;
use crate::http_server::api::{HostToken, JsonBody};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferRequest {
    pub receiver_id: String,
    pub wrapped_key: WrappedSecret,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(name): Path<String>,
    HostToken(token): HostToken,
    JsonBody(req): JsonBody<OfferRequest>,
) -> Result<impl IntoResponse, ChannelApiError> {
    state
        .channels()
        .offer(&name, &token, &req.receiver_id, req.wrapped_key)?;
    tracing::info!("OFFER: wrapped secret delivered on '{}'", name.trim());
    Ok(StatusCode::NO_CONTENT)
}
