use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use common::channel::PendingReceiver;

use super::ChannelApiError;
use crate::http_server::api::HostToken;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingResponse {
    pub receivers: Vec<PendingReceiver>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(name): Path<String>,
    HostToken(token): HostToken,
) -> Result<impl IntoResponse, ChannelApiError> {
    let receivers = state.channels().pending(&name, &token)?;
    Ok(Json(PendingResponse { receivers }))
}
