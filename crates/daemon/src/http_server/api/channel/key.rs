use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use common::crypto::WrappedSecret;

use super::ChannelApiError;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyResponse {
    pub wrapped_key: WrappedSecret,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path((name, receiver_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ChannelApiError> {
    let wrapped_key = state
        .channels()
        .wrapped_key(&name, &receiver_id)?
        .ok_or(ChannelApiError::NotReady("no key offered yet"))?;
    Ok(Json(KeyResponse { wrapped_key }))
}
