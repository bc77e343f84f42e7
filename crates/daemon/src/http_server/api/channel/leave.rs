use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::ChannelApiError;
use crate::ServiceState;

/// A receiver giving up its slot; the id is dead afterwards
pub async fn handler(
    State(state): State<ServiceState>,
    Path((name, receiver_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ChannelApiError> {
    state.channels().leave(&name, &receiver_id)?;
    Ok(StatusCode::NO_CONTENT)
}
