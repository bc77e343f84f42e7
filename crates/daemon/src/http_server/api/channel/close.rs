use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::ChannelApiError;
use crate::http_server::api::HostToken;
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    Path(name): Path<String>,
    HostToken(token): HostToken,
) -> Result<impl IntoResponse, ChannelApiError> {
    state.channels().close(&name, &token)?;
    Ok(StatusCode::NO_CONTENT)
}
