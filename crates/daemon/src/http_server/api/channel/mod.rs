//! Relay endpoints for live channels
//!
//! Hosts authenticate with the `x-host-token` header they got back from
//!  `POST /channel`; receivers identify themselves with the id `join`
//!  handed them. Everything relayed here is either a public key, a wrapped
//!  secret or sealed text.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::Router;

use common::channel::ChannelError;

use crate::http_server::api::error_response;
use crate::ServiceState;

pub mod announce;
pub mod close;
pub mod host;
pub mod join;
pub mod key;
pub mod leave;
pub mod offer;
pub mod pending;
pub mod text;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", post(host::handler))
        .route("/:name", delete(close::handler))
        .route("/:name/join", post(join::handler))
        .route("/:name/announce", post(announce::handler))
        .route("/:name/pending", get(pending::handler))
        .route("/:name/offer", post(offer::handler))
        .route("/:name/key/:receiver_id", get(key::handler))
        .route("/:name/receiver/:receiver_id", delete(leave::handler))
        .route("/:name/text", put(text::update_handler))
        .route("/:name/text/:receiver_id", get(text::get_handler))
        .with_state(state)
}

/// Failure of any channel endpoint
#[derive(Debug, thiserror::Error)]
pub enum ChannelApiError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    /// The channel exists but has nothing to hand out yet
    #[error("{0}")]
    NotReady(&'static str),
}

impl IntoResponse for ChannelApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ChannelApiError::NotReady(_) => StatusCode::NOT_FOUND,
            ChannelApiError::Channel(e) => match e {
                ChannelError::InvalidInput(_) | ChannelError::Crypto(_) => {
                    StatusCode::BAD_REQUEST
                }
                ChannelError::AuthFailed => StatusCode::UNAUTHORIZED,
                ChannelError::Unauthorized => StatusCode::FORBIDDEN,
                ChannelError::NotFound(_) | ChannelError::UnknownReceiver(_) => {
                    StatusCode::NOT_FOUND
                }
                ChannelError::ChannelTaken(_) | ChannelError::ChannelFull(_) => {
                    StatusCode::CONFLICT
                }
                ChannelError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        };

        if status.is_server_error() {
            tracing::error!("CHANNEL ERROR: {}", self);
            return error_response(status, "internal server error");
        }
        tracing::warn!("CHANNEL ERROR: {}", self);
        error_response(status, self.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ChannelError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (ChannelError::ChannelTaken("x".into()), StatusCode::CONFLICT),
            (ChannelError::ChannelFull("x".into()), StatusCode::CONFLICT),
            (ChannelError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ChannelError::AuthFailed, StatusCode::UNAUTHORIZED),
            (ChannelError::Unauthorized, StatusCode::FORBIDDEN),
            (ChannelError::UnknownReceiver("x".into()), StatusCode::NOT_FOUND),
            (
                ChannelError::Provider("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ChannelApiError::from(err).into_response().status(), status);
        }
    }
}
