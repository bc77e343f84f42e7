use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};

pub mod channel;
pub mod client;
pub mod paste;

use crate::rate_limit;
use crate::ServiceState;

/// Header a channel host authenticates with
pub const HOST_TOKEN_HEADER: &str = "x-host-token";

pub fn router(state: ServiceState) -> Router<ServiceState> {
    let cors_layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .nest("/paste", paste::router(state.clone()))
        .nest("/channel", channel::router(state.clone()))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::middleware,
        ))
        .with_state(state)
        .layer(cors_layer)
}

/// `{ "error": message }` with the given status
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

/// JSON request body whose rejections come back as `400 { error }`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(BadBody))]
pub struct JsonBody<T>(pub T);

#[derive(Debug)]
pub struct BadBody(JsonRejection);

impl From<JsonRejection> for BadBody {
    fn from(rejection: JsonRejection) -> Self {
        Self(rejection)
    }
}

impl IntoResponse for BadBody {
    fn into_response(self) -> Response {
        tracing::warn!("rejected request body: {}", self.0.body_text());
        error_response(StatusCode::BAD_REQUEST, self.0.body_text())
    }
}

/// The `x-host-token` a channel host presents
#[derive(Debug, Clone)]
pub struct HostToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for HostToken
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(HOST_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| HostToken(value.to_string()))
            .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "host token is required"))
    }
}
