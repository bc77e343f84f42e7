use axum::routing::{get, post};
use axum::Router;

pub mod create;
pub mod get;

use crate::ServiceState;

pub use create::{CreateRequest, CreateResponse};
pub use get::{GetRequest, GetResponse};

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", post(create::handler))
        .route("/:id", get(get::handler))
        .with_state(state)
}
