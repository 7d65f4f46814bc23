use axum::routing::{get, post};
use axum::Router;

pub mod list;
pub mod restore;
pub mod versions;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", get(list::handler))
        .route("/:file_id/versions", get(versions::handler))
        .route("/:file_id/restore", post(restore::handler))
        .with_state(state)
}
