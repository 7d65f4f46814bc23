use axum::Router;

pub mod files;
pub mod watches;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .nest("/watches", watches::router(state.clone()))
        .nest("/files", files::router(state.clone()))
        .with_state(state)
}
