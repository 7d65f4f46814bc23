use std::path::PathBuf;

use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use crate::http_server::api::client::ApiRequest;
use crate::watch::WatchError;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct CreateRequest {
    /// Directory tree to start watching
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResponse {
    /// Canonical root path now under watch
    pub root: PathBuf,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<CreateRequest>,
) -> Result<impl IntoResponse, CreateError> {
    let root = state.watch_manager().watch(&req.path).await?;

    Ok((http::StatusCode::CREATED, Json(CreateResponse { root })).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error(transparent)]
    Watch(#[from] WatchError),
}

impl IntoResponse for CreateError {
    fn into_response(self) -> Response {
        let CreateError::Watch(e) = self;
        let status = match &e {
            WatchError::InvalidPath(_) => http::StatusCode::BAD_REQUEST,
            WatchError::AlreadyWatching(_) => http::StatusCode::CONFLICT,
            WatchError::Notify(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!("watch request failed: {}", e);
        (status, format!("{}", e)).into_response()
    }
}

// Client implementation - builds request for this operation
impl ApiRequest for CreateRequest {
    type Response = CreateResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/api/v0/watches").unwrap();
        client.post(full_url).json(&self)
    }
}
