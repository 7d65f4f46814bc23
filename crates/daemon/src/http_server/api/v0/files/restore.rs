use axum::extract::{Json, Path, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use crate::http_server::api::client::ApiRequest;
use crate::restore::RestoreError;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct RestoreRequest {
    /// File id to restore
    #[serde(skip_serializing, default)]
    pub file_id: i64,

    /// Version number to restore
    pub version_number: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreResponse {
    pub file_id: i64,
    pub version_number: i64,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(file_id): Path<i64>,
    Json(req): Json<RestoreRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    state
        .restore()
        .restore(file_id, req.version_number)
        .await?;

    Ok((
        http::StatusCode::OK,
        Json(RestoreResponse {
            file_id,
            version_number: req.version_number,
        }),
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Restore(#[from] RestoreError),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let HandlerError::Restore(e) = self;
        let status = match &e {
            RestoreError::NotFound => http::StatusCode::NOT_FOUND,
            RestoreError::FileLocked => http::StatusCode::CONFLICT,
            RestoreError::Database(_)
            | RestoreError::CorruptEnvelope(_)
            | RestoreError::CorruptPayload(_)
            | RestoreError::Io(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == http::StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("restore failed: {}", e);
        }
        (status, format!("{}", e)).into_response()
    }
}

// Client implementation - builds request for this operation
impl ApiRequest for RestoreRequest {
    type Response = RestoreResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url
            .join(&format!("/api/v0/files/{}/restore", self.file_id))
            .unwrap();
        client.post(full_url).json(&self)
    }
}
