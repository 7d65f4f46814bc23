use axum::extract::{Json, Path, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct VersionsRequest {
    /// File id to list versions for
    pub file_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionsResponse {
    pub file_id: i64,
    pub display_name: String,
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version_number: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(file_id): Path<i64>,
) -> Result<impl IntoResponse, VersionsError> {
    let file = state
        .database()
        .get_file(file_id)
        .await?
        .ok_or(VersionsError::NotFound)?;

    let versions = state
        .database()
        .list_versions(file_id)
        .await?
        .into_iter()
        .map(|v| VersionEntry {
            version_number: v.version_number,
            created_at: v.created_at,
        })
        .collect();

    Ok((
        http::StatusCode::OK,
        Json(VersionsResponse {
            file_id,
            display_name: file.display_name,
            versions,
        }),
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum VersionsError {
    #[error("no such file")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for VersionsError {
    fn into_response(self) -> Response {
        match self {
            VersionsError::NotFound => {
                (http::StatusCode::NOT_FOUND, "no such file").into_response()
            }
            VersionsError::Database(e) => {
                tracing::error!("version listing failed: {}", e);
                (
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Error: {}", e),
                )
                    .into_response()
            }
        }
    }
}

// Client implementation - builds request for this operation
impl ApiRequest for VersionsRequest {
    type Response = VersionsResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url
            .join(&format!("/api/v0/files/{}/versions", self.file_id))
            .unwrap();
        client.get(full_url)
    }
}
