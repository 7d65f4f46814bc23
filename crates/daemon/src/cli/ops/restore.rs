use clap::Args;

use sheetvault_daemon::http_server::api::client::ApiError;
use sheetvault_daemon::http_server::api::v0::files::restore::{RestoreRequest, RestoreResponse};

#[derive(Args, Debug, Clone)]
pub struct Restore {
    /// File id to restore
    pub file_id: i64,

    /// Version number to restore
    pub version_number: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Restore {
    type Error = RestoreError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let request = RestoreRequest {
            file_id: self.file_id,
            version_number: self.version_number,
        };
        let response: RestoreResponse = ctx.client.call(request).await?;

        Ok(format!(
            "Restored file {} to version {}. Reopen the document.",
            response.file_id, response.version_number
        ))
    }
}
