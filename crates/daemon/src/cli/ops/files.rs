use clap::Args;

use sheetvault_daemon::http_server::api::client::ApiError;
use sheetvault_daemon::http_server::api::v0::files::list::{ListRequest, ListResponse};

#[derive(Args, Debug, Clone)]
pub struct Files;

#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Files {
    type Error = FilesError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response: ListResponse = ctx.client.call(ListRequest::default()).await?;

        if response.files.is_empty() {
            Ok("No tracked files".to_string())
        } else {
            let output = response
                .files
                .iter()
                .map(|f| format!("{}\t{}\t{}", f.id, f.display_name, f.path))
                .collect::<Vec<_>>()
                .join("\n");
            Ok(output)
        }
    }
}
