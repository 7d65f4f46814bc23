use clap::Args;

use sheetvault_daemon::http_server::api::client::ApiError;
use sheetvault_daemon::http_server::api::v0::watches::create::{CreateRequest, CreateResponse};

#[derive(Args, Debug, Clone)]
pub struct Watch {
    /// Directory tree to start watching
    pub path: std::path::PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Watch {
    type Error = WatchError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let request = CreateRequest {
            path: self.path.clone(),
        };

        let response: CreateResponse = ctx.client.call(request).await?;
        Ok(format!("Now watching: {}", response.root.display()))
    }
}
