use clap::Args;
use time::format_description::well_known::Rfc3339;

use sheetvault_daemon::http_server::api::client::ApiError;
use sheetvault_daemon::http_server::api::v0::files::versions::{VersionsRequest, VersionsResponse};

#[derive(Args, Debug, Clone)]
pub struct Versions {
    /// File id to list versions for
    pub file_id: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum VersionsError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Versions {
    type Error = VersionsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let request = VersionsRequest {
            file_id: self.file_id,
        };
        let response: VersionsResponse = ctx.client.call(request).await?;

        if response.versions.is_empty() {
            Ok(format!("No versions for {}", response.display_name))
        } else {
            let output = response
                .versions
                .iter()
                .map(|v| {
                    let when = v
                        .created_at
                        .format(&Rfc3339)
                        .unwrap_or_else(|_| v.created_at.to_string());
                    format!("version {}\t{}", v.version_number, when)
                })
                .collect::<Vec<_>>()
                .join("\n");
            Ok(format!("{}\n{}", response.display_name, output))
        }
    }
}
