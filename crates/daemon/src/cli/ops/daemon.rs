use clap::Args;

use sheetvault_daemon::{spawn_service, ServiceConfig};

use crate::cli::op::DEFAULT_API_PORT;

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Path to the sqlite database (defaults to the user's local data dir)
    #[arg(long)]
    pub db_path: Option<std::path::PathBuf>,

    /// Keep all state in memory (history is lost on exit)
    #[arg(long, conflicts_with = "db_path")]
    pub in_memory: bool,

    /// API server port
    #[arg(long, default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<std::path::PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("no usable database location, pass --db-path or --in-memory")]
    NoDatabasePath,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let sqlite_path = if self.in_memory {
            None
        } else {
            Some(
                self.db_path
                    .clone()
                    .or_else(ServiceConfig::default_sqlite_path)
                    .ok_or(DaemonError::NoDatabasePath)?,
            )
        };

        let config = ServiceConfig {
            sqlite_path,
            api_port: self.api_port,
            log_level: tracing::Level::INFO,
            log_dir: self.log_dir.clone(),
        };

        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}
