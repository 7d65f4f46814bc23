use std::path::PathBuf;

#[derive(Debug)]
pub struct Config {
    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,

    // http server configuration
    /// Port for the API HTTP server.
    pub api_port: u16,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Default on-disk database location under the user's local data
    /// directory.
    pub fn default_sqlite_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("sheetvault").join("sheetvault.db"))
    }
}
