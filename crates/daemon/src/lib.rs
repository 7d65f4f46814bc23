// Service modules (daemon functionality)
pub mod capture;
pub mod database;
pub mod http_server;
pub mod process;
pub mod restore;
pub mod retention;
pub mod service_config;
pub mod service_state;
pub mod watch;

// Re-exports for consumers
pub use process::{spawn_service, start_service, ShutdownHandle};
pub use service_config::Config as ServiceConfig;
pub use service_state::State as ServiceState;
