pub mod config;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use self::core::*;
pub use errors::app_error::{AppError, AppResult};
pub use errors::orchestrator_error::OrchestratorError;
pub use state::AppState;
