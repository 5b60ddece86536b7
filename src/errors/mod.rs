pub mod app_error;
pub mod orchestrator_error;

pub use app_error::{AppError, AppResult};
pub use orchestrator_error::OrchestratorError;
