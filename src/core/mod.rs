pub mod call;
pub mod pipeline;
pub mod providers;
pub mod store;
pub mod transcription;

pub use call::{
    Action, AfterResponsePolicy, CallEvent, CallFlowConfig, CallOrchestrator, CallStateMachine,
};
pub use pipeline::{ResponsePipeline, VoiceStyle};
pub use providers::{HealthStatus, ProviderError};
pub use store::{CallStage, CallState, JobStatus, SessionStore, TranscriptionJob, UserSession};
pub use transcription::{RetryPolicy, TranscriptionReconciler};
