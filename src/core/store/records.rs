//! Typed records persisted in the session store.
//!
//! Every record serializes to a flat field/value mapping. Each field carries
//! a serde default so that records written by an older process instance (or
//! with fields missing entirely) deserialize cleanly instead of erroring:
//! a missing `stage` resolves to `Init`, missing optionals to `None`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as unix seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Position of a call in the orchestration sequence.
///
/// Stages advance forward along the transition table, loop between
/// `RecordingChat` and `AiResponse` while chatting, or jump directly to
/// `Ended` on hangup. Nothing else is a legal move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStage {
    #[default]
    Init,
    Greeting,
    RecordingAffirmation,
    ChatIntro,
    RecordingChat,
    AiResponse,
    Ended,
}

impl CallStage {
    pub fn is_terminal(self) -> bool {
        self == CallStage::Ended
    }

    /// Whether `next` is reachable from `self` in a single transition.
    ///
    /// Staying put is always allowed (e.g. a recording stage awaiting its
    /// transcription job), as is jumping straight to `Ended`.
    pub fn can_transition_to(self, next: CallStage) -> bool {
        use CallStage::*;
        if next == Ended || next == self {
            return self != Ended || next == Ended;
        }
        matches!(
            (self, next),
            (Init, Greeting)
                | (Greeting, RecordingAffirmation)
                | (RecordingAffirmation, ChatIntro)
                | (ChatIntro, RecordingChat)
                | (RecordingChat, AiResponse)
                | (AiResponse, RecordingChat)
        )
    }
}

impl fmt::Display for CallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallStage::Init => "init",
            CallStage::Greeting => "greeting",
            CallStage::RecordingAffirmation => "recording_affirmation",
            CallStage::ChatIntro => "chat_intro",
            CallStage::RecordingChat => "recording_chat",
            CallStage::AiResponse => "ai_response",
            CallStage::Ended => "ended",
        };
        write!(f, "{name}")
    }
}

/// Durable state for one active call. Mutated exclusively by the call state
/// machine; destroyed (or left to TTL-expire) once the stage reaches `Ended`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallState {
    pub call_control_id: String,
    #[serde(default)]
    pub user_number: String,
    #[serde(default)]
    pub stage: CallStage,
    /// Text captured from the first recording of the call.
    #[serde(default)]
    pub affirmation: Option<String>,
    #[serde(default)]
    pub last_transcription: Option<String>,
    /// Correlation token of the in-flight transcription job, if any.
    /// Callbacks whose token does not match this value are stale.
    #[serde(default)]
    pub pending_transcription: Option<String>,
    /// Number of AI responses played back so far on this call.
    #[serde(default)]
    pub chat_turns: u32,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub last_updated: u64,
    #[serde(default)]
    pub end_time: Option<u64>,
}

impl CallState {
    pub fn new(call_control_id: impl Into<String>, user_number: impl Into<String>) -> Self {
        let now = unix_now();
        Self {
            call_control_id: call_control_id.into(),
            user_number: user_number.into(),
            stage: CallStage::Init,
            affirmation: None,
            last_transcription: None,
            pending_transcription: None,
            chat_turns: 0,
            created_at: now,
            last_updated: now,
            end_time: None,
        }
    }

    pub fn touch(&mut self) {
        self.last_updated = unix_now();
    }

    /// Terminate the call: jump to `Ended` and record `end_time`.
    pub fn finalize(&mut self) {
        if self.end_time.is_none() {
            self.end_time = Some(unix_now());
        }
        self.stage = CallStage::Ended;
        self.pending_transcription = None;
    }

    /// Seconds since this record was last written.
    pub fn idle_seconds(&self) -> u64 {
        unix_now().saturating_sub(self.last_updated)
    }
}

/// One turn of conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: u64,
}

/// Per-phone-number session, independent of any single call.
///
/// Holds the running conversation history fed to the LLM and the cached
/// affirmation. Never deleted by the core; store TTL governs retention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_number: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatTurn>,
    #[serde(default)]
    pub affirmation: Option<String>,
}

impl UserSession {
    pub fn new(user_number: impl Into<String>) -> Self {
        Self {
            user_number: user_number.into(),
            conversation_history: Vec::new(),
            affirmation: None,
        }
    }

    pub fn push_turn(&mut self, role: impl Into<String>, content: impl Into<String>) {
        self.conversation_history.push(ChatTurn {
            role: role.into(),
            content: content.into(),
            timestamp: unix_now(),
        });
    }
}

/// Lifecycle status of a transcription job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// One submitted transcription, tracked by id until resolution.
///
/// Once `status` reaches `Completed` or `Error` it is terminal and
/// `completed_at` is set exactly once on that transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionJob {
    /// Provider-assigned reference, or a synthesized uuid when the provider
    /// resolves synchronously and never hands one out.
    pub job_id: String,
    #[serde(default)]
    pub call_control_id: String,
    /// Opaque correlation token matched against `CallState::pending_transcription`.
    #[serde(default)]
    pub client_state: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub start_time: u64,
    #[serde(default)]
    pub completed_at: Option<u64>,
}

impl TranscriptionJob {
    pub fn new(
        job_id: impl Into<String>,
        call_control_id: impl Into<String>,
        client_state: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            call_control_id: call_control_id.into(),
            client_state: client_state.into(),
            status: JobStatus::Pending,
            text: None,
            start_time: unix_now(),
            completed_at: None,
        }
    }

    /// Transition to `Completed`. A no-op if the job is already terminal.
    pub fn complete(&mut self, text: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Completed;
        self.text = Some(text.into());
        self.completed_at = Some(unix_now());
    }

    /// Transition to `Error`. A no-op if the job is already terminal.
    pub fn fail(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Error;
        self.completed_at = Some(unix_now());
    }
}
