//! Shared test fixtures: mock provider adapters and state construction.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use morning_coffee::config::ServerConfig;
use morning_coffee::core::providers::{
    AudioSource, HealthStatus, LlmAdapter, LlmMessage, ProviderError, SubmitResult,
    TelephonyAdapter, TranscriptionAdapter, TranscriptionCheck, TtsAdapter,
};
use morning_coffee::state::AppState;

/// Telephony mock that records every command it receives.
#[derive(Default)]
pub struct MockTelephony {
    pub commands: Mutex<Vec<String>>,
    pub unhealthy: AtomicBool,
}

impl MockTelephony {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    fn record(&self, command: String) {
        self.commands.lock().push(command);
    }
}

#[async_trait]
impl TelephonyAdapter for MockTelephony {
    async fn place_call(&self, to: &str) -> Result<String, ProviderError> {
        self.record(format!("place_call:{to}"));
        Ok(format!("call-{to}"))
    }

    async fn play_audio(
        &self,
        call_control_id: &str,
        url: &str,
        _client_state: &str,
    ) -> Result<(), ProviderError> {
        self.record(format!("play_audio:{call_control_id}:{url}"));
        Ok(())
    }

    async fn start_recording(
        &self,
        call_control_id: &str,
        _client_state: &str,
    ) -> Result<(), ProviderError> {
        self.record(format!("start_recording:{call_control_id}"));
        Ok(())
    }

    async fn stop_recording(&self, call_control_id: &str) -> Result<(), ProviderError> {
        self.record(format!("stop_recording:{call_control_id}"));
        Ok(())
    }

    async fn hangup(&self, call_control_id: &str) -> Result<(), ProviderError> {
        self.record(format!("hangup:{call_control_id}"));
        Ok(())
    }

    async fn send_message(&self, to: &str, text: &str) -> Result<(), ProviderError> {
        self.record(format!("send_message:{to}:{text}"));
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        if self.unhealthy.load(Ordering::SeqCst) {
            HealthStatus::unhealthy("mock telephony down")
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Transcription mock covering both provider shapes.
///
/// Async shape: `submit` queues `job-N`, `check` answers `Pending` a
/// configured number of times and then `Completed` with the scripted text.
/// Sync shape: `submit` returns the text terminally.
pub struct MockTranscription {
    pub synchronous: bool,
    pub text: Mutex<String>,
    pub submit_calls: AtomicU32,
    pub check_calls: AtomicU32,
    /// Transient failures to serve before `check` succeeds.
    pub check_failures: AtomicU32,
    /// `Pending` answers to serve before `check` completes.
    pub pending_checks: AtomicU32,
    /// When set, `submit` fails permanently.
    pub fail_submit: AtomicBool,
    next_job: AtomicU32,
}

impl MockTranscription {
    pub fn asynchronous(text: &str) -> Arc<Self> {
        Arc::new(Self {
            synchronous: false,
            text: Mutex::new(text.to_string()),
            submit_calls: AtomicU32::new(0),
            check_calls: AtomicU32::new(0),
            check_failures: AtomicU32::new(0),
            pending_checks: AtomicU32::new(0),
            fail_submit: AtomicBool::new(false),
            next_job: AtomicU32::new(1),
        })
    }

    pub fn synchronous(text: &str) -> Arc<Self> {
        Arc::new(Self {
            synchronous: true,
            text: Mutex::new(text.to_string()),
            submit_calls: AtomicU32::new(0),
            check_calls: AtomicU32::new(0),
            check_failures: AtomicU32::new(0),
            pending_checks: AtomicU32::new(0),
            fail_submit: AtomicBool::new(false),
            next_job: AtomicU32::new(1),
        })
    }

    pub fn set_text(&self, text: &str) {
        *self.text.lock() = text.to_string();
    }

    fn take_one(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl TranscriptionAdapter for MockTranscription {
    async fn submit(&self, _audio: &AudioSource) -> Result<SubmitResult, ProviderError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(ProviderError::Permanent("mock submit rejected".into()));
        }
        if self.synchronous {
            return Ok(SubmitResult::Completed {
                text: self.text.lock().clone(),
            });
        }
        let n = self.next_job.fetch_add(1, Ordering::SeqCst);
        Ok(SubmitResult::Queued {
            job_ref: format!("job-{n}"),
        })
    }

    async fn check(&self, _job_ref: &str) -> Result<TranscriptionCheck, ProviderError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_one(&self.check_failures) {
            return Err(ProviderError::Transient("mock transcription flake".into()));
        }
        if Self::take_one(&self.pending_checks) {
            return Ok(TranscriptionCheck::Pending);
        }
        Ok(TranscriptionCheck::Completed {
            text: self.text.lock().clone(),
        })
    }

    fn is_synchronous(&self) -> bool {
        self.synchronous
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}

/// LLM mock returning a fixed reply and capturing the request messages.
pub struct MockLlm {
    pub reply: String,
    pub requests: Mutex<Vec<Vec<LlmMessage>>>,
}

impl MockLlm {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LlmAdapter for MockLlm {
    async fn complete(&self, messages: &[LlmMessage]) -> Result<String, ProviderError> {
        self.requests.lock().push(messages.to_vec());
        Ok(self.reply.clone())
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}

pub struct MockTts;

impl MockTts {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl TtsAdapter for MockTts {
    async fn synthesize(
        &self,
        _text: &str,
        _style: &morning_coffee::core::pipeline::VoiceStyle,
    ) -> Result<Bytes, ProviderError> {
        Ok(Bytes::from_static(b"mock-mp3-bytes"))
    }

    async fn list_voices(&self) -> Result<Vec<String>, ProviderError> {
        Ok(vec!["alloy".to_string(), "nova".to_string()])
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}

/// A configuration suitable for driving full call flows in-process.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.public_url = "http://coffee.test".to_string();
    config.greeting_audio_url = "http://cdn.test/greeting.mp3".to_string();
    config.chat_intro_audio_url = "http://cdn.test/chat-intro.mp3".to_string();
    config.after_response = "continue".to_string();
    config.max_chat_turns = 2;
    // Keep retry backoff out of test wall-clock time.
    config.retry_base_delay_ms = 1;
    config.retry_max_delay_ms = 2;
    config
}

pub async fn build_state(
    config: ServerConfig,
    telephony: Arc<MockTelephony>,
    transcription: Arc<MockTranscription>,
    llm: Arc<MockLlm>,
) -> Arc<AppState> {
    AppState::with_adapters(config, telephony, transcription, llm, MockTts::new())
        .await
        .expect("state construction")
}
