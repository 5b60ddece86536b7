//! Server configuration.
//!
//! Configuration comes from environment variables (with a `.env` file picked
//! up via dotenvy when present). Provider selection, call-flow behavior, and
//! store retention are all plain fields here; the rest of the crate never
//! reads the environment directly.

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod validation;

/// Complete server configuration.
///
/// Defaults are suitable for local development against in-memory storage;
/// provider API keys are `None` until set and validated at adapter build
/// time, not here.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL of this server. The telephony provider
    /// fetches synthesized audio from `{public_url}/audio/{id}`.
    pub public_url: String,

    // Provider selection
    pub telephony_provider: String,
    pub transcription_provider: String,
    pub llm_provider: String,
    pub tts_provider: String,

    // Provider credentials and settings
    pub telnyx_api_key: Option<String>,
    pub telnyx_connection_id: Option<String>,
    pub telephony_from_number: Option<String>,
    pub assemblyai_api_key: Option<String>,
    pub deepgram_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub llm_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    /// Preset name or free-form style instruction for synthesized speech.
    pub voice_style: String,

    // Call flow
    pub greeting_audio_url: String,
    pub chat_intro_audio_url: String,
    /// "hangup" to end after the first AI response, "continue" to keep
    /// chatting up to `max_chat_turns`.
    pub after_response: String,
    pub max_chat_turns: u32,
    pub call_timeout_seconds: u64,

    // Reconciliation
    pub poll_interval_seconds: u64,
    pub retry_max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub request_timeout_seconds: u64,

    // Store configuration (filesystem or memory)
    pub store_path: Option<PathBuf>, // if None, use the in-memory store
    pub store_max_entries: u64,
    pub call_ttl_seconds: u64,
    pub session_ttl_seconds: u64,
    pub job_ttl_seconds: u64,
    pub audio_ttl_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            public_url: "http://localhost:3001".to_string(),
            telephony_provider: "telnyx".to_string(),
            transcription_provider: "assemblyai".to_string(),
            llm_provider: "openai".to_string(),
            tts_provider: "openai".to_string(),
            telnyx_api_key: None,
            telnyx_connection_id: None,
            telephony_from_number: None,
            assemblyai_api_key: None,
            deepgram_api_key: None,
            openai_api_key: None,
            llm_model: "gpt-4o-mini".to_string(),
            tts_model: "gpt-4o-mini-tts".to_string(),
            tts_voice: "alloy".to_string(),
            voice_style: String::new(),
            greeting_audio_url: String::new(),
            chat_intro_audio_url: String::new(),
            after_response: "continue".to_string(),
            max_chat_turns: 10,
            call_timeout_seconds: 300,
            poll_interval_seconds: 2,
            retry_max_retries: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 8_000,
            request_timeout_seconds: 30,
            store_path: None,
            store_max_entries: 100_000,
            call_ttl_seconds: 60 * 60,
            session_ttl_seconds: 30 * 24 * 60 * 60,
            job_ttl_seconds: 60 * 60,
            audio_ttl_seconds: 15 * 60,
        }
    }
}

impl ServerConfig {
    /// The socket address to bind.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Per-request timeout applied to every outbound provider HTTP call.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_combines_host_and_port() {
        let mut config = ServerConfig::default();
        config.host = "127.0.0.1".to_string();
        config.port = 8080;
        assert_eq!(config.address(), "127.0.0.1:8080");
    }

    #[test]
    fn default_timeouts() {
        let config = ServerConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.call_timeout(), Duration::from_secs(300));
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
    }
}
