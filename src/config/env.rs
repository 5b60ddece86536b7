use std::env;
use std::path::PathBuf;

use super::ServerConfig;
use super::validation::validate;

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl ServerConfig {
    /// Load configuration from environment variables, with sensible defaults.
    /// Also loads from a `.env` file if present using dotenvy.
    ///
    /// # Errors
    /// Returns an error if a numeric variable is malformed or the resulting
    /// configuration fails validation.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let _ = dotenvy::dotenv();

        let defaults = ServerConfig::default();

        let host = env_string("HOST", &defaults.host);
        let port = env::var("PORT")
            .unwrap_or_else(|_| defaults.port.to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid port number: {e}"))?;
        let public_url = env_string("PUBLIC_URL", &defaults.public_url);

        let telephony_provider = env_string("TELEPHONY_PROVIDER", &defaults.telephony_provider);
        let transcription_provider =
            env_string("TRANSCRIPTION_PROVIDER", &defaults.transcription_provider);
        let llm_provider = env_string("LLM_PROVIDER", &defaults.llm_provider);
        let tts_provider = env_string("TTS_PROVIDER", &defaults.tts_provider);

        let telnyx_api_key = env::var("TELNYX_API_KEY").ok();
        let telnyx_connection_id = env::var("TELNYX_CONNECTION_ID").ok();
        let telephony_from_number = env::var("TELEPHONY_FROM_NUMBER").ok();
        let assemblyai_api_key = env::var("ASSEMBLYAI_API_KEY").ok();
        let deepgram_api_key = env::var("DEEPGRAM_API_KEY").ok();
        let openai_api_key = env::var("OPENAI_API_KEY").ok();
        let llm_model = env_string("LLM_MODEL", &defaults.llm_model);
        let tts_model = env_string("TTS_MODEL", &defaults.tts_model);
        let tts_voice = env_string("TTS_VOICE", &defaults.tts_voice);
        let voice_style = env_string("VOICE_STYLE", &defaults.voice_style);

        let greeting_audio_url = env_string("GREETING_AUDIO_URL", &defaults.greeting_audio_url);
        let chat_intro_audio_url =
            env_string("CHAT_INTRO_AUDIO_URL", &defaults.chat_intro_audio_url);
        let after_response = env_string("AFTER_RESPONSE", &defaults.after_response);
        let max_chat_turns = env::var("MAX_CHAT_TURNS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.max_chat_turns);
        let call_timeout_seconds =
            env_u64("CALL_TIMEOUT_SECONDS", defaults.call_timeout_seconds);

        let poll_interval_seconds =
            env_u64("POLL_INTERVAL_SECONDS", defaults.poll_interval_seconds);
        let retry_max_retries = env::var("RETRY_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.retry_max_retries);
        let retry_base_delay_ms = env_u64("RETRY_BASE_DELAY_MS", defaults.retry_base_delay_ms);
        let retry_max_delay_ms = env_u64("RETRY_MAX_DELAY_MS", defaults.retry_max_delay_ms);
        let request_timeout_seconds =
            env_u64("REQUEST_TIMEOUT_SECONDS", defaults.request_timeout_seconds);

        let store_path = env::var("STORE_PATH").ok().map(PathBuf::from);
        let store_max_entries = env_u64("STORE_MAX_ENTRIES", defaults.store_max_entries);
        let call_ttl_seconds = env_u64("CALL_TTL_SECONDS", defaults.call_ttl_seconds);
        let session_ttl_seconds = env_u64("SESSION_TTL_SECONDS", defaults.session_ttl_seconds);
        let job_ttl_seconds = env_u64("JOB_TTL_SECONDS", defaults.job_ttl_seconds);
        let audio_ttl_seconds = env_u64("AUDIO_TTL_SECONDS", defaults.audio_ttl_seconds);

        let config = ServerConfig {
            host,
            port,
            public_url,
            telephony_provider,
            transcription_provider,
            llm_provider,
            tts_provider,
            telnyx_api_key,
            telnyx_connection_id,
            telephony_from_number,
            assemblyai_api_key,
            deepgram_api_key,
            openai_api_key,
            llm_model,
            tts_model,
            tts_voice,
            voice_style,
            greeting_audio_url,
            chat_intro_audio_url,
            after_response,
            max_chat_turns,
            call_timeout_seconds,
            poll_interval_seconds,
            retry_max_retries,
            retry_base_delay_ms,
            retry_max_delay_ms,
            request_timeout_seconds,
            store_path,
            store_max_entries,
            call_ttl_seconds,
            session_ttl_seconds,
            job_ttl_seconds,
            audio_ttl_seconds,
        };

        validate(&config)?;
        Ok(config)
    }
}
