use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::config::ServerConfig;
use crate::core::call::{
    AfterResponsePolicy, CallFlowConfig, CallOrchestrator, CallStateMachine,
};
use crate::core::pipeline::{ResponsePipeline, VoiceStyle};
use crate::core::providers::{
    self, LlmAdapter, TelephonyAdapter, TranscriptionAdapter, TtsAdapter,
};
use crate::core::store::{RecordTtls, SessionStore, StoreConfig};
use crate::core::transcription::{RetryPolicy, TranscriptionReconciler};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<SessionStore>,
    pub orchestrator: Arc<CallOrchestrator>,
    pub telephony: Arc<dyn TelephonyAdapter>,
    pub transcription: Arc<dyn TranscriptionAdapter>,
    pub llm: Arc<dyn LlmAdapter>,
    pub tts: Arc<dyn TtsAdapter>,
}

impl AppState {
    /// Build the full state from configuration, constructing the vendor
    /// adapters through the provider factories.
    pub async fn new(config: ServerConfig) -> anyhow::Result<Arc<Self>> {
        let telephony =
            providers::build_telephony(&config).context("building telephony adapter")?;
        let transcription =
            providers::build_transcription(&config).context("building transcription adapter")?;
        let llm = providers::build_llm(&config).context("building llm adapter")?;
        let tts = providers::build_tts(&config).context("building tts adapter")?;
        Self::with_adapters(config, telephony, transcription, llm, tts).await
    }

    /// Build state around caller-supplied adapters. Used by tests to swap in
    /// mock providers; `new` funnels through here.
    pub async fn with_adapters(
        config: ServerConfig,
        telephony: Arc<dyn TelephonyAdapter>,
        transcription: Arc<dyn TranscriptionAdapter>,
        llm: Arc<dyn LlmAdapter>,
        tts: Arc<dyn TtsAdapter>,
    ) -> anyhow::Result<Arc<Self>> {
        let store_config = match &config.store_path {
            Some(path) => StoreConfig::Filesystem { path: path.clone() },
            None => StoreConfig::Memory {
                max_entries: config.store_max_entries,
            },
        };
        let ttls = RecordTtls {
            call: Duration::from_secs(config.call_ttl_seconds),
            session: Duration::from_secs(config.session_ttl_seconds),
            job: Duration::from_secs(config.job_ttl_seconds),
            audio: Duration::from_secs(config.audio_ttl_seconds),
        };
        let store = Arc::new(
            SessionStore::from_config(store_config, ttls)
                .await
                .context("initializing session store")?,
        );

        let retry = RetryPolicy::new(
            config.retry_max_retries,
            Duration::from_millis(config.retry_base_delay_ms),
            Duration::from_millis(config.retry_max_delay_ms),
        )
        .with_jitter(Duration::from_millis(config.retry_base_delay_ms / 2));

        let pipeline = Arc::new(ResponsePipeline::new(
            store.clone(),
            llm.clone(),
            tts.clone(),
            VoiceStyle::resolve(&config.voice_style),
            retry.clone(),
        ));

        let after_response = match config.after_response.as_str() {
            "hangup" => AfterResponsePolicy::HangUp,
            _ => AfterResponsePolicy::ContinueChat {
                max_turns: config.max_chat_turns,
            },
        };
        let machine = Arc::new(CallStateMachine::new(
            store.clone(),
            pipeline,
            CallFlowConfig {
                greeting_audio_url: config.greeting_audio_url.clone(),
                chat_intro_audio_url: config.chat_intro_audio_url.clone(),
                public_url: config.public_url.clone(),
                after_response,
                call_timeout: config.call_timeout(),
            },
        ));

        let reconciler = Arc::new(TranscriptionReconciler::new(
            store.clone(),
            transcription.clone(),
            retry.clone(),
        ));

        let orchestrator = Arc::new(CallOrchestrator::new(
            machine,
            reconciler,
            telephony.clone(),
            retry,
        ));

        Ok(Arc::new(Self {
            config,
            store,
            orchestrator,
            telephony,
            transcription,
            llm,
            tts,
        }))
    }

    /// Start the background reconciliation loop.
    pub fn spawn_poller(&self) -> tokio::task::JoinHandle<()> {
        self.orchestrator.spawn_poller(self.config.poll_interval())
    }
}
