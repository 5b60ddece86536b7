//! Response pipeline: transcript in, synthesized speech out.
//!
//! Composes the user's transcript with their running conversation history
//! into an LLM request, then feeds the reply into TTS. The caller decides
//! what to do with the audio; the pipeline never persists it.

mod voice_style;

pub use voice_style::VoiceStyle;

use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::providers::{LlmAdapter, LlmMessage, TtsAdapter};
use crate::core::store::SessionStore;
use crate::core::store::UserSession;
use crate::core::transcription::RetryPolicy;
use crate::errors::OrchestratorError;

/// Fixed system preamble. Replies are read aloud over a phone line, so the
/// persona is held to roughly two short sentences.
const ASSISTANT_PREAMBLE: &str = "You are Morning Coffee, a friendly voice assistant on a \
    phone call. Reply in at most two short sentences, since your words are spoken aloud. \
    If the caller's words are empty or unclear, gently ask them to repeat themselves.";

pub struct ResponsePipeline {
    store: Arc<SessionStore>,
    llm: Arc<dyn LlmAdapter>,
    tts: Arc<dyn TtsAdapter>,
    voice_style: VoiceStyle,
    retry: RetryPolicy,
}

impl ResponsePipeline {
    pub fn new(
        store: Arc<SessionStore>,
        llm: Arc<dyn LlmAdapter>,
        tts: Arc<dyn TtsAdapter>,
        voice_style: VoiceStyle,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            llm,
            tts,
            voice_style,
            retry,
        }
    }

    /// Generate a spoken reply to `transcript` for `user_number`.
    ///
    /// Appends the user turn and the assistant reply to the session before
    /// returning, so the next call sees the full history.
    pub async fn respond(
        &self,
        user_number: &str,
        transcript: &str,
    ) -> Result<Bytes, OrchestratorError> {
        let mut session = self
            .store
            .get_session(user_number)
            .await?
            .unwrap_or_else(|| UserSession::new(user_number));

        session.push_turn("user", transcript);

        let messages = build_messages(&session);
        debug!(user_number, turns = messages.len(), "requesting completion");

        let reply = self.retry.run(|| self.llm.complete(&messages)).await?;
        info!(user_number, reply_len = reply.len(), "assistant reply generated");

        session.push_turn("assistant", &reply);
        self.store.put_session(&session).await?;

        let audio = self
            .retry
            .run(|| self.tts.synthesize(&reply, &self.voice_style))
            .await?;
        Ok(audio)
    }

    /// Record the caller's affirmation on their session for later context.
    pub async fn remember_affirmation(
        &self,
        user_number: &str,
        affirmation: &str,
    ) -> Result<(), OrchestratorError> {
        let mut session = self
            .store
            .get_session(user_number)
            .await?
            .unwrap_or_else(|| UserSession::new(user_number));
        session.affirmation = Some(affirmation.to_string());
        self.store.put_session(&session).await?;
        Ok(())
    }
}

fn build_messages(session: &UserSession) -> Vec<LlmMessage> {
    let mut preamble = ASSISTANT_PREAMBLE.to_string();
    if let Some(affirmation) = &session.affirmation {
        preamble.push_str(&format!(
            " The caller's affirmation for today is: \"{affirmation}\"."
        ));
    }

    let mut messages = vec![LlmMessage::new("system", preamble)];
    messages.extend(
        session
            .conversation_history
            .iter()
            .map(|turn| LlmMessage::new(turn.role.clone(), turn.content.clone())),
    );
    messages
}
