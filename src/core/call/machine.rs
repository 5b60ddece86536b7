//! The call state machine: one transition per event, one action out.
//!
//! `handle_event` is the only writer of `CallState`. Each invocation loads
//! the record, applies the transition table, persists the new state, and
//! returns the single next external side-effect for the caller to perform.
//! The machine never retries and never talks to the telephony provider
//! itself.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::event::{Action, CallEvent};
use super::locks::CallLocks;
use crate::core::pipeline::ResponsePipeline;
use crate::core::store::{CallStage, CallState, SessionStore};
use crate::errors::OrchestratorError;

/// What to do when an AI response finishes playing.
#[derive(Debug, Clone, PartialEq)]
pub enum AfterResponsePolicy {
    /// Thank the caller and end the call after the first response.
    HangUp,
    /// Keep the conversation going, up to `max_turns` AI responses.
    ContinueChat { max_turns: u32 },
}

/// Static inputs to the call flow.
#[derive(Debug, Clone)]
pub struct CallFlowConfig {
    /// Pre-rendered greeting prompt played when the call is answered.
    pub greeting_audio_url: String,
    /// Prompt inviting the caller to chat, played after the affirmation.
    pub chat_intro_audio_url: String,
    /// Externally reachable base URL of this server, used to serve
    /// synthesized replies back to the telephony provider.
    pub public_url: String,
    pub after_response: AfterResponsePolicy,
    /// Idle time after which a timer tick forces the call to end.
    pub call_timeout: Duration,
}

pub struct CallStateMachine {
    store: Arc<SessionStore>,
    pipeline: Arc<ResponsePipeline>,
    config: CallFlowConfig,
    locks: CallLocks,
}

fn new_client_state(purpose: &str) -> String {
    format!("{purpose}-{}", Uuid::new_v4())
}

impl CallStateMachine {
    pub fn new(
        store: Arc<SessionStore>,
        pipeline: Arc<ResponsePipeline>,
        config: CallFlowConfig,
    ) -> Self {
        Self {
            store,
            pipeline,
            config,
            locks: CallLocks::new(),
        }
    }

    /// Call ids with live state in this process, for the timeout sweep.
    pub fn active_calls(&self) -> Vec<String> {
        self.locks.active_ids()
    }

    /// Apply one event to one call.
    ///
    /// Load-modify-persist for a given call id is serialized by a per-call
    /// mutex, so a duplicate webhook delivered concurrently observes the
    /// post-transition state instead of racing a stale overwrite.
    pub async fn handle_event(
        &self,
        call_control_id: &str,
        event: CallEvent,
    ) -> Result<Action, OrchestratorError> {
        let _guard = self.locks.acquire(call_control_id).await;

        let mut call = match self.store.get_call(call_control_id).await? {
            Some(call) => call,
            None => match &event {
                CallEvent::CallAnswered { user_number } => {
                    info!(call_control_id, %user_number, "new call answered");
                    CallState::new(call_control_id, user_number.clone())
                }
                _ => {
                    self.locks.release(call_control_id);
                    return Err(OrchestratorError::UnknownCall(call_control_id.to_string()));
                }
            },
        };

        if call.stage.is_terminal() && event != CallEvent::CallHangup {
            debug!(call_control_id, event = event.kind(), "call already ended, refusing action");
            return Ok(Action::Wait);
        }

        let is_tick = event == CallEvent::TimerTick;
        let previous_stage = call.stage;
        let action = self.transition(&mut call, event).await?;

        // A tick must not refresh the idle clock it measures; an idle tick
        // changed nothing, so there is nothing to persist either.
        if !is_tick {
            call.touch();
            self.store.put_call(&call).await?;
        } else if previous_stage != call.stage {
            self.store.put_call(&call).await?;
        }

        if previous_stage != call.stage {
            info!(
                call_control_id,
                from = %previous_stage,
                to = %call.stage,
                action = action.kind(),
                "stage transition"
            );
        }
        if call.stage.is_terminal() {
            self.locks.release(call_control_id);
        }
        Ok(action)
    }

    async fn transition(
        &self,
        call: &mut CallState,
        event: CallEvent,
    ) -> Result<Action, OrchestratorError> {
        use CallStage::*;

        match (call.stage, event) {
            (_, CallEvent::CallHangup) => {
                call.finalize();
                Ok(Action::Wait)
            }

            (_, CallEvent::TimerTick) => {
                if call.idle_seconds() >= self.config.call_timeout.as_secs() {
                    warn!(
                        call_control_id = %call.call_control_id,
                        idle = call.idle_seconds(),
                        "call idle past timeout, forcing hangup"
                    );
                    call.finalize();
                    Ok(Action::Hangup)
                } else {
                    Ok(Action::Wait)
                }
            }

            (Init, CallEvent::CallAnswered { .. }) => {
                self.advance(call, Greeting)?;
                Ok(Action::PlayAudio {
                    url: self.config.greeting_audio_url.clone(),
                    client_state: new_client_state("greeting"),
                })
            }

            (Greeting, CallEvent::PlaybackFinished { .. }) => {
                self.advance(call, RecordingAffirmation)?;
                Ok(Action::StartRecording {
                    client_state: new_client_state("affirmation"),
                })
            }

            (RecordingAffirmation | RecordingChat, CallEvent::RecordingFinished { audio_url }) => {
                if audio_url.trim().is_empty() {
                    return Err(OrchestratorError::Validation(
                        "recording event carried no audio url".to_string(),
                    ));
                }
                // Stage is unchanged while the job is in flight; the token
                // lets us match the eventual callback to this recording.
                let client_state = new_client_state("transcription");
                call.pending_transcription = Some(client_state.clone());
                Ok(Action::StartTranscription {
                    audio_url,
                    client_state,
                })
            }

            (RecordingAffirmation, CallEvent::TranscriptionReady { job_id }) => {
                let text = self.resolve_transcript(call, &job_id).await?;
                call.affirmation = Some(text.clone());
                call.last_transcription = Some(text.clone());
                call.pending_transcription = None;
                self.pipeline
                    .remember_affirmation(&call.user_number, &text)
                    .await?;
                self.advance(call, ChatIntro)?;
                Ok(Action::PlayAudio {
                    url: self.config.chat_intro_audio_url.clone(),
                    client_state: new_client_state("chat_intro"),
                })
            }

            (ChatIntro, CallEvent::PlaybackFinished { .. }) => {
                self.advance(call, RecordingChat)?;
                Ok(Action::StartRecording {
                    client_state: new_client_state("chat"),
                })
            }

            (RecordingChat, CallEvent::TranscriptionReady { job_id }) => {
                let text = self.resolve_transcript(call, &job_id).await?;
                call.last_transcription = Some(text.clone());
                call.pending_transcription = None;

                let audio = self.pipeline.respond(&call.user_number, &text).await?;
                let url = self.publish_audio(audio).await?;

                call.chat_turns += 1;
                self.advance(call, AiResponse)?;
                Ok(Action::PlayAudio {
                    url,
                    client_state: new_client_state("ai_response"),
                })
            }

            (AiResponse, CallEvent::PlaybackFinished { .. }) => match self.config.after_response {
                AfterResponsePolicy::HangUp => {
                    call.finalize();
                    Ok(Action::Hangup)
                }
                AfterResponsePolicy::ContinueChat { max_turns } if call.chat_turns >= max_turns => {
                    info!(
                        call_control_id = %call.call_control_id,
                        turns = call.chat_turns,
                        "chat turn budget reached, ending call"
                    );
                    call.finalize();
                    Ok(Action::Hangup)
                }
                AfterResponsePolicy::ContinueChat { .. } => {
                    self.advance(call, RecordingChat)?;
                    Ok(Action::StartRecording {
                        client_state: new_client_state("chat"),
                    })
                }
            },

            (stage, event) => {
                warn!(
                    call_control_id = %call.call_control_id,
                    stage = %stage,
                    event = event.kind(),
                    "event not applicable in current stage, ignoring"
                );
                Ok(Action::Wait)
            }
        }
    }

    fn advance(&self, call: &mut CallState, next: CallStage) -> Result<(), OrchestratorError> {
        if !call.stage.can_transition_to(next) {
            return Err(OrchestratorError::Validation(format!(
                "illegal stage transition {} -> {next}",
                call.stage
            )));
        }
        call.stage = next;
        Ok(())
    }

    /// Load a terminal job and extract its transcript, enforcing the
    /// correlation token match. Errored jobs resolve to an empty transcript
    /// rather than aborting the call.
    async fn resolve_transcript(
        &self,
        call: &CallState,
        job_id: &str,
    ) -> Result<String, OrchestratorError> {
        let job = self.store.get_job(job_id).await?.ok_or_else(|| {
            OrchestratorError::StaleCallback {
                call_control_id: call.call_control_id.clone(),
                detail: format!("transcription callback for unknown job {job_id}"),
            }
        })?;

        if call.pending_transcription.as_deref() != Some(job.client_state.as_str()) {
            return Err(OrchestratorError::StaleCallback {
                call_control_id: call.call_control_id.clone(),
                detail: format!(
                    "job {job_id} client_state {:?} does not match pending {:?}",
                    job.client_state, call.pending_transcription
                ),
            });
        }

        if !job.status.is_terminal() {
            return Err(OrchestratorError::StaleCallback {
                call_control_id: call.call_control_id.clone(),
                detail: format!("job {job_id} is not terminal yet"),
            });
        }

        match job.text {
            Some(text) if job.status == crate::core::store::JobStatus::Completed => Ok(text),
            _ => {
                warn!(
                    call_control_id = %call.call_control_id,
                    job_id,
                    status = %job.status,
                    "transcription unavailable, continuing with empty transcript"
                );
                Ok(String::new())
            }
        }
    }

    async fn publish_audio(&self, audio: Bytes) -> Result<String, OrchestratorError> {
        let audio_id = Uuid::new_v4().to_string();
        self.store.put_audio(&audio_id, audio).await?;
        Ok(format!(
            "{}/audio/{}",
            self.config.public_url.trim_end_matches('/'),
            audio_id
        ))
    }
}
