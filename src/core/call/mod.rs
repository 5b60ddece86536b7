//! Call orchestration: the state machine plus the executor that performs its
//! actions against the outside world.

mod event;
mod locks;
mod machine;

pub use event::{Action, CallEvent};
pub use locks::CallLocks;
pub use machine::{AfterResponsePolicy, CallFlowConfig, CallStateMachine};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::core::providers::{AudioSource, TelephonyAdapter};
use crate::core::transcription::{RetryPolicy, TranscriptionReconciler};
use crate::errors::OrchestratorError;

/// Wires the state machine to the telephony adapter and the transcription
/// reconciler: one `dispatch` per inbound webhook or poll tick.
pub struct CallOrchestrator {
    machine: Arc<CallStateMachine>,
    reconciler: Arc<TranscriptionReconciler>,
    telephony: Arc<dyn TelephonyAdapter>,
    retry: RetryPolicy,
}

impl CallOrchestrator {
    pub fn new(
        machine: Arc<CallStateMachine>,
        reconciler: Arc<TranscriptionReconciler>,
        telephony: Arc<dyn TelephonyAdapter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            machine,
            reconciler,
            telephony,
            retry,
        }
    }

    pub fn reconciler(&self) -> &Arc<TranscriptionReconciler> {
        &self.reconciler
    }

    /// Place an outbound call. State is created later, when the provider
    /// reports the call answered.
    pub async fn place_call(&self, to: &str) -> Result<String, OrchestratorError> {
        let id = self.retry.run(|| self.telephony.place_call(to)).await?;
        info!(to, call_control_id = %id, "outbound call placed");
        Ok(id)
    }

    /// Apply one event and perform the resulting action.
    ///
    /// Unknown-call and stale-callback outcomes are logged and degrade to
    /// `Wait`: webhook providers retry on error responses, and replaying
    /// those events must stay a no-op.
    pub fn dispatch<'a>(
        &'a self,
        call_control_id: &'a str,
        event: CallEvent,
    ) -> Pin<Box<dyn Future<Output = Result<Action, OrchestratorError>> + Send + 'a>> {
        Box::pin(async move {
            debug!(call_control_id, event = event.kind(), "dispatching call event");
            let action = match self.machine.handle_event(call_control_id, event).await {
                Ok(action) => action,
                Err(err @ OrchestratorError::UnknownCall(_))
                | Err(err @ OrchestratorError::StaleCallback { .. }) => {
                    warn!(call_control_id, error = %err, "dropping event");
                    return Ok(Action::Wait);
                }
                Err(err) => return Err(err),
            };
            self.execute(call_control_id, action).await
        })
    }

    async fn execute(
        &self,
        call_control_id: &str,
        action: Action,
    ) -> Result<Action, OrchestratorError> {
        match &action {
            Action::PlayAudio { url, client_state } => {
                self.telephony_command(
                    call_control_id,
                    self.retry
                        .run(|| self.telephony.play_audio(call_control_id, url, client_state)),
                )
                .await?;
            }
            Action::StartRecording { client_state } => {
                self.telephony_command(
                    call_control_id,
                    self.retry
                        .run(|| self.telephony.start_recording(call_control_id, client_state)),
                )
                .await?;
            }
            Action::Hangup => {
                // Best effort: the call is already finalized in the store.
                if let Err(err) = self.retry.run(|| self.telephony.hangup(call_control_id)).await {
                    warn!(call_control_id, error = %err, "hangup command failed");
                }
            }
            Action::StartTranscription {
                audio_url,
                client_state,
            } => {
                let audio = AudioSource::Url(audio_url.clone());
                match self
                    .reconciler
                    .submit(call_control_id, client_state, &audio)
                    .await
                {
                    Ok(job) if job.status.is_terminal() => {
                        // Synchronous provider: feed the one and only
                        // transcription_ready event straight back in.
                        return self
                            .dispatch(
                                call_control_id,
                                CallEvent::TranscriptionReady { job_id: job.job_id },
                            )
                            .await;
                    }
                    Ok(job) => {
                        debug!(call_control_id, job_id = %job.job_id, "awaiting transcription");
                    }
                    Err(OrchestratorError::TranscriptionFailed { job_id, detail }) => {
                        // Policy: an exhausted job reads as an empty
                        // transcript, the call keeps moving.
                        warn!(call_control_id, %job_id, %detail, "transcription failed, continuing");
                        return self
                            .dispatch(call_control_id, CallEvent::TranscriptionReady { job_id })
                            .await;
                    }
                    Err(err) => return Err(err),
                }
            }
            Action::Wait => {}
        }
        Ok(action)
    }

    /// Run a side-effecting telephony command. An unavailable provider
    /// forces the call to `ended` and surfaces to the operator log instead
    /// of being retried indefinitely.
    async fn telephony_command(
        &self,
        call_control_id: &str,
        command: impl Future<Output = Result<(), crate::core::providers::ProviderError>>,
    ) -> Result<(), OrchestratorError> {
        if let Err(err) = command.await {
            error!(call_control_id, error = %err, "telephony provider unavailable, ending call");
            let _ = self
                .machine
                .handle_event(call_control_id, CallEvent::CallHangup)
                .await;
            return Err(OrchestratorError::ProviderUnavailable(err.to_string()));
        }
        Ok(())
    }

    /// Handle a transcription provider callback for `job_id`.
    pub async fn on_transcription_callback(
        &self,
        job_id: &str,
    ) -> Result<Action, OrchestratorError> {
        let job = self.reconciler.poll(job_id).await?;
        if !job.status.is_terminal() {
            return Ok(Action::Wait);
        }
        self.reconciler.untrack(job_id);
        self.dispatch(
            &job.call_control_id,
            CallEvent::TranscriptionReady {
                job_id: job_id.to_string(),
            },
        )
        .await
    }

    /// Drive pending transcription jobs and idle-call timeouts.
    ///
    /// The pending set is removed from before dispatching, so a completion
    /// observed by both this loop and a webhook callback still produces a
    /// single `transcription_ready` event.
    pub fn spawn_poller(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                orchestrator.poll_once().await;
            }
        })
    }

    /// One reconciliation sweep: poll every pending job, then tick every
    /// active call.
    pub async fn poll_once(&self) {
        for job_id in self.reconciler.pending_jobs() {
            match self.reconciler.poll(&job_id).await {
                Ok(job) if job.status.is_terminal() => {
                    if self.reconciler.untrack(&job_id) {
                        if let Err(err) = self
                            .dispatch(
                                &job.call_control_id,
                                CallEvent::TranscriptionReady {
                                    job_id: job_id.clone(),
                                },
                            )
                            .await
                        {
                            warn!(%job_id, error = %err, "failed to apply completed transcription");
                        }
                    }
                }
                Ok(_) => {}
                Err(err) => warn!(%job_id, error = %err, "transcription poll failed"),
            }
        }

        for call_control_id in self.machine.active_calls() {
            if let Err(err) = self.dispatch(&call_control_id, CallEvent::TimerTick).await {
                warn!(%call_control_id, error = %err, "timer tick failed");
            }
        }
    }
}
