//! Transcription reconciler: submits audio, tracks jobs, and polls them to
//! resolution.
//!
//! The reconciler hides the difference between asynchronous submit-then-poll
//! providers and synchronous providers that return text from `submit`. The
//! call state machine only ever sees `TranscriptionJob` records.

mod retry;

pub use retry::RetryPolicy;

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::providers::{
    AudioSource, SubmitResult, TranscriptionAdapter, TranscriptionCheck,
};
use crate::core::store::{JobStatus, SessionStore, TranscriptionJob};
use crate::errors::OrchestratorError;

pub struct TranscriptionReconciler {
    store: Arc<SessionStore>,
    adapter: Arc<dyn TranscriptionAdapter>,
    retry: RetryPolicy,
    /// Jobs this process submitted that have not yet resolved. Drives the
    /// poll loop; removal doubles as the exactly-once completion guard.
    pending: Mutex<HashSet<String>>,
}

impl TranscriptionReconciler {
    pub fn new(
        store: Arc<SessionStore>,
        adapter: Arc<dyn TranscriptionAdapter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            adapter,
            retry,
            pending: Mutex::new(HashSet::new()),
        }
    }

    /// Submit audio for transcription and persist the resulting job.
    ///
    /// Empty audio is rejected before any provider call. Transient provider
    /// failures are retried per the policy; exhausting the budget persists
    /// the job as `Error` and surfaces `TranscriptionFailed` so the caller
    /// can fall back to an empty transcript.
    pub async fn submit(
        &self,
        call_control_id: &str,
        client_state: &str,
        audio: &AudioSource,
    ) -> Result<TranscriptionJob, OrchestratorError> {
        if audio.is_empty() {
            return Err(OrchestratorError::Validation(
                "cannot transcribe empty audio input".to_string(),
            ));
        }

        match self.retry.run(|| self.adapter.submit(audio)).await {
            Ok(SubmitResult::Queued { job_ref }) => {
                let job = TranscriptionJob::new(job_ref, call_control_id, client_state);
                self.store.put_job(&job).await?;
                self.pending.lock().insert(job.job_id.clone());
                debug!(job_id = %job.job_id, call_control_id, "transcription job queued");
                Ok(job)
            }
            Ok(SubmitResult::Completed { text }) => {
                // Synchronous provider: terminal at submit time, nothing to poll.
                let mut job = TranscriptionJob::new(
                    Uuid::new_v4().to_string(),
                    call_control_id,
                    client_state,
                );
                job.complete(text);
                self.store.put_job(&job).await?;
                info!(job_id = %job.job_id, call_control_id, "transcription completed at submit");
                Ok(job)
            }
            Err(err) => {
                let mut job = TranscriptionJob::new(
                    Uuid::new_v4().to_string(),
                    call_control_id,
                    client_state,
                );
                job.fail();
                self.store.put_job(&job).await?;
                warn!(job_id = %job.job_id, call_control_id, error = %err, "transcription submit failed");
                Err(OrchestratorError::TranscriptionFailed {
                    job_id: job.job_id,
                    detail: err.to_string(),
                })
            }
        }
    }

    /// Check a job against the provider, persisting any status change.
    ///
    /// A no-op compatibility shim for jobs that are already terminal (the
    /// synchronous provider path): the stored job comes back unchanged.
    pub async fn poll(&self, job_id: &str) -> Result<TranscriptionJob, OrchestratorError> {
        let mut job = self.store.get_job(job_id).await?.ok_or_else(|| {
            OrchestratorError::StaleCallback {
                call_control_id: String::new(),
                detail: format!("unknown transcription job {job_id}"),
            }
        })?;

        if job.status.is_terminal() {
            return Ok(job);
        }

        let checked = self.retry.run(|| self.adapter.check(&job.job_id)).await;
        match checked {
            Ok(TranscriptionCheck::Pending) => {
                if job.status == JobStatus::Pending {
                    job.status = JobStatus::Processing;
                    self.store.put_job(&job).await?;
                }
                Ok(job)
            }
            Ok(TranscriptionCheck::Completed { text }) => {
                job.complete(text);
                self.store.put_job(&job).await?;
                info!(job_id = %job.job_id, call_control_id = %job.call_control_id, "transcription completed");
                Ok(job)
            }
            Ok(TranscriptionCheck::Failed { detail }) => {
                job.fail();
                self.store.put_job(&job).await?;
                warn!(job_id = %job.job_id, %detail, "transcription job failed at provider");
                Ok(job)
            }
            Err(err) => {
                job.fail();
                self.store.put_job(&job).await?;
                warn!(job_id = %job.job_id, error = %err, "transcription poll exhausted retries");
                Ok(job)
            }
        }
    }

    /// Job ids awaiting resolution, for the poll loop.
    pub fn pending_jobs(&self) -> Vec<String> {
        self.pending.lock().iter().cloned().collect()
    }

    /// Remove a job from the pending set. Returns whether it was present,
    /// which callers use as the dispatch-once guard.
    pub fn untrack(&self, job_id: &str) -> bool {
        self.pending.lock().remove(job_id)
    }
}
