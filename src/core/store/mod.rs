//! Durable session/state store shared across process instances.
//!
//! The store exclusively owns the durable representation of every record;
//! in-memory copies held during a handler invocation are borrowed and must
//! be re-persisted after mutation (last-writer-wins).

mod backend;
mod records;

pub use backend::{
    FilesystemStoreBackend, MemoryStoreBackend, StoreBackend, StoreConfig, StoreError,
};
pub use records::{
    CallStage, CallState, ChatTurn, JobStatus, TranscriptionJob, UserSession, unix_now,
};

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Per-record-class retention.
#[derive(Debug, Clone, Copy)]
pub struct RecordTtls {
    pub call: Duration,
    pub session: Duration,
    pub job: Duration,
    pub audio: Duration,
}

impl Default for RecordTtls {
    fn default() -> Self {
        Self {
            call: Duration::from_secs(60 * 60),
            session: Duration::from_secs(30 * 24 * 60 * 60),
            job: Duration::from_secs(60 * 60),
            audio: Duration::from_secs(15 * 60),
        }
    }
}

/// Typed facade over a [`StoreBackend`], addressing records by class-prefixed
/// keys: `call:{call_control_id}`, `session:{user_number}`, `job:{job_id}`,
/// `audio:{audio_id}`.
pub struct SessionStore {
    backend: Arc<dyn StoreBackend>,
    ttls: RecordTtls,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn StoreBackend>, ttls: RecordTtls) -> Self {
        Self { backend, ttls }
    }

    pub async fn from_config(config: StoreConfig, ttls: RecordTtls) -> Result<Self, StoreError> {
        Ok(Self::new(config.build().await?, ttls))
    }

    pub fn backend_type(&self) -> &str {
        self.backend.backend_type()
    }

    async fn put_record<T: Serialize>(
        &self,
        key: &str,
        record: &T,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let raw = serde_json::to_vec(record)?;
        debug!(key, size = raw.len(), "persisting record");
        self.backend.set(key, Bytes::from(raw), Some(ttl)).await
    }

    async fn get_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.backend.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn get_call(&self, call_control_id: &str) -> Result<Option<CallState>, StoreError> {
        self.get_record(&format!("call:{call_control_id}")).await
    }

    pub async fn put_call(&self, call: &CallState) -> Result<(), StoreError> {
        self.put_record(&format!("call:{}", call.call_control_id), call, self.ttls.call)
            .await
    }

    pub async fn delete_call(&self, call_control_id: &str) -> Result<(), StoreError> {
        self.backend.delete(&format!("call:{call_control_id}")).await
    }

    pub async fn get_session(&self, user_number: &str) -> Result<Option<UserSession>, StoreError> {
        self.get_record(&format!("session:{user_number}")).await
    }

    pub async fn put_session(&self, session: &UserSession) -> Result<(), StoreError> {
        self.put_record(
            &format!("session:{}", session.user_number),
            session,
            self.ttls.session,
        )
        .await
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Option<TranscriptionJob>, StoreError> {
        self.get_record(&format!("job:{job_id}")).await
    }

    pub async fn put_job(&self, job: &TranscriptionJob) -> Result<(), StoreError> {
        self.put_record(&format!("job:{}", job.job_id), job, self.ttls.job)
            .await
    }

    /// Stash synthesized speech so the telephony provider can fetch it by URL.
    pub async fn put_audio(&self, audio_id: &str, audio: Bytes) -> Result<(), StoreError> {
        self.backend
            .set(&format!("audio:{audio_id}"), audio, Some(self.ttls.audio))
            .await
    }

    pub async fn get_audio(&self, audio_id: &str) -> Result<Option<Bytes>, StoreError> {
        self.backend.get(&format!("audio:{audio_id}")).await
    }

    /// Write/read/delete probe used by the aggregate health endpoint.
    pub async fn health_check(&self) -> Result<(), StoreError> {
        let key = "health:probe";
        self.backend
            .set(key, Bytes::from_static(b"ok"), Some(Duration::from_secs(5)))
            .await?;
        match self.backend.get(key).await? {
            Some(value) if value.as_ref() == b"ok" => Ok(()),
            _ => Err(StoreError::Corrupt("health probe mismatch".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SessionStore {
        SessionStore::from_config(StoreConfig::default(), RecordTtls::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn call_state_persists_and_reloads() {
        let store = store().await;
        let mut call = CallState::new("v3:abc", "+15550100");
        call.stage = CallStage::Greeting;
        store.put_call(&call).await.unwrap();

        let loaded = store.get_call("v3:abc").await.unwrap().unwrap();
        assert_eq!(loaded, call);

        store.delete_call("v3:abc").await.unwrap();
        assert!(store.get_call("v3:abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn job_persists_by_id() {
        let store = store().await;
        let mut job = TranscriptionJob::new("job-1", "v3:abc", "rec-1");
        job.complete("hello");
        store.put_job(&job).await.unwrap();

        let loaded = store.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(loaded, job);
    }

    #[tokio::test]
    async fn audio_round_trips() {
        let store = store().await;
        store
            .put_audio("a1", Bytes::from_static(b"\x00\x01\x02"))
            .await
            .unwrap();
        assert_eq!(
            store.get_audio("a1").await.unwrap(),
            Some(Bytes::from_static(b"\x00\x01\x02"))
        );
    }

    #[tokio::test]
    async fn health_probe_succeeds_on_memory_backend() {
        let store = store().await;
        assert!(store.health_check().await.is_ok());
    }
}
