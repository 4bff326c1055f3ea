use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, Semaphore};

use super::BlobStore;
use crate::errors::ServiceError;

/// In-process blob store for embedding and tests.
///
/// Clones share state, so a caller can keep a handle to inspect what the
/// registry saved. Saves can be forced to fail or held open behind a gate.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    blob: Mutex<Option<Value>>,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
    saves_started: AtomicUsize,
    saves_done: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing blob, as if loaded from an earlier run.
    pub fn with_blob(blob: Value) -> Self {
        let inner = Inner { blob: Mutex::new(Some(blob)), ..Inner::default() };
        Self { inner: Arc::new(inner) }
    }

    /// Every save waits for one permit from `gate` before completing.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        let inner = Inner { gate: Some(gate), ..Inner::default() };
        Self { inner: Arc::new(inner) }
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.inner.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.inner.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn saves_started(&self) -> usize {
        self.inner.saves_started.load(Ordering::SeqCst)
    }

    pub fn saves_done(&self) -> usize {
        self.inner.saves_done.load(Ordering::SeqCst)
    }

    /// Last successfully saved blob.
    pub async fn snapshot(&self) -> Option<Value> {
        self.inner.blob.lock().await.clone()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn load(&self) -> Result<Option<Value>, ServiceError> {
        if self.inner.fail_loads.load(Ordering::SeqCst) {
            return Err(ServiceError::Storage("backend unavailable".into()));
        }
        Ok(self.inner.blob.lock().await.clone())
    }

    async fn save(&self, data: &Value) -> Result<(), ServiceError> {
        self.inner.saves_started.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.inner.gate {
            let permit = gate.acquire().await.map_err(|e| ServiceError::Storage(e.to_string()))?;
            permit.forget();
        }
        if self.inner.fail_saves.load(Ordering::SeqCst) {
            return Err(ServiceError::Storage("disk full".into()));
        }
        *self.inner.blob.lock().await = Some(data.clone());
        self.inner.saves_done.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
