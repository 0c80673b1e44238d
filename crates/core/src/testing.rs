//! Deterministic stand-ins for the embedding model and the vector index.

use crate::error::{EmbedError, StoreError};
use crate::models::IndexedEntry;
use crate::store::StoreHit;
use crate::traits::VectorIndex;
use crate::Embedder;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Embeds every text to the same unit vector and counts the calls.
#[derive(Default)]
pub struct FlatEmbedder {
    pub calls: AtomicUsize,
}

impl FlatEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FlatEmbedder {
    fn dimensions(&self) -> usize {
        2
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![1.0, 0.0])
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn dimensions(&self) -> usize {
        2
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Err(EmbedError::BackendResponse {
            status: 503,
            details: "model not loaded".to_string(),
        })
    }
}

/// In-memory index; `score` is reported on hits only when set.
#[derive(Default)]
pub struct MemoryIndex {
    pub entries: Mutex<Vec<IndexedEntry>>,
    pub wipes: AtomicUsize,
    pub score: Option<f32>,
}

impl MemoryIndex {
    pub fn with_score(score: f32) -> Self {
        Self {
            score: Some(score),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}

fn poisoned() -> StoreError {
    StoreError::Request("memory index lock poisoned".to_string())
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn insert(&self, entries: &[IndexedEntry]) -> Result<(), StoreError> {
        self.entries
            .lock()
            .map_err(|_| poisoned())?
            .extend_from_slice(entries);
        Ok(())
    }

    async fn query_nearest(&self, _vector: &[f32], k: usize) -> Result<Vec<StoreHit>, StoreError> {
        let entries = self.entries.lock().map_err(|_| poisoned())?;
        Ok(entries
            .iter()
            .take(k)
            .map(|entry| StoreHit {
                text: entry.chunk.text.clone(),
                source_name: Some(entry.chunk.source_name.clone()),
                file_type: Some(entry.chunk.file_type.to_string()),
                score: self.score,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.entries.lock().map_err(|_| poisoned())?.len())
    }

    async fn wipe(&self) -> Result<(), StoreError> {
        self.wipes.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().map_err(|_| poisoned())?.clear();
        Ok(())
    }
}

/// Every operation fails as if the backend were down.
pub struct UnreachableIndex;

fn unreachable_error() -> StoreError {
    StoreError::BackendResponse {
        backend: "test".to_string(),
        details: "connection refused".to_string(),
    }
}

#[async_trait]
impl VectorIndex for UnreachableIndex {
    async fn insert(&self, _entries: &[IndexedEntry]) -> Result<(), StoreError> {
        Err(unreachable_error())
    }

    async fn query_nearest(&self, _vector: &[f32], _k: usize) -> Result<Vec<StoreHit>, StoreError> {
        Err(unreachable_error())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Err(unreachable_error())
    }

    async fn wipe(&self) -> Result<(), StoreError> {
        Err(unreachable_error())
    }
}
