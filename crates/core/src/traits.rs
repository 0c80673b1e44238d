use crate::error::StoreError;
use crate::models::IndexedEntry;
use crate::store::StoreHit;
use async_trait::async_trait;

/// Persistent (vector, chunk) storage for a single named collection.
///
/// Implementations must tolerate concurrent readers. Writers (`insert`, `wipe`)
/// are serialized by the caller.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn insert(&self, entries: &[IndexedEntry]) -> Result<(), StoreError>;

    /// Up to `k` entries, nearest first.
    async fn query_nearest(&self, vector: &[f32], k: usize) -> Result<Vec<StoreHit>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    /// Drops every entry together with whatever the backend persisted for them.
    async fn wipe(&self) -> Result<(), StoreError>;
}
