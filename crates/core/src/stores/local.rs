use crate::error::StoreError;
use crate::models::IndexedEntry;
use crate::store::StoreHit;
use crate::traits::VectorIndex;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const COLLECTION_FILE: &str = "collection.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CollectionFile {
    collection: String,
    dimensions: Option<usize>,
    updated_at: Option<DateTime<Utc>>,
    entries: Vec<IndexedEntry>,
}

/// File-backed collection kept fully in memory and ranked exhaustively.
///
/// Layout: `{index_dir}/{collection}/collection.json`. Vectors are expected
/// to be unit length so the dot product is the cosine similarity.
pub struct LocalVectorStore {
    index_dir: PathBuf,
    collection: String,
    state: RwLock<CollectionFile>,
}

impl LocalVectorStore {
    pub async fn open(
        index_dir: impl Into<PathBuf>,
        collection: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let index_dir = index_dir.into();
        let collection = collection.into();
        let path = collection_path(&index_dir, &collection);

        let empty = CollectionFile {
            collection: collection.clone(),
            ..Default::default()
        };

        // An unreadable collection opens empty so a forced reindex can replace it.
        let state = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<CollectionFile>(&bytes) {
                Ok(file) => {
                    info!(path = %path.display(), entries = file.entries.len(), "opened local collection");
                    file
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "collection file is corrupt, starting empty");
                    empty
                }
            },
            Err(error) if error.kind() == ErrorKind::NotFound => empty,
            Err(error) => return Err(error.into()),
        };

        Ok(Self {
            index_dir,
            collection,
            state: RwLock::new(state),
        })
    }

    async fn persist(&self, state: &CollectionFile) -> Result<(), StoreError> {
        let path = collection_path(&self.index_dir, &self.collection);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let staging = path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec(state)?).await?;
        fs::rename(&staging, &path).await?;
        debug!(path = %path.display(), entries = state.entries.len(), "persisted collection");
        Ok(())
    }
}

fn collection_path(index_dir: &Path, collection: &str) -> PathBuf {
    index_dir.join(collection).join(COLLECTION_FILE)
}

fn dot(left: &[f32], right: &[f32]) -> f32 {
    left.iter().zip(right).map(|(a, b)| a * b).sum()
}

#[async_trait]
impl VectorIndex for LocalVectorStore {
    async fn insert(&self, entries: &[IndexedEntry]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write().await;
        let expected = state.dimensions.unwrap_or(entries[0].vector.len());

        if let Some(entry) = entries.iter().find(|entry| entry.vector.len() != expected) {
            return Err(StoreError::Dimension {
                expected,
                actual: entry.vector.len(),
            });
        }

        let mut next = state.clone();
        next.dimensions = Some(expected);
        next.updated_at = Some(Utc::now());
        next.entries.extend_from_slice(entries);

        self.persist(&next).await?;
        *state = next;
        Ok(())
    }

    async fn query_nearest(&self, vector: &[f32], k: usize) -> Result<Vec<StoreHit>, StoreError> {
        let state = self.state.read().await;

        if let Some(expected) = state.dimensions {
            if vector.len() != expected {
                return Err(StoreError::Dimension {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let mut scored: Vec<(f32, &IndexedEntry)> = state
            .entries
            .iter()
            .map(|entry| (dot(vector, &entry.vector), entry))
            .collect();
        scored.sort_by(|left, right| right.0.total_cmp(&left.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, entry)| StoreHit {
                text: entry.chunk.text.clone(),
                source_name: Some(entry.chunk.source_name.clone()),
                file_type: Some(entry.chunk.file_type.to_string()),
                score: Some(score),
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.state.read().await.entries.len())
    }

    async fn wipe(&self) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        match fs::remove_dir_all(&self.index_dir).await {
            Ok(()) => info!(path = %self.index_dir.display(), "removed index directory"),
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => return Err(error.into()),
        }

        *state = CollectionFile {
            collection: self.collection.clone(),
            ..Default::default()
        };
        Ok(())
    }
}
