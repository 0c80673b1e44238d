use crate::error::StoreError;
use crate::models::IndexedEntry;
use crate::store::StoreHit;
use crate::traits::VectorIndex;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

/// A Qdrant collection reached over its REST API.
pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
    vector_size: usize,
}

impl QdrantStore {
    pub fn new(endpoint: impl Into<String>, collection: impl Into<String>, vector_size: usize) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            client: Client::new(),
            vector_size,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.endpoint, self.collection)
    }

    /// Creates the collection with cosine distance when it does not exist yet.
    pub async fn ensure_collection(&self) -> Result<(), StoreError> {
        let response = self.client.get(self.collection_url()).send().await?;

        if response.status() == StatusCode::OK {
            return Ok(());
        }

        if response.status() != StatusCode::NOT_FOUND {
            return Err(backend_error(response).await);
        }

        let response = self
            .client
            .put(self.collection_url())
            .json(&json!({
                "vectors": {
                    "size": self.vector_size,
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        info!(collection = %self.collection, size = self.vector_size, "created qdrant collection");
        Ok(())
    }
}

async fn backend_error(response: Response) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    StoreError::BackendResponse {
        backend: "qdrant".to_string(),
        details: format!("{status}: {body}"),
    }
}

/// Same chunk, same point: re-inserting a chunk overwrites it in place.
fn point_id(chunk_id: &str) -> Uuid {
    let digest = Sha256::digest(chunk_id.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}

fn hit_from_point(point: &Value) -> StoreHit {
    let text_field = |pointer: &str| {
        point
            .pointer(pointer)
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    StoreHit {
        text: text_field("/payload/text").unwrap_or_default(),
        source_name: text_field("/payload/source"),
        file_type: text_field("/payload/file_type"),
        score: point
            .pointer("/score")
            .and_then(Value::as_f64)
            .map(|score| score as f32),
    }
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn insert(&self, entries: &[IndexedEntry]) -> Result<(), StoreError> {
        let points = entries
            .iter()
            .map(|entry| {
                if entry.vector.len() != self.vector_size {
                    return Err(StoreError::Dimension {
                        expected: self.vector_size,
                        actual: entry.vector.len(),
                    });
                }

                let chunk = &entry.chunk;
                Ok(json!({
                    "id": point_id(&chunk.chunk_id).to_string(),
                    "vector": entry.vector,
                    "payload": {
                        "chunk_id": chunk.chunk_id,
                        "text": chunk.text,
                        "source": chunk.source_name,
                        "file_type": chunk.file_type,
                        "page": chunk.page,
                        "chunk_index": chunk.chunk_index,
                    },
                }))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        if points.is_empty() {
            return Ok(());
        }

        self.ensure_collection().await?;

        let response = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url()))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        Ok(())
    }

    async fn query_nearest(&self, vector: &[f32], k: usize) -> Result<Vec<StoreHit>, StoreError> {
        if vector.len() != self.vector_size {
            return Err(StoreError::Dimension {
                expected: self.vector_size,
                actual: vector.len(),
            });
        }

        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url()))
            .json(&json!({
                "vector": vector,
                "limit": k,
                "with_payload": true,
            }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let parsed: Value = response.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .ok_or_else(|| StoreError::BackendResponse {
                backend: "qdrant".to_string(),
                details: "search response has no result array".to_string(),
            })?;

        Ok(hits.iter().map(hit_from_point).collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let response = self
            .client
            .post(format!("{}/points/count", self.collection_url()))
            .json(&json!({ "exact": true }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(0);
        }

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let parsed: Value = response.json().await?;
        parsed
            .pointer("/result/count")
            .and_then(Value::as_u64)
            .map(|count| count as usize)
            .ok_or_else(|| StoreError::BackendResponse {
                backend: "qdrant".to_string(),
                details: "count response has no result.count".to_string(),
            })
    }

    async fn wipe(&self) -> Result<(), StoreError> {
        let response = self.client.delete(self.collection_url()).send().await?;

        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(backend_error(response).await);
        }

        info!(collection = %self.collection, "dropped qdrant collection");
        self.ensure_collection().await
    }
}
