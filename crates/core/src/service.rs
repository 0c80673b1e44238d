use crate::config::RagSettings;
use crate::embeddings::Embedder;
use crate::error::IndexError;
use crate::ingest::{run_indexing, IndexReport};
use crate::models::{RagStats, SearchResult};
use crate::retrieval::{render_context, retrieve, Retrieval, DEFAULT_SCORE_THRESHOLD};
use crate::traits::VectorIndex;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Indexing and retrieval over one collection.
///
/// Built once at startup and shared by reference. The embedder and index are
/// long-lived handles; `index` runs are serialized so a wipe can never race
/// another rebuild of the same collection.
pub struct RagService {
    settings: RagSettings,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    indexing: Mutex<()>,
}

impl RagService {
    pub fn new(
        settings: RagSettings,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            settings,
            embedder,
            index,
            indexing: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &RagSettings {
        &self.settings
    }

    /// Number of chunks in the index after the run.
    pub async fn index(&self, force_reindex: bool) -> Result<usize, IndexError> {
        Ok(self.index_with_report(force_reindex).await?.chunk_count)
    }

    pub async fn index_with_report(&self, force_reindex: bool) -> Result<IndexReport, IndexError> {
        let _guard = self.indexing.lock().await;
        run_indexing(
            &self.settings,
            self.embedder.as_ref(),
            self.index.as_ref(),
            force_reindex,
        )
        .await
    }

    pub async fn retrieve(&self, query: &str, k: usize, score_threshold: f32) -> Retrieval {
        retrieve(
            self.embedder.as_ref(),
            self.index.as_ref(),
            query,
            k,
            score_threshold,
        )
        .await
    }

    /// Never fails; an unavailable backend yields an empty list.
    pub async fn search(&self, query: &str, k: usize, score_threshold: f32) -> Vec<SearchResult> {
        self.retrieve(query, k, score_threshold).await.into_results()
    }

    pub async fn get_context_for_query(&self, query: &str, k: usize) -> String {
        render_context(&self.search(query, k, DEFAULT_SCORE_THRESHOLD).await)
    }

    pub async fn get_stats(&self) -> RagStats {
        match self.index.count().await {
            Ok(total_chunks) => RagStats::Ready {
                total_chunks,
                collection_name: self.settings.collection_name.clone(),
                data_directory: self.settings.data_dir.display().to_string(),
                index_directory: self.settings.index_dir.display().to_string(),
            },
            Err(error) => {
                warn!(%error, "could not read index statistics");
                RagStats::Unavailable {
                    error: error.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::models::ScoreKind;
    use crate::retrieval::DEFAULT_K;
    use crate::stores::LocalVectorStore;
    use crate::testing::{FlatEmbedder, MemoryIndex, UnreachableIndex};
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn faq_file_indexes_and_is_found() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let data_dir = dir.path().join("data");
        fs::create_dir(&data_dir)?;
        fs::write(
            data_dir.join("faq.txt"),
            "We provide transformer maintenance across the region.\n\nOur engineers also design medium voltage substations.",
        )?;

        let settings = RagSettings {
            data_dir,
            index_dir: dir.path().join("index"),
            ..Default::default()
        };
        let index_dir = settings.index_dir.clone();
        let store = LocalVectorStore::open(&index_dir, &settings.collection_name).await?;
        let service = RagService::new(settings, Arc::new(FlatEmbedder::default()), Arc::new(store));

        let chunk_count = service.index(true).await?;
        assert_eq!(chunk_count, 1);

        let results = service.search("faq topic", 1, DEFAULT_SCORE_THRESHOLD).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, "faq.txt");
        assert_eq!(results[0].file_type, "text");
        assert_eq!(results[0].score_kind, ScoreKind::Similarity);

        let context = service.get_context_for_query("faq topic", DEFAULT_K).await;
        assert!(context.starts_with("[Source 1: faq.txt]\n"));
        assert!(index_dir.exists());
        Ok(())
    }

    #[tokio::test]
    async fn default_embedder_and_local_store_find_faq() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let data_dir = dir.path().join("data");
        fs::create_dir(&data_dir)?;
        fs::write(
            data_dir.join("faq.txt"),
            "We provide transformer maintenance across the region.\n\nOur engineers also design medium voltage substations.",
        )?;

        let settings = RagSettings {
            data_dir,
            index_dir: dir.path().join("index"),
            ..Default::default()
        };
        let store = LocalVectorStore::open(&settings.index_dir, &settings.collection_name).await?;
        let service = RagService::new(
            settings,
            Arc::new(CharacterNgramEmbedder::default()),
            Arc::new(store),
        );

        assert_eq!(service.index(true).await?, 1);

        let results = service.search("faq topic", 1, DEFAULT_SCORE_THRESHOLD).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, "faq.txt");
        assert_eq!(results[0].score_kind, ScoreKind::Uncalibrated);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_index_calls_do_not_double_insert() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("faq.txt"), "Single paragraph.")?;
        let index = Arc::new(MemoryIndex::default());
        let service = Arc::new(RagService::new(
            RagSettings {
                data_dir: dir.path().to_path_buf(),
                ..Default::default()
            },
            Arc::new(FlatEmbedder::default()),
            index.clone(),
        ));

        let (first, second) = tokio::join!(service.index(false), service.index(false));

        assert_eq!(first?, 1);
        assert_eq!(second?, 1);
        assert_eq!(index.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn stats_report_configuration() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("faq.txt"), "Single paragraph.")?;
        let service = RagService::new(
            RagSettings {
                data_dir: dir.path().to_path_buf(),
                ..Default::default()
            },
            Arc::new(FlatEmbedder::default()),
            Arc::new(MemoryIndex::default()),
        );
        service.index(false).await?;

        match service.get_stats().await {
            RagStats::Ready {
                total_chunks,
                collection_name,
                ..
            } => {
                assert_eq!(total_chunks, 1);
                assert_eq!(collection_name, "luxivolt_docs");
            }
            other => panic!("unexpected stats {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_backend_never_raises() {
        let service = RagService::new(
            RagSettings::default(),
            Arc::new(FlatEmbedder::default()),
            Arc::new(UnreachableIndex),
        );

        assert!(service.search("anything", 4, 0.3).await.is_empty());
        assert_eq!(service.get_context_for_query("anything", 4).await, "");
        assert!(matches!(service.get_stats().await, RagStats::Unavailable { .. }));
    }
}
