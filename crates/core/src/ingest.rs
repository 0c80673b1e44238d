use crate::chunking::{ChunkingConfig, RecursiveSplitter};
use crate::config::RagSettings;
use crate::embeddings::Embedder;
use crate::error::{EmbedError, IndexError};
use crate::loader::{load_documents, SkippedFile};
use crate::models::IndexedEntry;
use crate::traits::VectorIndex;
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct IndexReport {
    pub chunk_count: usize,
    /// The existing index was left untouched because it already had entries.
    pub reused_existing: bool,
    pub skipped_files: Vec<SkippedFile>,
}

/// Loads, chunks, embeds and stores the data directory.
///
/// Without `force_reindex` a non-empty index is reused as is. With it, the
/// index is wiped before anything is loaded. Unreadable files are skipped;
/// embedding and store failures abort the run with no guarantee about which
/// entries were committed.
pub async fn run_indexing(
    settings: &RagSettings,
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    force_reindex: bool,
) -> Result<IndexReport, IndexError> {
    let config = ChunkingConfig::try_from(settings)?;

    if force_reindex {
        index.wipe().await?;
        info!(collection = %settings.collection_name, "cleared existing index");
    } else {
        match index.count().await {
            Ok(existing) if existing > 0 => {
                info!(
                    chunks = existing,
                    "found existing index, skipping rebuild (force a reindex to refresh it)"
                );
                return Ok(IndexReport {
                    chunk_count: existing,
                    reused_existing: true,
                    skipped_files: Vec::new(),
                });
            }
            Ok(_) => {}
            Err(error) => warn!(%error, "could not read existing index size, rebuilding"),
        }
    }

    let loaded = load_documents(&settings.data_dir);
    if loaded.documents.is_empty() {
        warn!(path = %settings.data_dir.display(), "no documents found in data directory");
        return Ok(IndexReport {
            skipped_files: loaded.skipped,
            ..Default::default()
        });
    }

    let chunks = RecursiveSplitter::new(config).chunk_documents(&loaded.documents);
    if chunks.is_empty() {
        warn!("documents produced no chunks");
        return Ok(IndexReport {
            skipped_files: loaded.skipped,
            ..Default::default()
        });
    }

    let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
    let vectors = embedder.embed_batch(&texts).await?;
    if vectors.len() != chunks.len() {
        return Err(EmbedError::Count {
            expected: chunks.len(),
            actual: vectors.len(),
        }
        .into());
    }

    let entries: Vec<IndexedEntry> = chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, vector)| IndexedEntry { vector, chunk })
        .collect();

    info!(chunks = entries.len(), "writing chunks to vector index");
    index.insert(&entries).await?;
    info!(chunks = entries.len(), "indexing complete");

    Ok(IndexReport {
        chunk_count: entries.len(),
        reused_existing: false,
        skipped_files: loaded.skipped,
    })
}
