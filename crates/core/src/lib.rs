pub mod chat;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod ingest;
pub mod loader;
pub mod models;
pub mod prompt;
pub mod retrieval;
pub mod service;
pub mod store;
pub mod stores;
pub mod traits;

#[cfg(test)]
mod testing;

pub use chat::{ChatMessage, ChatReply, ChatRequest, ChatService, CompletionClient, OpenRouterClient};
pub use chunking::{ChunkingConfig, RecursiveSplitter, DEFAULT_SEPARATORS};
pub use config::{startup_warnings, ChatSettings, ConfigWarning, RagSettings};
pub use embeddings::{CharacterNgramEmbedder, Embedder, HttpEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{ChatError, ConfigError, EmbedError, IndexError, LoadError, StoreError};
pub use ingest::{run_indexing, IndexReport};
pub use loader::{discover_documents, load_documents, LoadReport, PdfExtractor, SkippedFile};
pub use models::{Chunk, Document, FileType, IndexedEntry, RagStats, ScoreKind, SearchResult};
pub use prompt::system_prompt;
pub use retrieval::{render_context, Retrieval, DEFAULT_K, DEFAULT_SCORE_THRESHOLD};
pub use service::RagService;
pub use store::{StoreHit, PLACEHOLDER_SCORE};
pub use stores::{LocalVectorStore, QdrantStore};
pub use traits::VectorIndex;
