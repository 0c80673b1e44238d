use chatbot_rag_core::{
    startup_warnings, CharacterNgramEmbedder, ChatMessage, ChatRequest, ChatService, ChatSettings,
    Embedder, HttpEmbedder, LocalVectorStore, OpenRouterClient, QdrantStore, RagService,
    RagSettings, VectorIndex, DEFAULT_EMBEDDING_DIMENSIONS,
};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "chatbot-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the markdown, PDF and text sources
    #[arg(long, env = "RAG_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Directory the local vector index persists into
    #[arg(long, env = "RAG_INDEX_DIR", default_value = "index_db")]
    index_dir: PathBuf,

    /// Collection name
    #[arg(long, env = "RAG_COLLECTION", default_value = "luxivolt_docs")]
    collection: String,

    /// Target chunk length in characters
    #[arg(long, env = "RAG_CHUNK_SIZE", default_value_t = 500)]
    chunk_size: usize,

    /// Characters carried over between consecutive chunks
    #[arg(long, env = "RAG_CHUNK_OVERLAP", default_value_t = 100)]
    chunk_overlap: usize,

    /// Vector index backend
    #[arg(long, value_enum, default_value_t = Backend::Local)]
    backend: Backend,

    /// Qdrant base URL, used with `--backend qdrant`
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// OpenAI-compatible embeddings base URL; the built-in n-gram embedder is used when unset
    #[arg(long, env = "EMBEDDING_URL")]
    embedding_url: Option<String>,

    /// Embedding model name sent to `--embedding-url`
    #[arg(
        long,
        env = "EMBEDDING_MODEL",
        default_value = "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2"
    )]
    embedding_model: String,

    /// Vector length produced by the embedding model
    #[arg(long, env = "EMBEDDING_DIMENSIONS")]
    embedding_dimensions: Option<usize>,

    /// Bearer token for `--embedding-url`
    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    /// Completion service API key
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Completion service base URL
    #[arg(long, env = "OPENROUTER_BASE_URL", default_value = "https://openrouter.ai/api/v1")]
    base_url: String,

    /// Completion model
    #[arg(long, env = "OPENROUTER_MODEL", default_value = "google/gemini-2.0-flash-exp:free")]
    model: String,

    /// Application name sent as X-Title
    #[arg(long, env = "APP_NAME", default_value = "Luxivolt Chatbot")]
    app_name: String,

    /// Company the assistant speaks for
    #[arg(long, env = "COMPANY_NAME", default_value = "Luxivolt Engineering")]
    company_name: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Local,
    Qdrant,
}

#[derive(Subcommand)]
enum Command {
    /// Load, chunk and embed the data directory into the vector index.
    Index {
        /// Wipe the existing index and rebuild it.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Return the chunks nearest to a query.
    Search {
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = 4)]
        k: usize,
        /// Minimum similarity; inert for the n-gram embedder and for backends that report no score.
        #[arg(long, default_value_t = 0.3)]
        score_threshold: f32,
        /// Print results as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the grounding context block a chat prompt would receive.
    Context {
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = 4)]
        k: usize,
    },
    /// Show index size and configuration.
    Stats,
    /// Ask the assistant a question.
    Chat {
        #[arg(long)]
        message: String,
        /// JSON file with earlier `{role, content}` messages.
        #[arg(long)]
        history_file: Option<PathBuf>,
        /// Answer without retrieved context.
        #[arg(long, default_value_t = false)]
        no_rag: bool,
    },
}

impl Cli {
    fn rag_settings(&self) -> RagSettings {
        RagSettings {
            data_dir: self.data_dir.clone(),
            index_dir: self.index_dir.clone(),
            collection_name: self.collection.clone(),
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
        }
    }

    fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            app_name: self.app_name.clone(),
            company_name: self.company_name.clone(),
            ..Default::default()
        }
    }

    fn embedder(&self) -> anyhow::Result<Arc<dyn Embedder>> {
        let embedder: Arc<dyn Embedder> = match &self.embedding_url {
            Some(url) => Arc::new(HttpEmbedder::new(
                url,
                self.embedding_model.clone(),
                self.embedding_api_key.clone(),
                self.embedding_dimensions.unwrap_or(384),
            )?),
            None => Arc::new(CharacterNgramEmbedder {
                dimensions: self
                    .embedding_dimensions
                    .unwrap_or(DEFAULT_EMBEDDING_DIMENSIONS),
            }),
        };
        Ok(embedder)
    }

    async fn vector_index(&self, dimensions: usize) -> anyhow::Result<Arc<dyn VectorIndex>> {
        let index: Arc<dyn VectorIndex> = match self.backend {
            Backend::Local => {
                Arc::new(LocalVectorStore::open(&self.index_dir, &self.collection).await?)
            }
            Backend::Qdrant => Arc::new(QdrantStore::new(
                &self.qdrant_url,
                &self.collection,
                dimensions,
            )),
        };
        Ok(index)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let rag_settings = cli.rag_settings();
    let chat_settings = cli.chat_settings();
    rag_settings.validate()?;

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        collection = %rag_settings.collection_name,
        "chatbot-rag boot"
    );
    for warning in startup_warnings(&rag_settings, &chat_settings) {
        warn!("{warning}");
    }

    let embedder = cli.embedder()?;
    let index = cli.vector_index(embedder.dimensions()).await?;
    let rag = Arc::new(RagService::new(rag_settings, embedder, index));

    match cli.command {
        Command::Index { force } => {
            let report = rag.index_with_report(force).await?;
            for skipped in &report.skipped_files {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped file");
            }
            if report.reused_existing {
                println!(
                    "{} chunks already indexed; pass --force to rebuild",
                    report.chunk_count
                );
            } else {
                println!(
                    "{} chunks indexed at {}",
                    report.chunk_count,
                    Utc::now().to_rfc3339()
                );
            }
        }
        Command::Search {
            query,
            k,
            score_threshold,
            json,
        } => {
            let results = rag.search(&query, k, score_threshold).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("no results found");
            } else {
                for (position, result) in results.iter().enumerate() {
                    println!(
                        "--- result {} (score: {:.4}, {:?}) ---",
                        position + 1,
                        result.score,
                        result.score_kind
                    );
                    println!("source: {} [{}]", result.source, result.file_type);
                    let preview: String = result.content.chars().take(200).collect();
                    println!("{preview}");
                }
            }
        }
        Command::Context { query, k } => {
            let context = rag.get_context_for_query(&query, k).await;
            if context.is_empty() {
                println!("(no grounding context)");
            } else {
                println!("{context}");
            }
        }
        Command::Stats => {
            println!("{}", serde_json::to_string_pretty(&rag.get_stats().await)?);
        }
        Command::Chat {
            message,
            history_file,
            no_rag,
        } => {
            if !no_rag {
                match rag.index(false).await {
                    Ok(chunks) => info!(chunks, "retrieval ready"),
                    Err(error) => {
                        warn!(%error, "indexing failed, answering without grounding context")
                    }
                }
            }

            let history: Vec<ChatMessage> = match history_file {
                Some(path) => serde_json::from_slice(&tokio::fs::read(&path).await?)?,
                None => Vec::new(),
            };

            let completion = Arc::new(OpenRouterClient::new(chat_settings.clone())?);
            let chat = ChatService::new(rag.clone(), completion, chat_settings.company_name);
            let reply = chat
                .respond(&ChatRequest {
                    message,
                    history,
                    use_rag: !no_rag,
                })
                .await?;

            println!("{}", reply.response);
            if !reply.sources.is_empty() {
                println!("\nsources: {}", reply.sources.join(", "));
            }
            println!("model: {}", reply.model);
        }
    }

    Ok(())
}
