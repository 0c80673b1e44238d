use crate::error::ConfigError;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_COLLECTION: &str = "luxivolt_docs";
pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

#[derive(Debug, Clone)]
pub struct RagSettings {
    pub data_dir: PathBuf,
    pub index_dir: PathBuf,
    pub collection_name: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            index_dir: PathBuf::from("index_db"),
            collection_name: DEFAULT_COLLECTION.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl RagSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_chunking(self.chunk_size, self.chunk_overlap)?;

        let name = self.collection_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ConfigError::Invalid {
                field: "collection_name",
                message: format!("`{}` is not a usable collection name", self.collection_name),
            });
        }

        if index_dir_holds(&self.index_dir, &self.data_dir) {
            return Err(ConfigError::Invalid {
                field: "index_dir",
                message: format!(
                    "{} contains the data directory {}; a forced reindex would delete the sources",
                    self.index_dir.display(),
                    self.data_dir.display()
                ),
            });
        }

        Ok(())
    }
}

/// True when wiping `index_dir` would also remove `data_dir`.
fn index_dir_holds(index_dir: &Path, data_dir: &Path) -> bool {
    let lexical = |path: &Path| -> PathBuf {
        path.components()
            .filter(|component| !matches!(component, Component::CurDir))
            .collect()
    };

    if lexical(data_dir).starts_with(lexical(index_dir)) {
        return true;
    }

    match (index_dir.canonicalize(), data_dir.canonicalize()) {
        (Ok(index), Ok(data)) => data.starts_with(index),
        _ => false,
    }
}

pub fn validate_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<(), ConfigError> {
    if chunk_size == 0 {
        return Err(ConfigError::Invalid {
            field: "chunk_size",
            message: "must be greater than zero".to_string(),
        });
    }

    if chunk_overlap >= chunk_size {
        return Err(ConfigError::Invalid {
            field: "chunk_overlap",
            message: format!(
                "overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            ),
        });
    }

    Ok(())
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub app_name: String,
    pub company_name: String,
    pub referer: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "google/gemini-2.0-flash-exp:free".to_string(),
            app_name: "Luxivolt Chatbot".to_string(),
            company_name: "Luxivolt Engineering".to_string(),
            referer: "http://localhost:8000".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            timeout: Duration::from_secs(60),
        }
    }
}

impl ChatSettings {
    /// Trimmed API key, `None` when unset or blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    MissingDataDir(PathBuf),
    MissingApiKey,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDataDir(path) => write!(
                f,
                "data directory {} does not exist; answers will not be grounded",
                path.display()
            ),
            Self::MissingApiKey => {
                f.write_str("no completion API key configured; chat requests will be rejected")
            }
        }
    }
}

/// Operator-facing problems that must not stop the process from starting.
pub fn startup_warnings(rag: &RagSettings, chat: &ChatSettings) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();
    if !rag.data_dir.is_dir() {
        warnings.push(ConfigWarning::MissingDataDir(rag.data_dir.clone()));
    }
    if chat.api_key().is_none() {
        warnings.push(ConfigWarning::MissingApiKey);
    }
    warnings
}
