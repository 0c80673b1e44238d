use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Markdown,
    Pdf,
    Text,
}

impl FileType {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Pdf => "pdf",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized text read from one source file (or one page of a PDF).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub text: String,
    pub source_name: String,
    pub file_type: FileType,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub chunk_id: String,
    pub text: String,
    pub source_name: String,
    pub file_type: FileType,
    pub page: Option<u32>,
    pub chunk_index: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedEntry {
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

/// How a [`SearchResult::score`] should be read.
///
/// `Similarity` scores come straight from the vector index and are comparable
/// against a threshold. `Uncalibrated` scores are genuine similarities from an
/// embedder whose scale is not comparable against one (the n-gram embedder);
/// they still order results. `Placeholder` scores are a fixed constant assigned
/// when the index reported no score at all and carry no ranking information.
/// No kind is a calibrated probability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    Similarity,
    Uncalibrated,
    Placeholder,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub content: String,
    pub source: String,
    pub file_type: String,
    pub score: f32,
    pub score_kind: ScoreKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RagStats {
    Ready {
        total_chunks: usize,
        collection_name: String,
        data_directory: String,
        index_directory: String,
    },
    Unavailable {
        error: String,
    },
}
