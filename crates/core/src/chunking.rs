use crate::config::{validate_chunking, RagSettings};
use crate::error::ConfigError;
use crate::models::{Chunk, Document};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Coarsest to finest. The trailing empty separator splits per character.
pub const DEFAULT_SEPARATORS: [&str; 8] = ["\n\n", "\n", ".", "!", "?", ",", " ", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ConfigError> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }
}

impl TryFrom<&RagSettings> for ChunkingConfig {
    type Error = ConfigError;

    fn try_from(value: &RagSettings) -> Result<Self, Self::Error> {
        value.validate()?;
        Ok(Self {
            chunk_size: value.chunk_size,
            chunk_overlap: value.chunk_overlap,
        })
    }
}

/// Splits text on the coarsest separator that occurs in it, recursing into
/// pieces that are still too long, then greedily merges neighbours back up to
/// `chunk_size` with `chunk_overlap` characters carried between windows.
///
/// Sizes are soft: a piece that cannot be split further is emitted as is.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    config: ChunkingConfig,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    pub fn new(config: ChunkingConfig) -> Self {
        Self {
            config,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for document in documents {
            for (index, text) in self.split_text(&document.text).into_iter().enumerate() {
                let chunk_index = index as u64;
                chunks.push(Chunk {
                    chunk_id: make_chunk_id(&document.source_name, document.page, chunk_index, &text),
                    text,
                    source_name: document.source_name.clone(),
                    file_type: document.file_type,
                    page: document.page,
                    chunk_index,
                });
            }
        }

        info!(
            documents = documents.len(),
            chunks = chunks.len(),
            chunk_size = self.config.chunk_size,
            chunk_overlap = self.config.chunk_overlap,
            "chunked documents"
        );
        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let (separator, remaining) = pick_separator(text, separators);
        let pieces = split_keeping_separator(text, separator);

        let mut output = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) < self.config.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                output.extend(self.merge(&fitting));
                fitting.clear();
            }

            if remaining.is_empty() {
                output.push(piece.to_string());
            } else {
                output.extend(self.split_recursive(piece, remaining));
            }
        }

        if !fitting.is_empty() {
            output.extend(self.merge(&fitting));
        }

        output
    }

    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let ChunkingConfig {
            chunk_size,
            chunk_overlap,
        } = self.config;

        let mut merged = Vec::new();
        let mut window: Vec<&str> = Vec::new();
        let mut start = 0usize;
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > chunk_size {
                if total > chunk_size {
                    debug!(total, chunk_size, "emitting oversized chunk");
                }

                if start < window.len() {
                    if let Some(text) = join_window(&window[start..]) {
                        merged.push(text);
                    }

                    while start < window.len()
                        && (total > chunk_overlap || (total + len > chunk_size && total > 0))
                    {
                        total -= char_len(window[start]);
                        start += 1;
                    }
                }
            }

            window.push(piece);
            total += len;
        }

        if let Some(text) = join_window(&window[start..]) {
            merged.push(text);
        }

        merged
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn pick_separator<'s>(text: &str, separators: &'s [String]) -> (&'s str, &'s [String]) {
    for (position, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return (separator.as_str(), &[]);
        }
        if text.contains(separator.as_str()) {
            return (separator.as_str(), &separators[position + 1..]);
        }
    }

    match separators.last() {
        Some(last) => (last.as_str(), &[]),
        None => ("", &[]),
    }
}

/// Each separator stays attached to the front of the piece that follows it.
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    let mut pieces = Vec::new();

    if separator.is_empty() {
        let mut boundaries = text.char_indices().map(|(index, _)| index).peekable();
        while let Some(begin) = boundaries.next() {
            let end = boundaries.peek().copied().unwrap_or(text.len());
            pieces.push(&text[begin..end]);
        }
        return pieces;
    }

    let mut begin = 0;
    for (index, _) in text.match_indices(separator) {
        if index > begin {
            pieces.push(&text[begin..index]);
        }
        begin = index;
    }
    if begin < text.len() {
        pieces.push(&text[begin..]);
    }

    pieces.retain(|piece| !piece.is_empty());
    pieces
}

fn join_window(pieces: &[&str]) -> Option<String> {
    let joined = pieces.concat();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn make_chunk_id(source_name: &str, page: Option<u32>, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_name.as_bytes());
    hasher.update(page.unwrap_or(0).to_le_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
