use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("file is not valid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("embedding backend returned {status}: {details}")]
    BackendResponse { status: u16, details: String },

    #[error("embedding dimension {actual} does not match expected {expected}")]
    Dimension { expected: usize, actual: usize },

    #[error("embedding backend returned {actual} vectors for {expected} inputs")]
    Count { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vector dimension {actual} does not match collection dimension {expected}")]
    Dimension { expected: usize, actual: usize },

    #[error("store request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("embedding failed: {0}")]
    Embed(#[from] EmbedError),

    #[error("vector index failed: {0}")]
    Store(#[from] StoreError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("no API key configured for the completion service")]
    MissingCredentials,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("completion service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("completion response had no choices")]
    EmptyCompletion,
}

pub type Result<T, E = IndexError> = std::result::Result<T, E>;
