//! Error types for the knowledge base builder.

use std::path::PathBuf;

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding API: {0}")]
    ConnectionError(String),

    #[error("embedding API returned status {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// The backend broke its contract (count or dimension mismatch).
    #[error("backend contract violation: {0}")]
    ContractViolation(String),
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            // 408, 429 and 5xx are transient; other client errors will fail again
            EmbeddingError::ServerError { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            EmbeddingError::RequestError(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            EmbeddingError::InvalidResponse(_)
            | EmbeddingError::Model(_)
            | EmbeddingError::ContractViolation(_) => false,
        }
    }
}

/// Errors raised while loading or running a local ONNX model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model not found: {0}")]
    NotFound(String),

    #[error("model download failed: {0}")]
    DownloadError(String),

    #[error("model load error: {0}")]
    LoadError(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),

    #[error("inference error: {0}")]
    InferenceError(String),
}

/// Per-file failures; the run skips the file and counts the error.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to read {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} exceeds maximum size: {size} > {max}")]
    FileTooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("directory walk error: {0}")]
    WalkError(#[from] walkdir::Error),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("unknown embedding provider: {0} (supported: local, remote)")]
    UnknownProvider(String),

    #[error("model '{model}' not recognized. Available: {available}")]
    UnknownModel { model: String, available: String },

    #[error("{0} not found in environment. Set it in .env or use provider: local")]
    MissingCredential(&'static str),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors related to writing the knowledge base.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialize error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("export error: {0}")]
    Export(#[from] ExportError),
}
