mod chunk;
mod config;
mod format;
mod stats;

pub use chunk::{
    Chunk, ChunkMetadata, Complexity, Component, ComponentKind, FileMetadata, Platform,
};
pub use config::{
    API_KEY_ENV, ArchitectureConfig, ChunkingConfig, CodeProcessingConfig, Config,
    ConfigFormat, DEFAULT_CONFIG_PATH, DEFAULT_LOCAL_MODEL, DEFAULT_OPENAI_URL,
    EmbeddingConfig, ExportConfig, ExportFormat, LayerRule, LogFormat, LoggingConfig,
    MIN_CHUNK_SIZE, MetadataConfig, PathsConfig, ProjectConfig, Provider,
};
pub use format::OutputFormat;
pub use stats::RunStats;
