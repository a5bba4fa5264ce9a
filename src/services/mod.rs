mod analyzer;
mod chunker;
mod coordinator;
pub mod embedding;
mod exporter;
mod indexer;
mod pipeline;
mod reporter;
mod scanner;

pub use analyzer::{Analyzer, PatternAnalyzer};
pub use chunker::CodeChunker;
pub use coordinator::{EmbeddingCoordinator, PROGRESS_INTERVAL};
pub use embedding::{BackendKind, EmbeddingBackend, create_backend};
pub use exporter::{ExportedFiles, Exporter, KnowledgeBaseMetadata};
pub use indexer::Indexer;
pub use pipeline::{BuildOptions, BuildOutcome, KnowledgeBaseBuilder};
pub use reporter::{RecordingReporter, Report, Reporter, TracingReporter};
pub use scanner::FileScanner;
