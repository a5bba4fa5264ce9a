//! End-to-end build: index, embed, export.

use std::sync::Arc;
use std::time::Instant;

use super::analyzer::{Analyzer, PatternAnalyzer};
use super::chunker::CodeChunker;
use super::coordinator::EmbeddingCoordinator;
use super::embedding::EmbeddingBackend;
use super::exporter::{ExportedFiles, Exporter};
use super::indexer::Indexer;
use super::reporter::Reporter;
use super::scanner::FileScanner;
use crate::error::AppError;
use crate::models::{Chunk, Config, RunStats};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Stop after chunking; nothing is embedded or written.
    pub dry_run: bool,
    /// Export chunks without vectors.
    pub skip_embeddings: bool,
}

#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub chunks: Vec<Chunk>,
    pub files: Option<ExportedFiles>,
}

pub struct KnowledgeBaseBuilder {
    config: Config,
    analyzer: Box<dyn Analyzer>,
    reporter: Arc<dyn Reporter>,
}

impl KnowledgeBaseBuilder {
    pub fn new(config: Config, reporter: Arc<dyn Reporter>) -> Self {
        let analyzer = PatternAnalyzer::new(config.metadata.clone(), config.architecture.clone());
        Self {
            config,
            analyzer: Box::new(analyzer),
            reporter,
        }
    }

    /// Replace the default regex analyzer.
    pub fn with_analyzer(mut self, analyzer: Box<dyn Analyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the pipeline. `stats` is updated as stages finish, so it is
    /// meaningful even when an error is returned.
    ///
    /// `backend` may be `None` only for dry runs or when embeddings are skipped.
    pub async fn build(
        self,
        backend: Option<Arc<dyn EmbeddingBackend>>,
        options: BuildOptions,
        stats: &mut RunStats,
    ) -> Result<BuildOutcome, AppError> {
        let started = Instant::now();
        let result = self.run(backend, options, stats).await;
        stats.record_duration(started.elapsed());
        result
    }

    async fn run(
        self,
        backend: Option<Arc<dyn EmbeddingBackend>>,
        options: BuildOptions,
        stats: &mut RunStats,
    ) -> Result<BuildOutcome, AppError> {
        let Self {
            config,
            analyzer,
            reporter,
        } = self;
        let processing = &config.code_processing;
        let root = config.paths.source_code.clone();

        let indexer = Indexer::new(
            root.clone(),
            FileScanner::new(root, processing),
            analyzer,
            CodeChunker::new(&processing.chunking),
            processing.max_file_size,
            reporter.clone(),
        );
        let chunks = indexer.process_codebase(stats)?;
        reporter.info(&format!(
            "created {} chunks from {} files",
            stats.chunks_created, stats.files_processed
        ));

        if options.dry_run {
            reporter.info("dry run complete; skipping embeddings and export");
            return Ok(BuildOutcome {
                chunks,
                files: None,
            });
        }

        let (chunks, model) = match backend.filter(|_| !options.skip_embeddings) {
            Some(backend) => {
                let model = backend.model().to_string();
                let coordinator =
                    EmbeddingCoordinator::new(backend, &config.embedding, reporter.clone());
                reporter.info(&format!(
                    "embedding {} chunks in {} batches with {}",
                    chunks.len(),
                    coordinator.batch_count(chunks.len()),
                    model
                ));
                let embedded = coordinator.embed(chunks).await?;
                stats.chunks_embedded = embedded.len() as u64;
                (embedded, Some(model))
            }
            None => {
                reporter.warn("skipping embedding generation");
                (chunks, None)
            }
        };

        let files = Exporter::new(&config).export(&chunks, model.as_deref())?;
        reporter.info(&format!(
            "knowledge base written to {}",
            files.knowledge_base.display()
        ));

        Ok(BuildOutcome {
            chunks,
            files: Some(files),
        })
    }
}
