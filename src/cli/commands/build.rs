//! Build command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::SpinnerReporter;
use crate::cli::output::{BuildReport, get_formatter};
use crate::error::AppError;
use crate::models::{Config, OutputFormat, RunStats};
use crate::services::{
    BuildOptions, BuildOutcome, EmbeddingBackend, KnowledgeBaseBuilder, Reporter, create_backend,
};

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Source code directory (overrides paths.source_code)
    #[arg(long, short = 's')]
    pub source: Option<PathBuf>,

    /// Knowledge base output file (overrides paths.export_file)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Export chunks without generating embeddings
    #[arg(long)]
    pub skip_embeddings: bool,

    /// Analyze and chunk only; nothing is embedded or written
    #[arg(long)]
    pub dry_run: bool,
}

impl BuildArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(ref source) = self.source {
            config.paths.source_code = source.clone();
        }
        if let Some(ref output) = self.output {
            config.paths.export_file = output.clone();
        }
    }

    fn options(&self) -> BuildOptions {
        BuildOptions {
            dry_run: self.dry_run,
            skip_embeddings: self.skip_embeddings,
        }
    }
}

pub async fn handle_build(
    args: BuildArgs,
    mut config: Config,
    format: OutputFormat,
    _verbose: bool,
) -> Result<()> {
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let formatter = get_formatter(format);
    let reporter = Arc::new(SpinnerReporter::new(format == OutputFormat::Text));
    reporter.info(&format!(
        "{} v{} building knowledge base for {}",
        config.project.name, config.project.version, config.project.agent_name
    ));

    let mut stats = RunStats::default();
    let result = run(config, args.options(), reporter.clone(), &mut stats).await;
    reporter.finish();

    let mut report = BuildReport {
        stats,
        success: result.is_ok(),
        dry_run: args.dry_run,
        ..Default::default()
    };

    match result {
        Ok(outcome) => {
            if let Some(files) = outcome.files {
                report.output = Some(files.knowledge_base);
                report.summary = files.summary;
            }
            print!("{}", formatter.format_build_report(&report));
            Ok(())
        }
        Err(e) => {
            report.error = Some(e.to_string());
            print!("{}", formatter.format_build_report(&report));
            Err(e).context("build failed")
        }
    }
}

async fn run(
    config: Config,
    options: BuildOptions,
    reporter: Arc<SpinnerReporter>,
    stats: &mut RunStats,
) -> Result<BuildOutcome, AppError> {
    let backend = if options.dry_run || options.skip_embeddings {
        None
    } else {
        let embedding = &config.embedding;
        reporter.info(&format!(
            "loading {} embedding backend ({})",
            embedding.provider, embedding.model
        ));
        let backend: Arc<dyn EmbeddingBackend> = Arc::from(create_backend(embedding).await?);
        stats.embedding_provider = Some(embedding.provider);
        Some(backend)
    };

    KnowledgeBaseBuilder::new(config, reporter)
        .build(backend, options, stats)
        .await
}
