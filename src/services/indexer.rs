//! Turns a source tree into chunks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::analyzer::Analyzer;
use super::chunker::CodeChunker;
use super::reporter::Reporter;
use super::scanner::FileScanner;
use crate::error::IndexError;
use crate::models::{Chunk, RunStats};
use crate::utils::{get_relative_path, read_file_content};

/// Progress is reported once per this many processed files.
const FILE_PROGRESS_INTERVAL: usize = 10;

pub struct Indexer {
    root: PathBuf,
    scanner: FileScanner,
    analyzer: Box<dyn Analyzer>,
    chunker: CodeChunker,
    max_file_size: u64,
    reporter: Arc<dyn Reporter>,
}

impl Indexer {
    pub fn new(
        root: PathBuf,
        scanner: FileScanner,
        analyzer: Box<dyn Analyzer>,
        chunker: CodeChunker,
        max_file_size: u64,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            root,
            scanner,
            analyzer,
            chunker,
            max_file_size,
            reporter,
        }
    }

    /// Scan, analyze and chunk every file under the root.
    ///
    /// Unreadable files are skipped and counted in `stats.errors`.
    pub fn process_codebase(&self, stats: &mut RunStats) -> Result<Vec<Chunk>, IndexError> {
        let files = self.scanner.collect_files()?;
        let total = files.len();
        stats.files_scanned = total as u64;
        self.reporter.info(&format!(
            "found {} files under {}",
            total,
            self.root.display()
        ));

        let mut chunks = Vec::new();
        for (i, path) in files.iter().enumerate() {
            match self.process_file(path) {
                Ok(file_chunks) => {
                    debug!(file = %path.display(), chunks = file_chunks.len(), "file chunked");
                    stats.files_processed += 1;
                    chunks.extend(file_chunks);
                }
                Err(e) => {
                    stats.errors += 1;
                    self.reporter.warn(&format!("skipping {}: {}", path.display(), e));
                }
            }

            let done = i + 1;
            if done % FILE_PROGRESS_INTERVAL == 0 {
                self.reporter.progress("files", done, total);
            }
        }

        stats.chunks_created = chunks.len() as u64;
        Ok(chunks)
    }

    fn process_file(&self, path: &Path) -> Result<Vec<Chunk>, IndexError> {
        let content = read_file_content(path, self.max_file_size)?;
        let relative = get_relative_path(&self.root, path)
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf());
        let metadata = self.analyzer.analyze(&relative, &content);
        Ok(self.chunker.chunk(&content, &metadata))
    }
}
