//! Batches chunks through an embedding backend.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::debug;

use super::embedding::EmbeddingBackend;
use super::reporter::Reporter;
use crate::error::EmbeddingError;
use crate::models::{Chunk, EmbeddingConfig};
use crate::utils::{RetryConfig, with_retry};

/// Progress is reported once per this many finished batches.
pub const PROGRESS_INTERVAL: usize = 10;

pub struct EmbeddingCoordinator {
    backend: Arc<dyn EmbeddingBackend>,
    batch_size: usize,
    retry: RetryConfig,
    concurrency: usize,
    reporter: Arc<dyn Reporter>,
}

impl EmbeddingCoordinator {
    pub fn new(
        backend: Arc<dyn EmbeddingBackend>,
        config: &EmbeddingConfig,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let remote = backend.kind().retries_transient_failures();
        let retry = if remote {
            RetryConfig::new(config.max_retries.max(1))
        } else {
            RetryConfig::no_retry()
        };
        // Local inference holds one session; batches run one at a time.
        let concurrency = if remote { config.concurrency.max(1) } else { 1 };

        Self {
            backend,
            batch_size: config.batch_size.max(1),
            retry,
            concurrency,
            reporter,
        }
    }

    pub fn batch_count(&self, chunks: usize) -> usize {
        chunks.div_ceil(self.batch_size)
    }

    /// Attach an embedding to every chunk, preserving order.
    ///
    /// Any batch that fails after its retries aborts the whole call.
    pub async fn embed(&self, chunks: Vec<Chunk>) -> Result<Vec<Chunk>, EmbeddingError> {
        let total_chunks = chunks.len();
        let total = self.batch_count(total_chunks);

        let mut batches = Vec::with_capacity(total);
        let mut iter = chunks.into_iter().peekable();
        while iter.peek().is_some() {
            batches.push(iter.by_ref().take(self.batch_size).collect::<Vec<_>>());
        }

        let mut results = stream::iter(batches.into_iter().enumerate())
            .map(|(index, batch)| self.embed_batch(index, batch))
            .buffered(self.concurrency);

        let mut embedded = Vec::with_capacity(total_chunks);
        let mut done = 0;
        while let Some(batch) = results.next().await {
            embedded.extend(batch?);
            done += 1;
            if done % PROGRESS_INTERVAL == 0 {
                self.reporter.progress("batches", done, total);
            }
        }

        Ok(embedded)
    }

    async fn embed_batch(
        &self,
        index: usize,
        batch: Vec<Chunk>,
    ) -> Result<Vec<Chunk>, EmbeddingError> {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();

        let result = with_retry(
            &self.retry,
            || self.backend.embed_documents(&texts),
            |attempt, delay, error| {
                self.reporter.warn(&format!(
                    "batch {} attempt {} failed: {}; retrying in {}s",
                    index + 1,
                    attempt,
                    error,
                    delay.as_secs()
                ));
            },
        )
        .await;
        let attempts = result.attempts();
        let vectors = result.into_result()?;
        debug!(batch = index + 1, size = texts.len(), attempts, "batch embedded");

        if vectors.len() != batch.len() {
            return Err(EmbeddingError::ContractViolation(format!(
                "batch {}: {} vectors for {} texts",
                index + 1,
                vectors.len(),
                batch.len()
            )));
        }
        let expected = self.backend.dimensions();
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(EmbeddingError::ContractViolation(format!(
                "batch {}: vector of length {} from a {}-dimension backend",
                index + 1,
                bad.len(),
                expected
            )));
        }

        Ok(batch
            .into_iter()
            .zip(vectors)
            .map(|(mut chunk, vector)| {
                chunk.embedding = Some(vector);
                chunk
            })
            .collect())
    }
}
