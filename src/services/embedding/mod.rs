//! Embedding backends behind one capability trait.

mod local;
mod registry;
mod remote;

use async_trait::async_trait;

use crate::error::{AppError, EmbeddingError};
use crate::models::{EmbeddingConfig, Provider};

pub use local::LocalEmbedder;
pub use registry::{LOCAL_MODELS, LocalModelSpec, find_local_model, remote_model_dimensions};
pub use remote::RemoteEmbedder;

/// Where a backend runs, which decides how its failures are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// In-process; failures are deterministic and never retried.
    Local,
    /// Network call; transient failures are retried with backoff.
    Remote,
}

impl BackendKind {
    pub fn retries_transient_failures(self) -> bool {
        matches!(self, BackendKind::Remote)
    }
}

/// Produces one vector per input text.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed `texts`, returning vectors in input order, one per text.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Length of every vector this backend returns.
    fn dimensions(&self) -> usize;

    fn kind(&self) -> BackendKind;

    fn model(&self) -> &str;
}

/// Build the backend selected by `config.provider`.
pub async fn create_backend(
    config: &EmbeddingConfig,
) -> Result<Box<dyn EmbeddingBackend>, AppError> {
    match config.provider {
        Provider::Local => {
            let spec = find_local_model(&config.model)?;
            let embedder = LocalEmbedder::load(spec, config)
                .await
                .map_err(EmbeddingError::from)?;
            Ok(Box::new(embedder))
        }
        Provider::Remote => Ok(Box::new(RemoteEmbedder::from_env(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_remote_retries() {
        assert!(BackendKind::Remote.retries_transient_failures());
        assert!(!BackendKind::Local.retries_transient_failures());
    }

    #[tokio::test]
    async fn test_create_backend_rejects_unknown_local_model() {
        let config = EmbeddingConfig {
            provider: Provider::Local,
            model: "bert-base-uncased".to_string(),
            ..Default::default()
        };
        let err = create_backend(&config).await.err().unwrap();
        assert!(matches!(
            err,
            AppError::Config(crate::error::ConfigError::UnknownModel { .. })
        ));
    }
}
