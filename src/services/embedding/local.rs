use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ndarray::{Array2, ArrayD, Axis};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::{Session, SessionInputs, builder::GraphOptimizationLevel};
use ort::value::{DynTensor, Tensor};
use tokenizers::Tokenizer;
use tokenizers::{PaddingParams, PaddingStrategy, TruncationParams, TruncationStrategy};
use tracing::{debug, info};

use super::registry::LocalModelSpec;
use super::{BackendKind, EmbeddingBackend};
use crate::error::{EmbeddingError, ModelError};
use crate::models::EmbeddingConfig;

const MODEL_FILE: &str = "model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";

struct OnnxModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimension: usize,
}

/// Sentence-transformers model run in-process through ONNX Runtime.
pub struct LocalEmbedder {
    model: Arc<OnnxModel>,
    spec: &'static LocalModelSpec,
}

impl LocalEmbedder {
    /// Load `spec` from the model cache, downloading it on first use.
    pub async fn load(
        spec: &'static LocalModelSpec,
        config: &EmbeddingConfig,
    ) -> Result<Self, ModelError> {
        let model_dir = config.model_cache_dir().join(spec.name);
        ensure_model_files(spec, &model_dir).await?;

        let use_gpu = config.use_gpu;
        let model = tokio::task::spawn_blocking(move || OnnxModel::load(spec, &model_dir, use_gpu))
            .await
            .map_err(|e| ModelError::LoadError(e.to_string()))??;

        info!(
            model = spec.name,
            dimensions = spec.dimensions,
            gpu = use_gpu,
            "local embedding model loaded"
        );

        Ok(Self {
            model: Arc::new(model),
            spec,
        })
    }
}

#[async_trait]
impl EmbeddingBackend for LocalEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        let vectors = tokio::task::spawn_blocking(move || model.embed(&texts))
            .await
            .map_err(|e| ModelError::InferenceError(e.to_string()))??;
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.spec.dimensions
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn model(&self) -> &str {
        self.spec.name
    }
}

async fn ensure_model_files(spec: &LocalModelSpec, model_dir: &Path) -> Result<(), ModelError> {
    tokio::fs::create_dir_all(model_dir)
        .await
        .map_err(|e| ModelError::DownloadError(format!("{}: {}", model_dir.display(), e)))?;

    let files = [
        (model_dir.join(MODEL_FILE), spec.model_url()),
        (model_dir.join(TOKENIZER_FILE), spec.tokenizer_url()),
    ];
    let missing: Vec<&(PathBuf, String)> = files.iter().filter(|(p, _)| !p.exists()).collect();
    if missing.is_empty() {
        return Ok(());
    }

    info!(
        model = spec.name,
        size_mb = spec.size_mb,
        "downloading embedding model (first run only)"
    );
    let client = reqwest::Client::new();
    for (path, url) in missing {
        download(&client, url, path).await?;
    }
    Ok(())
}

async fn download(client: &reqwest::Client, url: &str, dest: &Path) -> Result<(), ModelError> {
    debug!(url, dest = %dest.display(), "downloading");
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ModelError::DownloadError(format!("{url}: {e}")))?;
    if !response.status().is_success() {
        return Err(ModelError::DownloadError(format!(
            "{url}: status {}",
            response.status()
        )));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ModelError::DownloadError(format!("{url}: {e}")))?;

    // Only renamed into place once fully written.
    let tmp = dest.with_extension("part");
    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|e| ModelError::DownloadError(format!("{}: {}", tmp.display(), e)))?;
    tokio::fs::rename(&tmp, dest)
        .await
        .map_err(|e| ModelError::DownloadError(format!("{}: {}", dest.display(), e)))?;
    Ok(())
}

impl OnnxModel {
    fn load(spec: &LocalModelSpec, model_dir: &Path, use_gpu: bool) -> Result<Self, ModelError> {
        let model_path = model_dir.join(MODEL_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);

        if !model_path.exists() {
            return Err(ModelError::NotFound(model_path.display().to_string()));
        }

        let mut builder = Session::builder()
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .with_intra_threads(num_cpus())
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?;

        // Falls back to CPU when CUDA is unavailable.
        if use_gpu {
            builder = builder
                .with_execution_providers([CUDAExecutionProvider::default().build()])
                .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?;
        }

        let session = builder
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: spec.max_length,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimension: spec.dimensions,
        })
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        let batch_size = encodings.len();
        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids = Array2::<i64>::zeros((batch_size, seq_len));
        let mut attention_mask = Array2::<i64>::zeros((batch_size, seq_len));
        let mut type_ids = Array2::<i64>::zeros((batch_size, seq_len));
        for (i, encoding) in encodings.iter().enumerate() {
            let tokens = encoding
                .get_ids()
                .iter()
                .zip(encoding.get_attention_mask())
                .zip(encoding.get_type_ids());
            for (j, ((&id, &mask), &type_id)) in tokens.enumerate() {
                input_ids[[i, j]] = id as i64;
                attention_mask[[i, j]] = mask as i64;
                type_ids[[i, j]] = type_id as i64;
            }
        }
        let mask_rows = attention_mask.clone();

        let mut available: HashMap<String, DynTensor> = HashMap::new();
        available.insert("input_ids".to_string(), to_tensor(input_ids)?);
        available.insert("attention_mask".to_string(), to_tensor(attention_mask)?);
        available.insert("token_type_ids".to_string(), to_tensor(type_ids)?);

        let output = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| ModelError::InferenceError("session lock poisoned".to_string()))?;

            // Exports differ in which of the three inputs they declare.
            let mut feed: HashMap<String, DynTensor> = HashMap::new();
            for input in &session.inputs {
                let value = available.remove(&input.name).ok_or_else(|| {
                    ModelError::InferenceError(format!("unsupported model input '{}'", input.name))
                })?;
                feed.insert(input.name.clone(), value);
            }

            let outputs = session
                .run(SessionInputs::from(feed))
                .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;
            if outputs.len() == 0 {
                return Err(ModelError::InferenceError("model returned no outputs".to_string()));
            }
            outputs[0]
                .try_extract_array::<f32>()
                .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?
                .to_owned()
        };

        pool_output(output, &mask_rows, self.dimension)
    }
}

fn to_tensor(array: Array2<i64>) -> Result<DynTensor, ModelError> {
    Ok(Tensor::from_array(array.into_dyn())
        .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?
        .upcast())
}

/// Turn raw model output into one normalized vector per row.
///
/// Token-level output `[batch, seq, dim]` is mean-pooled over the attention
/// mask; sentence-level output `[batch, dim]` is used directly.
fn pool_output(
    output: ArrayD<f32>,
    mask: &Array2<i64>,
    dimension: usize,
) -> Result<Vec<Vec<f32>>, ModelError> {
    let shape = output.shape().to_vec();
    let vectors: Vec<Vec<f32>> = match shape.as_slice() {
        [batch, _, dim] if *dim == dimension => (0..*batch)
            .map(|i| {
                let tokens = output.index_axis(Axis(0), i);
                let mut pooled = vec![0.0f32; dimension];
                let mut count = 0.0f32;
                for (j, token) in tokens.axis_iter(Axis(0)).enumerate() {
                    if mask[[i, j]] == 0 {
                        continue;
                    }
                    for (acc, v) in pooled.iter_mut().zip(token.iter()) {
                        *acc += v;
                    }
                    count += 1.0;
                }
                if count > 0.0 {
                    pooled.iter_mut().for_each(|v| *v /= count);
                }
                normalize(pooled)
            })
            .collect(),
        [batch, dim] if *dim == dimension => (0..*batch)
            .map(|i| normalize(output.index_axis(Axis(0), i).iter().copied().collect()))
            .collect(),
        _ => {
            return Err(ModelError::InferenceError(format!(
                "unexpected output shape {:?} for dimension {}",
                shape, dimension
            )));
        }
    };
    Ok(vectors)
}

fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
