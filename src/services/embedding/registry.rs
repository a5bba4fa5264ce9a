use crate::error::ConfigError;

/// A sentence-transformers model the local backend knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalModelSpec {
    pub name: &'static str,
    /// Hugging Face repository holding the ONNX export.
    pub repo: &'static str,
    pub dimensions: usize,
    /// Token limit applied by the tokenizer.
    pub max_length: usize,
    pub size_mb: u32,
    pub description: &'static str,
}

impl LocalModelSpec {
    pub fn model_url(&self) -> String {
        format!("https://huggingface.co/{}/resolve/main/onnx/model.onnx", self.repo)
    }

    pub fn tokenizer_url(&self) -> String {
        format!("https://huggingface.co/{}/resolve/main/tokenizer.json", self.repo)
    }
}

pub const LOCAL_MODELS: &[LocalModelSpec] = &[
    LocalModelSpec {
        name: "all-MiniLM-L6-v2",
        repo: "sentence-transformers/all-MiniLM-L6-v2",
        dimensions: 384,
        max_length: 256,
        size_mb: 80,
        description: "Best balance - fast and good quality",
    },
    LocalModelSpec {
        name: "all-mpnet-base-v2",
        repo: "sentence-transformers/all-mpnet-base-v2",
        dimensions: 768,
        max_length: 384,
        size_mb: 420,
        description: "Best quality - slower but more accurate",
    },
    LocalModelSpec {
        name: "paraphrase-multilingual-MiniLM-L12-v2",
        repo: "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2",
        dimensions: 384,
        max_length: 128,
        size_mb: 420,
        description: "Multilingual - good for non-English comments",
    },
];

pub fn find_local_model(name: &str) -> Result<&'static LocalModelSpec, ConfigError> {
    LOCAL_MODELS
        .iter()
        .find(|m| m.name == name)
        .ok_or_else(|| ConfigError::UnknownModel {
            model: name.to_string(),
            available: LOCAL_MODELS
                .iter()
                .map(|m| m.name)
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// Output size of well-known OpenAI embedding models.
pub fn remote_model_dimensions(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

/// Whether `model` honors the `dimensions` request parameter.
pub fn accepts_dimensions(model: &str) -> bool {
    model.starts_with("text-embedding-3")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_local_model() {
        let spec = find_local_model("all-mpnet-base-v2").unwrap();
        assert_eq!(spec.dimensions, 768);
        assert_eq!(
            spec.model_url(),
            "https://huggingface.co/sentence-transformers/all-mpnet-base-v2/resolve/main/onnx/model.onnx"
        );
    }

    #[test]
    fn test_unknown_local_model_lists_available() {
        let err = find_local_model("gte-small").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("gte-small"));
        assert!(msg.contains("all-MiniLM-L6-v2"));
    }

    #[test]
    fn test_remote_model_dimensions() {
        assert_eq!(remote_model_dimensions("text-embedding-3-small"), Some(1536));
        assert_eq!(remote_model_dimensions("text-embedding-3-large"), Some(3072));
        assert_eq!(remote_model_dimensions("custom"), None);
    }

    #[test]
    fn test_accepts_dimensions() {
        assert!(accepts_dimensions("text-embedding-3-large"));
        assert!(!accepts_dimensions("text-embedding-ada-002"));
        assert!(!accepts_dimensions("nomic-embed-text"));
    }
}
