use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.yaml";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LOCAL_MODEL: &str = "all-MiniLM-L6-v2";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Smallest accepted `chunk_size`, in characters.
pub const MIN_CHUNK_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub code_processing: CodeProcessingConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub metadata: MetadataConfig,

    #[serde(default)]
    pub architecture: ArchitectureConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// On-disk syntax of a configuration file, picked from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Yaml,
        }
    }
}

impl Config {
    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, ConfigFormat::from_path(path))
    }

    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let config = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Toml => toml::from_str(content)?,
        };
        Ok(config)
    }

    pub fn render(&self, format: ConfigFormat) -> Result<String, ConfigError> {
        let rendered = match format {
            ConfigFormat::Yaml => serde_yaml::to_string(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };
        Ok(rendered)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render(ConfigFormat::from_path(path))?)?;
        Ok(())
    }

    /// Reject configurations that cannot produce a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.paths.source_code.exists() {
            return Err(ConfigError::ValidationError(format!(
                "source code path does not exist: {}",
                self.paths.source_code.display()
            )));
        }
        self.validate_settings()
    }

    /// Everything `validate` checks except the file system.
    pub fn validate_settings(&self) -> Result<(), ConfigError> {
        let chunking = &self.code_processing.chunking;
        if chunking.chunk_size < MIN_CHUNK_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "chunk size must be at least {MIN_CHUNK_SIZE}, got {}",
                chunking.chunk_size
            )));
        }
        if chunking.chunk_overlap >= chunking.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunking.chunk_overlap, chunking.chunk_size
            )));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding batch size must be at least 1".to_string(),
            ));
        }
        if self.embedding.max_retries == 0 {
            return Err(ConfigError::ValidationError(
                "embedding max_retries must be at least 1".to_string(),
            ));
        }
        if self.embedding.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "embedding concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Markdown summary beside the export file, or in `output_dir` when the
    /// export path has no parent.
    pub fn summary_path(&self) -> PathBuf {
        let name = format!("{}_summary.md", self.project.agent_name.to_lowercase());
        let dir = self
            .paths
            .export_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(&self.paths.output_dir);
        dir.join(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_project_name")]
    pub name: String,

    #[serde(default = "default_project_version")]
    pub version: String,

    #[serde(default = "default_agent_name")]
    pub agent_name: String,
}

fn default_project_name() -> String {
    "codekb".to_string()
}

fn default_project_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_agent_name() -> String {
    "Cortex".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            version: default_project_version(),
            agent_name: default_agent_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_source_code")]
    pub source_code: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_export_file")]
    pub export_file: PathBuf,
}

fn default_source_code() -> PathBuf {
    PathBuf::from("./src-to-analyze")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_export_file() -> PathBuf {
    PathBuf::from("./output/knowledge_base.json")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_code: default_source_code(),
            output_dir: default_output_dir(),
            export_file: default_export_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeProcessingConfig {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,

    /// File names or glob patterns matched against the file name.
    #[serde(default = "default_ignore_files")]
    pub ignore_files: Vec<String>,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    #[serde(default)]
    pub chunking: ChunkingConfig,
}

fn default_extensions() -> Vec<String> {
    [".js", ".jsx", ".ts", ".tsx"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_ignore_dirs() -> Vec<String> {
    ["node_modules", ".git", "dist", "build", "coverage"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_ignore_files() -> Vec<String> {
    ["package-lock.json", "yarn.lock", "*.min.js"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

impl Default for CodeProcessingConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            ignore_dirs: default_ignore_dirs(),
            ignore_files: default_ignore_files(),
            max_file_size: default_max_file_size(),
            chunking: ChunkingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk body length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap budget in characters.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Split code-like files on blank-line blocks instead of lines.
    #[serde(default = "default_true")]
    pub respect_code_structure: bool,

    #[serde(default = "default_extensions")]
    pub code_extensions: Vec<String>,
}

fn default_chunk_size() -> usize {
    1500
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_true() -> bool {
    true
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            respect_code_structure: true,
            code_extensions: default_extensions(),
        }
    }
}

/// Which embedding backend a run uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Provider {
    /// In-process ONNX model
    #[default]
    Local,
    /// OpenAI-compatible HTTP API
    Remote,
}

impl TryFrom<String> for Provider {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::str::FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Provider::Local),
            "remote" | "openai" => Ok(Provider::Remote),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Local => write!(f, "local"),
            Provider::Remote => write!(f, "remote"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: Provider,

    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum chunks per backend call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Total attempts per batch for the remote backend.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_timeout", alias = "timeout")]
    pub timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_folder: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub use_gpu: bool,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Output dimensionality for remote models missing from the known table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,

    /// Remote batches in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_model() -> String {
    DEFAULT_LOCAL_MODEL.to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout() -> u64 {
    30
}

fn default_base_url() -> String {
    DEFAULT_OPENAI_URL.to_string()
}

fn default_concurrency() -> usize {
    1
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: default_model(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout(),
            cache_folder: None,
            use_gpu: true,
            base_url: default_base_url(),
            dimensions: None,
            concurrency: default_concurrency(),
        }
    }
}

impl EmbeddingConfig {
    /// Directory local models are cached in.
    pub fn model_cache_dir(&self) -> PathBuf {
        self.cache_folder.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .map(|p| p.join("codekb").join("models"))
                .unwrap_or_else(|| PathBuf::from("./models"))
        })
    }
}

/// Toggles for the analyzer's optional extractions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "default_true")]
    pub extract_imports: bool,

    #[serde(default = "default_true")]
    pub extract_exports: bool,

    #[serde(default = "default_true")]
    pub extract_components: bool,

    #[serde(default = "default_true")]
    pub extract_functions: bool,

    #[serde(default = "default_true")]
    pub detect_patterns: bool,

    #[serde(default = "default_true")]
    pub calculate_complexity: bool,

    #[serde(default = "default_true")]
    pub detect_platform: bool,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            extract_imports: true,
            extract_exports: true,
            extract_components: true,
            extract_functions: true,
            detect_patterns: true,
            calculate_complexity: true,
            detect_platform: true,
        }
    }
}

/// A named architectural layer and the path keywords that identify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRule {
    pub name: String,
    pub keywords: Vec<String>,
}

impl LayerRule {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    #[serde(default = "default_true")]
    pub detect_layers: bool,

    #[serde(default = "default_true")]
    pub map_features: bool,

    /// Checked in order; the first layer with a matching keyword wins.
    #[serde(default = "default_layers")]
    pub layers: Vec<LayerRule>,

    #[serde(default = "default_feature_dirs")]
    pub feature_dirs: Vec<String>,
}

fn default_layers() -> Vec<LayerRule> {
    vec![
        LayerRule::new("presentation", &["screens", "components", "views", "pages"]),
        LayerRule::new("navigation", &["navigation", "navigator", "routes"]),
        LayerRule::new("state", &["store", "redux", "slices", "context"]),
        LayerRule::new("services", &["services", "api", "clients"]),
        LayerRule::new("hooks", &["hooks"]),
        LayerRule::new("utils", &["utils", "helpers", "lib"]),
        LayerRule::new("config", &["config", "constants", "theme"]),
    ]
}

fn default_feature_dirs() -> Vec<String> {
    ["features", "modules", "screens", "pages"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for ArchitectureConfig {
    fn default() -> Self {
        Self {
            detect_layers: true,
            map_features: true,
            layers: default_layers(),
            feature_dirs: default_feature_dirs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Jsonl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub format: ExportFormat,

    #[serde(default = "default_true")]
    pub include_embeddings: bool,

    #[serde(default = "default_true")]
    pub pretty_print: bool,

    /// Write the markdown summary next to a JSON export.
    #[serde(default = "default_true")]
    pub summary: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Json,
            include_embeddings: true,
            pretty_print: true,
            summary: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Also append JSON logs to this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub console_output: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            file: None,
            console_output: true,
        }
    }
}
