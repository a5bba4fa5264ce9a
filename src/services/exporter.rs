//! Writes the knowledge base and its markdown summary.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ExportError;
use crate::models::{Chunk, ChunkMetadata, Config, ExportFormat};
use crate::utils::file::size_in_mb;

/// Rows shown in the summary's feature table.
const TOP_FEATURES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseMetadata {
    pub agent_name: String,
    pub project_name: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub total_chunks: usize,
    pub embedding_model: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExportedChunk<'a> {
    id: String,
    content: &'a str,
    metadata: &'a ChunkMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    embedding: Option<&'a [f32]>,
}

#[derive(Debug, Serialize)]
struct KnowledgeBase<'a> {
    metadata: &'a KnowledgeBaseMetadata,
    chunks: Vec<ExportedChunk<'a>>,
}

/// Files written by one export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportedFiles {
    pub knowledge_base: PathBuf,
    pub summary: Option<PathBuf>,
}

pub struct Exporter<'a> {
    config: &'a Config,
}

impl<'a> Exporter<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Path the knowledge base is written to for the configured format.
    pub fn output_path(&self) -> PathBuf {
        let path = &self.config.paths.export_file;
        match self.config.export.format {
            ExportFormat::Json => path.clone(),
            ExportFormat::Jsonl => path.with_extension("jsonl"),
        }
    }

    pub fn export(
        &self,
        chunks: &[Chunk],
        embedding_model: Option<&str>,
    ) -> Result<ExportedFiles, ExportError> {
        let metadata = KnowledgeBaseMetadata {
            agent_name: self.config.project.agent_name.clone(),
            project_name: self.config.project.name.clone(),
            version: self.config.project.version.clone(),
            generated_at: Utc::now(),
            total_chunks: chunks.len(),
            embedding_model: embedding_model.map(str::to_string),
        };

        let path = self.output_path();
        ensure_parent(&path)?;
        let exported = self.exported_chunks(chunks);

        let mut writer = BufWriter::new(File::create(&path)?);
        match self.config.export.format {
            ExportFormat::Json => {
                let document = KnowledgeBase {
                    metadata: &metadata,
                    chunks: exported,
                };
                if self.config.export.pretty_print {
                    serde_json::to_writer_pretty(&mut writer, &document)?;
                } else {
                    serde_json::to_writer(&mut writer, &document)?;
                }
            }
            ExportFormat::Jsonl => {
                for chunk in &exported {
                    serde_json::to_writer(&mut writer, chunk)?;
                    writer.write_all(b"\n")?;
                }
            }
        }
        writer.flush()?;

        let size = fs::metadata(&path)?.len();
        info!(
            path = %path.display(),
            chunks = chunks.len(),
            "exported {:.2} MB",
            size_in_mb(size)
        );

        let summary = if self.config.export.summary {
            let summary_path = self.config.summary_path();
            ensure_parent(&summary_path)?;
            fs::write(&summary_path, render_summary(&metadata, chunks, &path))?;
            info!(path = %summary_path.display(), "summary written");
            Some(summary_path)
        } else {
            None
        };

        Ok(ExportedFiles {
            knowledge_base: path,
            summary,
        })
    }

    fn exported_chunks<'c>(&self, chunks: &'c [Chunk]) -> Vec<ExportedChunk<'c>> {
        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| ExportedChunk {
                id: format!("chunk_{i}"),
                content: &chunk.content,
                metadata: &chunk.metadata,
                embedding: if self.config.export.include_embeddings {
                    chunk.embedding.as_deref()
                } else {
                    None
                },
            })
            .collect()
    }
}

fn ensure_parent(path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Counts sorted by descending count, then name.
fn ranked(counts: BTreeMap<&str, usize>) -> Vec<(&str, usize)> {
    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    ranked
}

fn render_summary(metadata: &KnowledgeBaseMetadata, chunks: &[Chunk], export_path: &Path) -> String {
    let mut layers: BTreeMap<&str, usize> = BTreeMap::new();
    let mut features: BTreeMap<&str, usize> = BTreeMap::new();
    let mut patterns: BTreeMap<&str, usize> = BTreeMap::new();

    for chunk in chunks {
        let file = &chunk.metadata.file;
        *layers.entry(file.layer.as_deref().unwrap_or("unknown")).or_default() += 1;
        if let Some(feature) = file.feature.as_deref() {
            *features.entry(feature).or_default() += 1;
        }
        for pattern in file.patterns.iter().flatten() {
            *patterns.entry(pattern.as_str()).or_default() += 1;
        }
    }

    let mut out = String::new();
    writeln!(out, "# {} Knowledge Base Summary\n", metadata.agent_name).unwrap();
    writeln!(out, "## Project Information").unwrap();
    writeln!(out, "- **Agent**: {}", metadata.agent_name).unwrap();
    writeln!(out, "- **Project**: {} v{}", metadata.project_name, metadata.version).unwrap();
    writeln!(out, "- **Generated**: {}", metadata.generated_at.to_rfc3339()).unwrap();
    writeln!(out, "- **Total Chunks**: {}", metadata.total_chunks).unwrap();
    writeln!(
        out,
        "- **Embedding Model**: {}",
        metadata.embedding_model.as_deref().unwrap_or("none")
    )
    .unwrap();

    writeln!(out, "\n## Architecture Layers").unwrap();
    writeln!(out, "| Layer | Chunks |\n|-------|--------|").unwrap();
    for (layer, count) in ranked(layers) {
        writeln!(out, "| {layer} | {count} |").unwrap();
    }

    if !features.is_empty() {
        writeln!(out, "\n## Features Detected").unwrap();
        writeln!(out, "| Feature | Chunks |\n|---------|--------|").unwrap();
        for (feature, count) in ranked(features).into_iter().take(TOP_FEATURES) {
            writeln!(out, "| {feature} | {count} |").unwrap();
        }
    }

    if !patterns.is_empty() {
        writeln!(out, "\n## Patterns Found").unwrap();
        writeln!(out, "| Pattern | Occurrences |\n|---------|-------------|").unwrap();
        for (pattern, count) in ranked(patterns) {
            writeln!(out, "| {pattern} | {count} |").unwrap();
        }
    }

    let file_name = export_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    writeln!(out, "\n## Usage").unwrap();
    writeln!(
        out,
        "Load `{file_name}` into your vector database and point {} at it for retrieval.",
        metadata.agent_name
    )
    .unwrap();

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileMetadata;
    use tempfile::TempDir;

    fn config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.paths.output_dir = dir.join("out");
        config.paths.export_file = dir.join("out/kb.json");
        config
    }

    fn chunk(path: &str, layer: &str, feature: Option<&str>, patterns: &[&str], idx: usize) -> Chunk {
        let mut file = FileMetadata::new(Path::new(path), "const a = 1;");
        file.layer = Some(layer.to_string());
        file.feature = feature.map(str::to_string);
        file.patterns = Some(patterns.iter().map(|p| p.to_string()).collect());
        let mut chunk = Chunk::new("const a = 1;", &file, idx);
        chunk.embedding = Some(vec![0.25, 0.5]);
        chunk
    }

    fn sample() -> Vec<Chunk> {
        vec![
            chunk("src/screens/cart/Cart.tsx", "presentation", Some("cart"), &["hooks"], 0),
            chunk("src/screens/cart/Item.tsx", "presentation", Some("cart"), &["hooks", "stylesheet"], 0),
            chunk("src/services/api.ts", "services", None, &["api-call"], 0),
        ]
    }

    #[test]
    fn test_json_export_shape() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());
        let files = Exporter::new(&config)
            .export(&sample(), Some("all-MiniLM-L6-v2"))
            .unwrap();

        let raw = fs::read_to_string(&files.knowledge_base).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value["metadata"]["agent_name"], "Cortex");
        assert_eq!(value["metadata"]["total_chunks"], 3);
        assert_eq!(value["metadata"]["embedding_model"], "all-MiniLM-L6-v2");
        assert!(value["metadata"]["generated_at"].is_string());
        assert_eq!(value["chunks"][2]["id"], "chunk_2");
        assert_eq!(value["chunks"][0]["metadata"]["file_path"], "src/screens/cart/Cart.tsx");
        assert_eq!(value["chunks"][0]["metadata"]["chunk_index"], 0);
        assert_eq!(value["chunks"][0]["embedding"][1], 0.5);
        assert!(raw.contains("\n  "), "pretty print expected");
    }

    #[test]
    fn test_embeddings_can_be_omitted() {
        let dir = TempDir::new().unwrap();
        let mut config = config(dir.path());
        config.export.include_embeddings = false;
        config.export.pretty_print = false;
        config.export.summary = false;

        let files = Exporter::new(&config).export(&sample(), None).unwrap();
        let raw = fs::read_to_string(&files.knowledge_base).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert!(value["chunks"][0].get("embedding").is_none());
        assert!(value["metadata"]["embedding_model"].is_null());
        assert!(!raw.contains('\n'));
        assert!(files.summary.is_none());
    }

    #[test]
    fn test_jsonl_export_one_chunk_per_line() {
        let dir = TempDir::new().unwrap();
        let mut config = config(dir.path());
        config.export.format = ExportFormat::Jsonl;
        config.export.summary = false;

        let files = Exporter::new(&config).export(&sample(), None).unwrap();
        assert_eq!(files.knowledge_base, dir.path().join("out/kb.jsonl"));

        let raw = fs::read_to_string(&files.knowledge_base).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 3);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["id"], "chunk_0");
    }

    #[test]
    fn test_summary_tables() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());
        let files = Exporter::new(&config)
            .export(&sample(), Some("all-MiniLM-L6-v2"))
            .unwrap();

        let summary_path = files.summary.unwrap();
        assert_eq!(summary_path, dir.path().join("out/cortex_summary.md"));
        let summary = fs::read_to_string(summary_path).unwrap();

        assert!(summary.starts_with("# Cortex Knowledge Base Summary"));
        assert!(summary.contains("| presentation | 2 |\n| services | 1 |"));
        assert!(summary.contains("| cart | 2 |"));
        assert!(summary.contains("| hooks | 2 |"));
        assert!(summary.contains("| api-call | 1 |\n| stylesheet | 1 |"));
        assert!(summary.contains("`kb.json`"));
    }

    #[test]
    fn test_ranked_breaks_ties_by_name() {
        let counts = BTreeMap::from([("b", 1), ("a", 1), ("c", 3)]);
        assert_eq!(ranked(counts), vec![("c", 3), ("a", 1), ("b", 1)]);
    }
}
