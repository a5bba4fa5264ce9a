use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::file::calculate_checksum;

/// React component found by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Functional,
    Class,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Ios,
    Android,
    MultiPlatform,
    Universal,
}

/// Metadata for one source file. Built before chunking and never mutated
/// afterwards; every chunk of the file carries a copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_path: String,
    pub file_name: String,
    /// Extension including the leading dot, empty when the file has none.
    pub extension: String,
    pub lines_count: usize,
    pub size_bytes: u64,
    pub checksum: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imports: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exports: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<Component>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
}

impl FileMetadata {
    /// Base record: path facts and sizes, no analysis.
    pub fn new(path: &Path, content: &str) -> Self {
        Self {
            file_path: path.to_string_lossy().to_string(),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            extension: path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default(),
            lines_count: content.split('\n').count(),
            size_bytes: content.len() as u64,
            checksum: calculate_checksum(content),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(flatten)]
    pub file: FileMetadata,
    /// Zero-based position within the file.
    pub chunk_index: usize,
    /// Body length in characters, excluding the header.
    pub chunk_size: usize,
}

/// One size-bounded slice of a file, ready for embedding and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Header block followed by the body, trimmed.
    pub content: String,
    pub metadata: ChunkMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    pub fn new(body: &str, file: &FileMetadata, chunk_index: usize) -> Self {
        let rendered = format!(
            "# File: {}\n# Layer: {}\n# Feature: {}\n# Chunk: {}\n\n{}\n",
            file.file_path,
            file.layer.as_deref().unwrap_or("unknown"),
            file.feature.as_deref().unwrap_or("N/A"),
            chunk_index + 1,
            body
        );

        Self {
            content: rendered.trim().to_string(),
            metadata: ChunkMetadata {
                file: file.clone(),
                chunk_index,
                chunk_size: body.chars().count(),
            },
            embedding: None,
        }
    }

    /// The chunk text without its header.
    pub fn body(&self) -> &str {
        self.content
            .split_once("\n\n")
            .map(|(_, body)| body)
            .unwrap_or("")
    }

    pub fn is_embedded(&self) -> bool {
        self.embedding.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> FileMetadata {
        let mut meta = FileMetadata::new(Path::new("src/screens/home/Home.tsx"), "a\nb\nc");
        meta.layer = Some("presentation".to_string());
        meta.feature = Some("home".to_string());
        meta
    }

    #[test]
    fn test_file_metadata_new() {
        let meta = FileMetadata::new(Path::new("app/index.js"), "line one\nline two\n");
        assert_eq!(meta.file_name, "index.js");
        assert_eq!(meta.extension, ".js");
        assert_eq!(meta.lines_count, 3);
        assert_eq!(meta.size_bytes, 18);
        assert_eq!(meta.checksum.len(), 64);
        assert!(meta.layer.is_none());
    }

    #[test]
    fn test_file_metadata_without_extension() {
        let meta = FileMetadata::new(Path::new("Makefile"), "");
        assert_eq!(meta.extension, "");
        assert_eq!(meta.lines_count, 1);
    }

    #[test]
    fn test_chunk_header() {
        let chunk = Chunk::new("const a = 1;", &metadata(), 2);
        let expected = "# File: src/screens/home/Home.tsx\n\
                        # Layer: presentation\n\
                        # Feature: home\n\
                        # Chunk: 3\n\n\
                        const a = 1;";
        assert_eq!(chunk.content, expected);
        assert_eq!(chunk.body(), "const a = 1;");
        assert_eq!(chunk.metadata.chunk_index, 2);
        assert_eq!(chunk.metadata.chunk_size, 12);
        assert!(!chunk.is_embedded());
    }

    #[test]
    fn test_chunk_header_defaults() {
        let meta = FileMetadata::new(Path::new("x.md"), "");
        let chunk = Chunk::new("", &meta, 0);
        assert!(chunk.content.contains("# Layer: unknown"));
        assert!(chunk.content.contains("# Feature: N/A"));
        assert!(chunk.content.ends_with("# Chunk: 1"));
        assert_eq!(chunk.body(), "");
        assert_eq!(chunk.metadata.chunk_size, 0);
    }

    #[test]
    fn test_chunk_size_counts_characters() {
        let chunk = Chunk::new("héllo wörld", &metadata(), 0);
        assert_eq!(chunk.metadata.chunk_size, 11);
    }

    #[test]
    fn test_chunk_serializes_flat_metadata() {
        let mut chunk = Chunk::new("body", &metadata(), 0);
        let value = serde_json::to_value(&chunk).unwrap();
        assert_eq!(value["metadata"]["file_name"], "Home.tsx");
        assert_eq!(value["metadata"]["chunk_index"], 0);
        assert!(value.get("embedding").is_none());
        assert!(value["metadata"].get("imports").is_none());

        chunk.embedding = Some(vec![0.5, 0.25]);
        let value = serde_json::to_value(&chunk).unwrap();
        assert_eq!(value["embedding"][1], 0.25);
    }
}
