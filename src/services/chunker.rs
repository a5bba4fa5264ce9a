//! Structure-aware chunking with overlap for retrieval continuity.
//!
//! Code-like files are split on blank-line blocks, a cheap proxy for
//! top-level declarations; everything else is split on lines. Blocks and
//! lines are accumulated greedily and never cut, so a chunk may exceed the
//! target when a single block does.

use crate::models::{Chunk, ChunkingConfig, FileMetadata};

const BLOCK_SEPARATOR: &str = "\n\n";

/// Splits file content into ordered, header-tagged chunks.
#[derive(Debug, Clone)]
pub struct CodeChunker {
    /// Target chunk body length in characters
    chunk_size: usize,
    /// Overlap budget in characters
    overlap: usize,
    respect_structure: bool,
    code_extensions: Vec<String>,
}

impl CodeChunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
            respect_structure: config.respect_code_structure,
            code_extensions: config
                .code_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
        }
    }

    /// Create a chunker with default settings.
    pub fn with_defaults() -> Self {
        Self::new(&ChunkingConfig::default())
    }

    /// Chunk one file. Always returns at least one chunk.
    pub fn chunk(&self, content: &str, metadata: &FileMetadata) -> Vec<Chunk> {
        let bodies = if self.uses_blocks(&metadata.extension) {
            self.split_blocks(content)
        } else {
            self.split_lines(content)
        };

        if bodies.is_empty() {
            return vec![Chunk::new(content, metadata, 0)];
        }

        bodies
            .iter()
            .enumerate()
            .map(|(idx, body)| Chunk::new(body, metadata, idx))
            .collect()
    }

    fn uses_blocks(&self, extension: &str) -> bool {
        self.respect_structure
            && self
                .code_extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(extension))
    }

    /// Greedy accumulation over blank-line separated blocks.
    fn split_blocks(&self, content: &str) -> Vec<String> {
        let mut blocks: Vec<&str> = content
            .split(BLOCK_SEPARATOR)
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .collect();
        if blocks.is_empty() {
            blocks.push(content);
        }

        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_size = 0;

        for block in blocks {
            let block_size = char_len(block);

            if current_size + block_size > self.chunk_size && !current.is_empty() {
                chunks.push(current.join(BLOCK_SEPARATOR));

                let carried = if self.overlap > 0 { current.last().copied() } else { None };
                current.clear();
                current_size = 0;
                if let Some(last) = carried {
                    current.push(last);
                    current_size = char_len(last);
                }
            }

            current.push(block);
            current_size += block_size;
        }

        if !current.is_empty() {
            chunks.push(current.join(BLOCK_SEPARATOR));
        }

        chunks
    }

    /// Greedy accumulation over lines, overlapping by an estimated line count.
    fn split_lines(&self, content: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_size = 0;

        for line in content.split('\n') {
            let line_size = char_len(line);

            if current_size + line_size > self.chunk_size && !current.is_empty() {
                chunks.push(current.join("\n"));

                let keep = self.overlap_lines(current.len(), current_size);
                current.drain(..current.len() - keep);
                current_size = current.iter().map(|l| char_len(l)).sum();
            }

            current.push(line);
            current_size += line_size;
        }

        if !current.is_empty() {
            chunks.push(current.join("\n"));
        }

        chunks
    }

    /// Lines carried into the next chunk.
    ///
    /// The overlap budget is divided by the closed chunk's average line
    /// length. At least one line is kept when overlap is enabled, and fewer
    /// lines than the closed chunk held whenever it held more than one.
    fn overlap_lines(&self, line_count: usize, total_chars: usize) -> usize {
        if self.overlap == 0 || line_count == 0 {
            return 0;
        }
        let avg_line = (total_chars / line_count).max(1);
        let upper = if line_count > 1 { line_count - 1 } else { 1 };
        (self.overlap / avg_line).clamp(1, upper)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn chunker(chunk_size: usize, overlap: usize) -> CodeChunker {
        CodeChunker::new(&ChunkingConfig {
            chunk_size,
            chunk_overlap: overlap,
            ..Default::default()
        })
    }

    fn meta(path: &str) -> FileMetadata {
        FileMetadata::new(Path::new(path), "")
    }

    fn block(ch: char, len: usize) -> String {
        ch.to_string().repeat(len)
    }

    #[test]
    fn test_small_js_file_single_chunk() {
        let content = (1..=10)
            .map(|i| format!("const value{i} = {i};"))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = CodeChunker::with_defaults().chunk(&content, &meta("src/app.js"));

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.chunk_index, 0);
        assert_eq!(chunks[0].body(), content);
    }

    #[test]
    fn test_empty_content_single_empty_chunk() {
        for path in ["src/empty.ts", "README.md"] {
            let chunks = CodeChunker::with_defaults().chunk("", &meta(path));
            assert_eq!(chunks.len(), 1, "{path}");
            assert_eq!(chunks[0].body(), "");
            assert_eq!(chunks[0].metadata.chunk_size, 0);
            assert_eq!(chunks[0].metadata.chunk_index, 0);
        }
    }

    #[test]
    fn test_whitespace_only_content_single_chunk() {
        let chunks = CodeChunker::with_defaults().chunk("  \n\n \n", &meta("a.js"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].body(), "");
    }

    #[test]
    fn test_content_exactly_chunk_size_single_chunk() {
        let content = block('x', 1500);
        let chunks = chunker(1500, 200).chunk(&content, &meta("a.js"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.chunk_size, 1500);
    }

    #[test]
    fn test_overflow_starts_next_chunk_with_last_block() {
        let (a, b, c) = (block('a', 700), block('b', 700), block('c', 1000));
        let content = format!("{a}\n\n{b}\n\n{c}");
        let chunks = chunker(1500, 200).chunk(&content, &meta("src/list.jsx"));

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].body(), format!("{a}\n\n{b}"));
        assert!(chunks[1].body().starts_with(&b));
        assert_eq!(chunks[1].body(), format!("{b}\n\n{c}"));
        assert_eq!(chunks[1].metadata.chunk_index, 1);
    }

    #[test]
    fn test_three_large_blocks_each_overlap_previous() {
        let blocks = [block('a', 1000), block('b', 1000), block('c', 1000)];
        let content = blocks.join("\n\n");
        let chunks = chunker(1500, 200).chunk(&content, &meta("a.ts"));

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].body(), blocks[0]);
        for pair in chunks.windows(2) {
            let last_block = pair[0].body().rsplit("\n\n").next().unwrap();
            assert!(pair[1].body().starts_with(last_block));
        }
        assert_eq!(chunks[2].body(), format!("{}\n\n{}", blocks[1], blocks[2]));
    }

    #[test]
    fn test_zero_overlap_starts_fresh() {
        let (a, b, c) = (block('a', 700), block('b', 700), block('c', 1000));
        let content = format!("{a}\n\n{b}\n\n{c}");
        let chunks = chunker(1500, 0).chunk(&content, &meta("a.ts"));

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].body(), c);
    }

    #[test]
    fn test_oversized_block_is_not_truncated() {
        let big = block('z', 5000);
        let content = format!("import x from 'y';\n\n{big}\n\nexport default x;");
        let chunks = chunker(1000, 0).chunk(&content, &meta("a.js"));

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].body(), big);
        assert_eq!(chunks[1].metadata.chunk_size, 5000);
    }

    #[test]
    fn test_indices_are_contiguous() {
        let content = (0..40)
            .map(|i| format!("function f{i}() {{\n  return {i};\n}}"))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunker(120, 30).chunk(&content, &meta("a.js"));

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.chunk_index, i);
            assert!(chunk.content.contains(&format!("# Chunk: {}", i + 1)));
        }
    }

    #[test]
    fn test_block_branch_loses_no_content() {
        let blocks: Vec<String> = (0..25)
            .map(|i| format!("export const item{i} = {{ id: {i}, label: 'item {i}' }};"))
            .collect();
        let content = blocks.join("\n\n\n");
        let chunks = chunker(200, 50).chunk(&content, &meta("a.tsx"));

        for b in &blocks {
            assert!(
                chunks.iter().any(|c| c.body().split("\n\n").any(|x| x == b)),
                "missing block {b}"
            );
        }
        // only the declared one-block overlap is duplicated
        let emitted: usize = chunks.iter().map(|c| c.body().split("\n\n").count()).sum();
        assert_eq!(emitted, blocks.len() + chunks.len() - 1);
    }

    #[test]
    fn test_generic_branch_splits_on_lines() {
        let lines: Vec<String> = (0..100).map(|i| format!("line number {i:03}")).collect();
        let content = lines.join("\n");
        let chunks = chunker(300, 40).chunk(&content, &meta("notes.md"));

        assert!(chunks.len() > 1);
        for line in &lines {
            assert!(chunks.iter().any(|c| c.body().lines().any(|l| l == line)));
        }
        // 15-char lines, 40-char budget: two lines carried forward
        for pair in chunks.windows(2) {
            let prev: Vec<&str> = pair[0].body().lines().collect();
            let next: Vec<&str> = pair[1].body().lines().collect();
            assert_eq!(&next[..2], &prev[prev.len() - 2..]);
        }
    }

    #[test]
    fn test_generic_branch_keeps_at_least_one_line() {
        let lines: Vec<String> = (0..20).map(|i| format!("{i:02}{}", "-".repeat(98))).collect();
        let content = lines.join("\n");
        let chunks = chunker(250, 10).chunk(&content, &meta("data.txt"));

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let prev_last = pair[0].body().lines().last().unwrap();
            assert_eq!(pair[1].body().lines().next().unwrap(), prev_last);
        }
    }

    #[test]
    fn test_generic_branch_without_overlap() {
        let content = (0..50).map(|i| format!("row {i:02}")).collect::<Vec<_>>().join("\n");
        let chunks = chunker(60, 0).chunk(&content, &meta("rows.csv"));

        let total_lines: usize = chunks.iter().map(|c| c.body().lines().count()).sum();
        assert_eq!(total_lines, 50);
    }

    #[test]
    fn test_generic_overlap_does_not_grow_unbounded() {
        let content = (0..30).map(|i| format!("{i:02}{}", "x".repeat(18))).collect::<Vec<_>>();
        let chunks = chunker(10, 1000).chunk(&content.join("\n"), &meta("long.txt"));

        for chunk in &chunks {
            assert!(chunk.body().lines().count() <= 2);
        }
    }

    #[test]
    fn test_structure_disabled_uses_lines() {
        let config = ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 0,
            respect_code_structure: false,
            ..Default::default()
        };
        let content = format!("{}\n{}", block('a', 80), block('b', 80));
        let chunks = CodeChunker::new(&config).chunk(&content, &meta("a.js"));
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_extension_matching_ignores_case() {
        let content = format!("{}\n\n{}", block('a', 80), block('b', 80));
        let chunks = chunker(100, 0).chunk(&content, &meta("Legacy.JS"));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].body(), block('a', 80));
    }

    #[test]
    fn test_metadata_copied_into_every_chunk() {
        let mut file = meta("src/features/cart/Cart.tsx");
        file.layer = Some("presentation".to_string());
        file.feature = Some("cart".to_string());
        let content = format!("{}\n\n{}", block('a', 80), block('b', 80));
        let chunks = chunker(100, 0).chunk(&content, &file);

        for chunk in &chunks {
            assert_eq!(chunk.metadata.file, file);
            assert!(chunk.content.starts_with("# File: src/features/cart/Cart.tsx"));
            assert!(chunk.content.contains("# Feature: cart"));
        }
    }
}
