//! Source tree discovery.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::IndexError;
use crate::models::CodeProcessingConfig;

/// Finds the code files a run should index.
#[derive(Debug)]
pub struct FileScanner {
    root: PathBuf,
    /// Lowercased, with leading dot.
    extensions: Vec<String>,
    ignore_dirs: Vec<String>,
    ignore_files: Vec<String>,
    ignore_patterns: Vec<glob::Pattern>,
}

impl FileScanner {
    pub fn new(root: PathBuf, config: &CodeProcessingConfig) -> Self {
        let extensions = config
            .extensions
            .iter()
            .map(|e| {
                let e = e.to_lowercase();
                if e.starts_with('.') { e } else { format!(".{e}") }
            })
            .collect();
        let ignore_patterns = config
            .ignore_files
            .iter()
            .filter(|p| p.contains(['*', '?', '[']))
            .filter_map(|p| glob::Pattern::new(p).ok())
            .collect();

        Self {
            root,
            extensions,
            ignore_dirs: config.ignore_dirs.clone(),
            ignore_files: config.ignore_files.clone(),
            ignore_patterns,
        }
    }

    /// All matching files under the root, sorted by path.
    pub fn collect_files(&self) -> Result<Vec<PathBuf>, IndexError> {
        if self.root.is_file() {
            return Ok(if self.is_candidate(&self.root) {
                vec![self.root.clone()]
            } else {
                Vec::new()
            });
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !self.is_ignored_dir(entry));

        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file() && self.is_candidate(entry.path()) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        Ok(files)
    }

    fn is_ignored_dir(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.ignore_dirs.iter().any(|d| d == name))
    }

    fn is_candidate(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if self.ignore_files.iter().any(|f| f == name)
            || self.ignore_patterns.iter().any(|p| p.matches(name))
        {
            return false;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = format!(".{}", ext.to_lowercase());
        self.extensions.contains(&ext)
    }
}
