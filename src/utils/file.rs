//! File utilities for scanning and reading source files.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::error::IndexError;

/// Calculate SHA-256 checksum of content.
pub fn calculate_checksum(content: &str) -> String {
    let hash = Sha256::digest(content.as_bytes());
    hex::encode(hash)
}

/// Read a file as text, enforcing a size limit.
///
/// Content that is not valid UTF-8 is decoded as Latin-1, which maps every
/// byte to a character and therefore cannot fail.
pub fn read_file_content(path: &Path, max_size: u64) -> Result<String, IndexError> {
    let read_error = |source| IndexError::FileReadError {
        path: path.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(path).map_err(read_error)?;
    if metadata.len() > max_size {
        return Err(IndexError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max: max_size,
        });
    }

    let bytes = fs::read(path).map_err(read_error)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => decode_latin1(err.as_bytes()),
    })
}

/// Decode bytes as ISO-8859-1.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Get the relative path from a base directory.
pub fn get_relative_path(base: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(base)
        .ok()
        .map(|p| p.to_string_lossy().to_string())
}

/// Human-readable size in megabytes.
pub fn size_in_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_calculate_checksum() {
        let checksum = calculate_checksum("hello world");
        assert_eq!(checksum.len(), 64); // SHA-256 produces 64 hex chars
        assert_eq!(checksum, calculate_checksum("hello world"));
        assert_ne!(checksum, calculate_checksum("hello world!"));
    }

    #[test]
    fn test_read_utf8_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "const café = 'ok';").unwrap();
        let content = read_file_content(file.path(), 1024).unwrap();
        assert_eq!(content, "const café = 'ok';");
    }

    #[test]
    fn test_read_falls_back_to_latin1() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // "café" encoded as ISO-8859-1
        file.write_all(&[b'c', b'a', b'f', 0xE9]).unwrap();
        let content = read_file_content(file.path(), 1024).unwrap();
        assert_eq!(content, "café");
    }

    #[test]
    fn test_read_rejects_large_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[b'a'; 64]).unwrap();
        let err = read_file_content(file.path(), 10).unwrap_err();
        assert!(matches!(err, IndexError::FileTooLarge { size: 64, max: 10, .. }));
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_file_content(Path::new("/no/such/file.js"), 10).unwrap_err();
        assert!(matches!(err, IndexError::FileReadError { .. }));
    }

    #[test]
    fn test_get_relative_path() {
        let rel = get_relative_path(Path::new("/repo"), Path::new("/repo/src/app.ts"));
        assert_eq!(rel.as_deref(), Some("src/app.ts"));
        assert!(get_relative_path(Path::new("/other"), Path::new("/repo/a.ts")).is_none());
    }

    #[test]
    fn test_size_in_mb() {
        assert_eq!(size_in_mb(1024 * 1024), 1.0);
    }
}
