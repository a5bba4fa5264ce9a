//! Utility modules.

pub mod file;
pub mod retry;

pub use file::{calculate_checksum, decode_latin1, get_relative_path, read_file_content};
pub use retry::{RetryConfig, RetryResult, Retryable, with_retry};
