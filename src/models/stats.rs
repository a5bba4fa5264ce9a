use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::Provider;

/// Counters for one run, available whether or not the run succeeded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub files_scanned: u64,
    pub files_processed: u64,
    pub chunks_created: u64,
    pub chunks_embedded: u64,
    pub errors: u64,
    pub embedding_provider: Option<Provider>,
    pub duration_ms: u64,
}

impl RunStats {
    pub fn record_duration(&mut self, elapsed: Duration) {
        self.duration_ms = elapsed.as_millis() as u64;
    }
}
