//! Progress and diagnostic reporting handed to the pipeline.

use std::sync::Mutex;

use tracing::{info, warn};

/// Sink for pipeline progress and warnings.
pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    /// `done` of `total` units of `unit` (e.g. "files", "batches") finished.
    fn progress(&self, unit: &'static str, done: usize, total: usize);
}

/// Forwards reports to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn warn(&self, message: &str) {
        warn!("{message}");
    }

    fn progress(&self, unit: &'static str, done: usize, total: usize) {
        info!(done, total, "{done}/{total} {unit} complete");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Info(String),
    Warn(String),
    Progress {
        unit: &'static str,
        done: usize,
        total: usize,
    },
}

/// Keeps every report in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<Report>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Progress events for `unit`, as `(done, total)` pairs.
    pub fn progress_for(&self, unit: &str) -> Vec<(usize, usize)> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                Report::Progress { unit: u, done, total } if u == unit => Some((done, total)),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                Report::Warn(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn push(&self, report: Report) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(report);
        }
    }
}

impl Reporter for RecordingReporter {
    fn info(&self, message: &str) {
        self.push(Report::Info(message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.push(Report::Warn(message.to_string()));
    }

    fn progress(&self, unit: &'static str, done: usize, total: usize) {
        self.push(Report::Progress { unit, done, total });
    }
}
