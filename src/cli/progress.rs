use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::services::{Reporter, TracingReporter};

/// Shows the latest pipeline status on a spinner and forwards every
/// report to `tracing` without tearing the spinner line.
pub struct SpinnerReporter {
    bar: ProgressBar,
    inner: TracingReporter,
}

impl SpinnerReporter {
    /// `visible` is false for machine-readable output, where the spinner
    /// would corrupt the stream.
    pub fn new(visible: bool) -> Self {
        let bar = if visible {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        } else {
            ProgressBar::hidden()
        };
        Self {
            bar,
            inner: TracingReporter,
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Reporter for SpinnerReporter {
    fn info(&self, message: &str) {
        self.bar.set_message(message.to_string());
        self.bar.suspend(|| self.inner.info(message));
    }

    fn warn(&self, message: &str) {
        self.bar.suspend(|| self.inner.warn(message));
    }

    fn progress(&self, unit: &'static str, done: usize, total: usize) {
        self.bar.set_message(format!("{done}/{total} {unit} complete"));
        self.bar.suspend(|| self.inner.progress(unit, done, total));
    }
}
