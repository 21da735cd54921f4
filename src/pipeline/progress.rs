use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info};

/// Receives progress from analysis and execution.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, done: usize, total: usize, message: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _done: usize, _total: usize, _message: &str) {}
}

/// Emits progress as tracing events, at `info` every `every` steps and at
/// `debug` otherwise.
#[derive(Debug, Clone, Copy)]
pub struct LogProgress {
    pub every: usize,
}

impl Default for LogProgress {
    fn default() -> Self {
        Self { every: 100 }
    }
}

impl ProgressReporter for LogProgress {
    fn report(&self, done: usize, total: usize, message: &str) {
        if done == total || (self.every > 0 && done % self.every == 0) {
            info!(done, total, "{message}");
        } else {
            debug!(done, total, "{message}");
        }
    }
}

/// Monotonic counter forwarding each step to a reporter.
pub struct ProgressCounter<'a> {
    done: AtomicUsize,
    total: usize,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> ProgressCounter<'a> {
    pub fn new(total: usize, reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            done: AtomicUsize::new(0),
            total,
            reporter,
        }
    }

    pub fn step(&self, message: &str) -> usize {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        self.reporter.report(done, self.total, message);
        done
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }
}
