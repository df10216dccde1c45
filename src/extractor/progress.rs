use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

/// Shared collection counters. Cheap to clone; all clones report into the
/// same counters from any worker thread.
#[derive(Clone)]
pub struct ExtractionProgress {
    inner: Arc<Inner>,
}

struct Inner {
    files_total: AtomicUsize,
    files_processed: AtomicUsize,
    definitions_found: AtomicUsize,
    files_skipped: AtomicUsize,
    is_active: AtomicBool,
    started_at: Mutex<Option<Instant>>,
    bar: Option<ProgressBar>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub is_active: bool,
    pub files_total: usize,
    pub files_processed: usize,
    pub definitions_found: usize,
    pub files_skipped: usize,
    pub elapsed_ms: u64,
    pub progress_pct: f64,
}

impl Default for ExtractionProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionProgress {
    /// Counters only, nothing drawn
    pub fn new() -> Self {
        Self::with_bar(None)
    }

    /// Counters that also drive a progress bar on stderr
    pub fn with_terminal_bar() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} files {msg}")
        {
            bar.set_style(style);
        }
        Self::with_bar(Some(bar))
    }

    fn with_bar(bar: Option<ProgressBar>) -> Self {
        Self {
            inner: Arc::new(Inner {
                files_total: AtomicUsize::new(0),
                files_processed: AtomicUsize::new(0),
                definitions_found: AtomicUsize::new(0),
                files_skipped: AtomicUsize::new(0),
                is_active: AtomicBool::new(false),
                started_at: Mutex::new(None),
                bar,
            }),
        }
    }

    pub fn start(&self, total_files: usize) {
        self.inner.files_total.store(total_files, Ordering::Release);
        self.inner.files_processed.store(0, Ordering::Release);
        self.inner.definitions_found.store(0, Ordering::Release);
        self.inner.files_skipped.store(0, Ordering::Release);
        self.inner.is_active.store(true, Ordering::Release);
        if let Ok(mut started) = self.inner.started_at.lock() {
            *started = Some(Instant::now());
        }
        if let Some(bar) = &self.inner.bar {
            bar.set_length(total_files as u64);
            bar.set_position(0);
        }
    }

    pub fn inc(&self, definitions: usize) {
        self.inner.files_processed.fetch_add(1, Ordering::Relaxed);
        self.inner
            .definitions_found
            .fetch_add(definitions, Ordering::Relaxed);
        if let Some(bar) = &self.inner.bar {
            bar.inc(1);
        }
    }

    pub fn inc_skipped(&self) {
        self.inner.files_processed.fetch_add(1, Ordering::Relaxed);
        self.inner.files_skipped.fetch_add(1, Ordering::Relaxed);
        if let Some(bar) = &self.inner.bar {
            bar.inc(1);
        }
    }

    pub fn finish(&self) {
        self.inner.is_active.store(false, Ordering::Release);
        if let Some(bar) = &self.inner.bar {
            bar.finish_and_clear();
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let is_active = self.inner.is_active.load(Ordering::Acquire);
        let files_total = self.inner.files_total.load(Ordering::Acquire);
        let files_processed = self.inner.files_processed.load(Ordering::Acquire);
        let definitions_found = self.inner.definitions_found.load(Ordering::Acquire);
        let files_skipped = self.inner.files_skipped.load(Ordering::Acquire);

        let elapsed_ms = self
            .inner
            .started_at
            .lock()
            .ok()
            .and_then(|started| started.map(|t| t.elapsed().as_millis() as u64))
            .unwrap_or(0);

        let progress_pct = if files_total > 0 {
            (files_processed as f64 / files_total as f64) * 100.0
        } else {
            0.0
        };

        ProgressSnapshot {
            is_active,
            files_total,
            files_processed,
            definitions_found,
            files_skipped,
            elapsed_ms,
            progress_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_before_start() {
        let progress = ExtractionProgress::new();
        let snapshot = progress.snapshot();
        assert!(!snapshot.is_active);
        assert_eq!(snapshot.files_total, 0);
        assert_eq!(snapshot.progress_pct, 0.0);
        assert_eq!(snapshot.elapsed_ms, 0);
    }

    #[test]
    fn test_counts_across_clones() {
        let progress = ExtractionProgress::new();
        progress.start(4);

        let worker = progress.clone();
        worker.inc(3);
        worker.inc(2);
        progress.inc_skipped();

        let snapshot = progress.snapshot();
        assert!(snapshot.is_active);
        assert_eq!(snapshot.files_processed, 3);
        assert_eq!(snapshot.definitions_found, 5);
        assert_eq!(snapshot.files_skipped, 1);
        assert_eq!(snapshot.progress_pct, 75.0);

        progress.finish();
        assert!(!progress.snapshot().is_active);
    }

    #[test]
    fn test_start_resets_counters() {
        let progress = ExtractionProgress::new();
        progress.start(2);
        progress.inc(1);
        progress.start(5);

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.files_total, 5);
        assert_eq!(snapshot.files_processed, 0);
        assert_eq!(snapshot.definitions_found, 0);
    }

    #[test]
    fn test_hidden_bar_tracks_position() {
        let progress = ExtractionProgress::with_bar(Some(ProgressBar::hidden()));
        progress.start(2);
        progress.inc(1);
        progress.inc_skipped();
        assert_eq!(progress.snapshot().files_processed, 2);
        progress.finish();
    }
}
