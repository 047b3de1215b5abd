use std::future::Future;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct BulkResult<R> {
    /// `(index, value)` in input order.
    pub successful: Vec<(usize, R)>,
    /// `(index, error)` in input order.
    pub failed: Vec<(usize, anyhow::Error)>,
}

impl<R> BulkResult<R> {
    pub fn success_count(&self) -> usize {
        self.successful.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}

/// Runs one job per item, strictly one after another in input order.
/// A failed job is recorded and the next item starts anyway.
pub struct BulkExecutor {
    dry_run: bool,
    show_progress: bool,
}

impl BulkExecutor {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub async fn run<T, R, Fut, F>(&self, items: Vec<T>, mut job: F) -> BulkResult<R>
    where
        T: std::fmt::Debug,
        F: FnMut(usize, T) -> Fut,
        Fut: Future<Output = anyhow::Result<R>>,
    {
        let mut result = BulkResult {
            successful: Vec::new(),
            failed: Vec::new(),
        };

        if items.is_empty() {
            debug!("No items to process");
            return result;
        }

        let total = items.len();
        info!(total, dry_run = self.dry_run, "Starting bulk execution");
        let progress = self.create_progress_bar(total);

        for (idx, item) in items.into_iter().enumerate() {
            if self.dry_run {
                info!(?item, "Dry run: skipping execution");
                progress.inc(1);
                continue;
            }

            debug!(index = idx, "Processing item");
            match job(idx, item).await {
                Ok(value) => result.successful.push((idx, value)),
                Err(e) => {
                    warn!(index = idx, error = %e, "Task failed");
                    result.failed.push((idx, e));
                }
            }
            progress.inc(1);
        }

        if result.failed.is_empty() {
            progress.finish_with_message("All tasks completed successfully");
        } else {
            progress.finish_with_message(format!(
                "Completed: {} succeeded, {} failed",
                result.successful.len(),
                result.failed.len()
            ));
        }

        info!(
            success = result.successful.len(),
            failures = result.failed.len(),
            "Bulk execution completed"
        );

        result
    }

    fn create_progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        ) {
            progress.set_style(style.progress_chars("#>-"));
        }
        progress
    }
}
