//! Batch processing of the input folder
//!
//! Routes every waiting file in name order, reporting progress after each
//! one. Individual failures never stop the batch; they become exception
//! outcomes inside the router.

use crate::quarantine::list_input_files;
use crate::routing::{RouteOutcome, Router};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Failed to list input folder {path}: {source}")]
pub struct BatchError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Progress report emitted after each file
#[derive(Debug, Clone)]
pub struct BatchProgress {
    /// 1-based
    pub index: usize,
    pub total: usize,
    pub filename: String,
    pub outcome: RouteOutcome,
}

#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub started_at: DateTime<Local>,
    pub total: usize,
    pub routed: usize,
    pub exceptioned: usize,
    pub elapsed: Duration,
}

impl BatchSummary {
    fn empty(started_at: DateTime<Local>) -> Self {
        Self {
            started_at,
            total: 0,
            routed: 0,
            exceptioned: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn average_per_file(&self) -> Duration {
        if self.total == 0 {
            Duration::ZERO
        } else {
            self.elapsed / self.total as u32
        }
    }
}

/// Route every plain file in `input_dir`, dotfiles included, calling
/// `on_progress` after each.
pub async fn run<F>(
    router: &Router,
    input_dir: &Path,
    mut on_progress: F,
) -> Result<BatchSummary, BatchError>
where
    F: FnMut(&BatchProgress),
{
    let started_at = Local::now();
    let start = Instant::now();

    let files = list_input_files(input_dir).map_err(|source| BatchError {
        path: input_dir.to_path_buf(),
        source,
    })?;

    if files.is_empty() {
        tracing::info!("[Batch] No files waiting in {}", input_dir.display());
        return Ok(BatchSummary::empty(started_at));
    }

    let total = files.len();
    tracing::info!("[Batch] Processing {} files from {}", total, input_dir.display());

    let mut summary = BatchSummary::empty(started_at);
    summary.total = total;

    for (i, path) in files.iter().enumerate() {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let outcome = router.route(path, &filename).await;
        if outcome.success {
            summary.routed += 1;
        } else {
            summary.exceptioned += 1;
        }

        on_progress(&BatchProgress {
            index: i + 1,
            total,
            filename,
            outcome,
        });
    }

    summary.elapsed = start.elapsed();
    tracing::info!(
        "[Batch] Done: {} routed, {} exceptions in {:.2}s",
        summary.routed,
        summary.exceptioned,
        summary.elapsed.as_secs_f64()
    );

    Ok(summary)
}
