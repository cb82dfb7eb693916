//! Exception Review
//!
//! Operator workflow over the exception folder: look at one parked document
//! at a time, skip it, or approve it with a manual classification. Approval
//! runs the same terminal step as the automatic pipeline with confidence 1.0.
//!
//! The cursor is plain data owned by the caller; every operation takes the
//! cursor in and hands a normalized one back.

use crate::detect::{FileTypeDetector, MimeType};
use crate::models::{non_blank, Category, ClassificationResult};
use crate::quarantine::list_plain_files;
use crate::routing::{DispatchError, Dispatcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("No files awaiting review")]
    EmptyQueue,

    #[error("Failed to read exception folder {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Dispatch(#[from] DispatchError),
}

/// Position within the review queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewCursor {
    pub position: usize,
}

impl ReviewCursor {
    pub fn at(position: usize) -> Self {
        Self { position }
    }
}

/// The document under the cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    pub filename: String,
    pub path: PathBuf,
    pub mime: MimeType,
    /// 1-based position
    pub number: usize,
    pub total: usize,
}

impl ReviewItem {
    /// "k of n" progress label
    pub fn position_label(&self) -> String {
        format!("{} of {}", self.number, self.total)
    }
}

/// Operator-supplied classification
#[derive(Debug, Clone)]
pub struct ManualReview {
    pub category: Category,
    pub member_name: String,
    pub member_number: String,
    pub document_date: Option<String>,
    pub loan_type: Option<String>,
}

impl ManualReview {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            member_name: String::new(),
            member_number: String::new(),
            document_date: None,
            loan_type: None,
        }
    }

    fn into_result(self) -> ClassificationResult {
        ClassificationResult {
            category: self.category,
            confidence: 1.0,
            member_name: self.member_name.trim().to_string(),
            member_number: self.member_number.trim().to_string(),
            document_date: non_blank(self.document_date),
            loan_type: non_blank(self.loan_type),
            final_location: None,
        }
    }
}

/// Result of an approval: the indexed record, the refreshed queue and the
/// cursor to continue from.
#[derive(Debug)]
pub struct ReviewStep {
    pub record: ClassificationResult,
    pub queue: ReviewQueue,
    pub cursor: ReviewCursor,
}

/// Sorted snapshot of the exception folder
#[derive(Debug, Clone)]
pub struct ReviewQueue {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl ReviewQueue {
    pub fn load(exception_dir: &Path) -> Result<Self, ReviewError> {
        let files = list_plain_files(exception_dir).map_err(|source| ReviewError::Io {
            path: exception_dir.to_path_buf(),
            source,
        })?;

        Ok(Self {
            dir: exception_dir.to_path_buf(),
            files,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Reset to 0 when out of range or the queue is empty
    pub fn normalize(&self, cursor: ReviewCursor) -> ReviewCursor {
        if cursor.position >= self.files.len() {
            ReviewCursor::default()
        } else {
            cursor
        }
    }

    pub fn current(&self, cursor: ReviewCursor) -> Option<ReviewItem> {
        let cursor = self.normalize(cursor);
        let path = self.files.get(cursor.position)?;

        Some(ReviewItem {
            filename: file_name(path),
            path: path.clone(),
            mime: FileTypeDetector::new().detect(path),
            number: cursor.position + 1,
            total: self.files.len(),
        })
    }

    /// Advance round-robin
    pub fn skip(&self, cursor: ReviewCursor) -> ReviewCursor {
        if self.files.is_empty() {
            return ReviewCursor::default();
        }
        let cursor = self.normalize(cursor);
        ReviewCursor::at((cursor.position + 1) % self.files.len())
    }
}

/// Route the document under the cursor with an operator classification.
///
/// The queue is reloaded from disk afterwards; the cursor keeps its position
/// (now pointing at the next document) unless that falls off the end.
pub fn approve(
    dispatcher: &Dispatcher,
    queue: &ReviewQueue,
    cursor: ReviewCursor,
    review: ManualReview,
) -> Result<ReviewStep, ReviewError> {
    let item = queue.current(cursor).ok_or(ReviewError::EmptyQueue)?;
    let result = review.into_result();

    let record = dispatcher.dispatch(&item.path, &item.filename, result)?;

    tracing::info!(
        "[Review] Manually classified {} as {}",
        item.filename,
        record.category
    );

    let queue = ReviewQueue::load(&queue.dir)?;
    let cursor = queue.normalize(ReviewCursor::at(item.number - 1));

    Ok(ReviewStep {
        record,
        queue,
        cursor,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
