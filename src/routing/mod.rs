//! Routing Pipeline
//!
//! Per-document state machine: detect, extract, classify, gate on confidence,
//! then either file the document under its category or park it in the
//! exception folder. Every document ends in exactly one of those two places.
//!
//! Each stage returns `Result<_, FailureReason>`; the pipeline boundary in
//! [`Router::route`] is the only place failures are turned into exception
//! moves, so no error can abort a batch.

mod dispatch;

pub use dispatch::{destination_name, DispatchError, Dispatcher};

use crate::ai::{Classifier, ClassifierError};
use crate::config::RouterConfig;
use crate::detect::FileTypeDetector;
use crate::extract::{ContentExtractor, ExtractionError};
use crate::models::ClassificationResult;
use crate::quarantine::ExceptionFolder;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Longest reason carried in an exception message
const MAX_REASON_CHARS: usize = 100;

/// Why a document was sent to manual review
#[derive(Debug, Error)]
pub enum FailureReason {
    #[error("{0}")]
    Extraction(#[from] ExtractionError),

    #[error("No extractable content found.")]
    NoContent,

    #[error("Confidence score too low: {:.1}%", percent(.confidence))]
    LowConfidence { confidence: f64 },

    #[error("{0}")]
    Classifier(#[from] ClassifierError),

    #[error("{0}")]
    Dispatch(#[from] DispatchError),
}

fn percent(confidence: &f64) -> f64 {
    confidence * 100.0
}

/// What happened to one document
#[derive(Debug, Clone, Serialize)]
pub struct RouteOutcome {
    pub filename: String,

    /// True when the document was routed to a category folder
    pub success: bool,

    /// Operator-facing summary line
    pub message: String,

    /// Where the file ended up, if it was moved at all
    pub location: Option<PathBuf>,

    /// Indexed record for routed documents
    pub result: Option<ClassificationResult>,
}

impl RouteOutcome {
    fn routed(filename: &str, record: ClassificationResult) -> Self {
        Self {
            filename: filename.to_string(),
            success: true,
            message: format!(
                "Classified as {} ({})",
                record.category,
                record.confidence_percent()
            ),
            location: record.final_location.clone(),
            result: Some(record),
        }
    }

    fn exception(filename: &str, message: String, location: Option<PathBuf>) -> Self {
        Self {
            filename: filename.to_string(),
            success: false,
            message,
            location,
            result: None,
        }
    }
}

/// `Exception: <reason>`, with the reason cut to 100 characters and `...`
/// appended when cut.
pub fn exception_message(reason: &str) -> String {
    match reason.char_indices().nth(MAX_REASON_CHARS) {
        Some((idx, _)) => format!("Exception: {}...", &reason[..idx]),
        None => format!("Exception: {}", reason),
    }
}

/// Drives one document at a time through the pipeline
pub struct Router {
    config: RouterConfig,
    detector: FileTypeDetector,
    extractor: Arc<dyn ContentExtractor>,
    classifier: Arc<dyn Classifier>,
    dispatcher: Dispatcher,
    exceptions: ExceptionFolder,
}

impl Router {
    pub fn new(
        config: RouterConfig,
        extractor: Arc<dyn ContentExtractor>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        let dispatcher = Dispatcher::new(config.clone());
        let exceptions = ExceptionFolder::new(config.exception_dir.clone());
        Self {
            config,
            detector: FileTypeDetector::new(),
            extractor,
            classifier,
            dispatcher,
            exceptions,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Route the file at `path`, originally named `filename`.
    ///
    /// Never fails: every error becomes an exception outcome.
    pub async fn route(&self, path: &Path, filename: &str) -> RouteOutcome {
        match self.process(path, filename).await {
            Ok(record) => {
                tracing::info!(
                    "[Router] SUCCESS: {} -> {}. Confidence: {}",
                    filename,
                    record.category,
                    record.confidence_percent()
                );
                RouteOutcome::routed(filename, record)
            }
            Err(reason) => self.divert(path, filename, reason),
        }
    }

    async fn process(
        &self,
        path: &Path,
        filename: &str,
    ) -> Result<ClassificationResult, FailureReason> {
        let mime = self.detector.detect(path);
        tracing::debug!("[Router] {} detected as {}", filename, mime);

        let content = self.extractor.extract(path, mime)?;
        if content.is_empty() {
            return Err(FailureReason::NoContent);
        }

        let result = tokio::time::timeout(
            self.config.classifier_timeout,
            self.classifier.classify(&content),
        )
        .await
        .map_err(|_| ClassifierError::Timeout(self.config.classifier_timeout))??;

        if result.confidence < self.config.confidence_threshold {
            return Err(FailureReason::LowConfidence {
                confidence: result.confidence,
            });
        }

        Ok(self.dispatcher.dispatch(path, filename, result)?)
    }

    /// Park the untouched file in the exception folder
    fn divert(&self, path: &Path, filename: &str, reason: FailureReason) -> RouteOutcome {
        let reason_text = reason.to_string();
        tracing::warn!("[Router] EXCEPTION: {}. Reason: {}", filename, reason_text);

        let message = exception_message(&reason_text);
        match self.exceptions.quarantine(path, filename) {
            Ok(location) => RouteOutcome::exception(filename, message, Some(location)),
            Err(e) => {
                tracing::error!(
                    "[Router] Could not move {} to exceptions: {}",
                    filename,
                    e
                );
                RouteOutcome::exception(
                    filename,
                    format!("{} (exception move failed: {})", message, e),
                    None,
                )
            }
        }
    }
}
