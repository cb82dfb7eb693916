//! Shared document types
//!
//! The classification record persisted in the per-category index and the
//! closed set of categories a document can be routed to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Business category a document is filed under.
///
/// Serialized names double as the output folder names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Memberdoc,
    Loans,
    Statements,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Memberdoc, Category::Loans, Category::Statements];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memberdoc => "Memberdoc",
            Self::Loans => "Loans",
            Self::Statements => "Statements",
        }
    }

    /// Exact match against the serialized names, as required of model output.
    pub fn from_exact(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Lenient parse for operator input (case-insensitive, trimmed).
impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                format!(
                    "Unknown category '{}' (expected one of: Memberdoc, Loans, Statements)",
                    s
                )
            })
    }
}

/// Structured outcome of classifying one document.
///
/// One line of a category index is exactly this record serialized with the
/// persisted field names. `final_location` stays `None` until the terminal
/// routing step has moved the file; after the index append the record is
/// never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    #[serde(rename = "category_name")]
    pub category: Category,

    /// Model certainty in [0.0, 1.0]; manual approvals are always 1.0
    #[serde(rename = "confidence_score")]
    pub confidence: f64,

    #[serde(default)]
    pub member_name: String,

    #[serde(default)]
    pub member_number: String,

    #[serde(rename = "doc_date", default)]
    pub document_date: Option<String>,

    /// Only meaningful for `Category::Loans`
    #[serde(default)]
    pub loan_type: Option<String>,

    #[serde(rename = "file_loc", default)]
    pub final_location: Option<PathBuf>,
}

impl ClassificationResult {
    pub fn new(category: Category, confidence: f64) -> Self {
        Self {
            category,
            confidence,
            member_name: String::new(),
            member_number: String::new(),
            document_date: None,
            loan_type: None,
            final_location: None,
        }
    }

    /// Confidence as a percentage with one decimal, e.g. "92.0%"
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }

    pub(crate) fn with_final_location(mut self, location: PathBuf) -> Self {
        self.final_location = Some(location);
        self
    }
}

/// Treat blank operator or model strings as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
