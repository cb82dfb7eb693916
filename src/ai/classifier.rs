//! Classifier contract and output validation
//!
//! The model is treated as unreliable: whatever it returns passes through
//! `validate_classification` before it becomes a `ClassificationResult`.

use super::utils::extract_json_object;
use crate::extract::ExtractedContent;
use crate::models::{non_blank, Category, ClassificationResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classifier request failed: {0}")]
    Transport(String),

    #[error("Classifier API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Classifier returned an empty response")]
    EmptyResponse,

    #[error("Classifier response violates schema: {0}")]
    Schema(String),

    #[error("Classifier timed out after {0:?}")]
    Timeout(Duration),
}

/// External classification capability.
///
/// One call per document; implementations must not retry.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        content: &ExtractedContent,
    ) -> Result<ClassificationResult, ClassifierError>;
}

/// Raw shape accepted from the model before validation
#[derive(Debug, Deserialize)]
struct RawClassification {
    category_name: String,
    confidence_score: f64,
    #[serde(default)]
    member_name: Option<String>,
    #[serde(default)]
    member_number: Option<String>,
    #[serde(default)]
    doc_date: Option<String>,
    #[serde(default)]
    loan_type: Option<String>,
}

/// Validate a model reply into a `ClassificationResult`.
///
/// Category must be one of the three exact names and confidence a finite
/// number in [0, 1]. Missing member fields become empty strings, blank
/// optional fields become `None`, and no file location is ever accepted
/// from the model.
pub fn validate_classification(reply: &str) -> Result<ClassificationResult, ClassifierError> {
    let json = extract_json_object(reply)
        .ok_or_else(|| ClassifierError::Schema("no JSON object in response".to_string()))?;

    let raw: RawClassification =
        serde_json::from_str(json).map_err(|e| ClassifierError::Schema(e.to_string()))?;

    let category = Category::from_exact(raw.category_name.trim()).ok_or_else(|| {
        ClassifierError::Schema(format!("unknown category '{}'", raw.category_name))
    })?;

    if !raw.confidence_score.is_finite() || !(0.0..=1.0).contains(&raw.confidence_score) {
        return Err(ClassifierError::Schema(format!(
            "confidence_score {} outside [0, 1]",
            raw.confidence_score
        )));
    }

    let member_number = raw.member_number.unwrap_or_default().trim().to_string();
    if !is_safe_member_number(&member_number) {
        return Err(ClassifierError::Schema(format!(
            "member_number '{}' is not usable in a file name",
            member_number.escape_default()
        )));
    }

    Ok(ClassificationResult {
        category,
        confidence: raw.confidence_score,
        member_name: raw.member_name.unwrap_or_default().trim().to_string(),
        member_number,
        document_date: non_blank(raw.doc_date),
        loan_type: non_blank(raw.loan_type),
        final_location: None,
    })
}

/// Member numbers become a file name prefix: no separators, parent
/// references or control characters.
fn is_safe_member_number(value: &str) -> bool {
    !value.contains(['/', '\\'])
        && !value.contains("..")
        && !value.chars().any(char::is_control)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_reply() {
        let reply = r#"{"category_name": "Loans", "confidence_score": 0.91,
            "member_name": "Jane Doe", "member_number": " 999 ",
            "doc_date": "2024-03-15", "loan_type": "Auto"}"#;

        let result = validate_classification(reply).unwrap();
        assert_eq!(result.category, Category::Loans);
        assert_eq!(result.confidence, 0.91);
        assert_eq!(result.member_number, "999");
        assert_eq!(result.document_date.as_deref(), Some("2024-03-15"));
        assert_eq!(result.loan_type.as_deref(), Some("Auto"));
        assert_eq!(result.final_location, None);
    }

    #[test]
    fn test_missing_member_fields_coerce_to_empty() {
        let reply = r#"```json
{"category_name": "Statements", "confidence_score": 1.0, "member_name": null, "doc_date": ""}
```"#;
        let result = validate_classification(reply).unwrap();
        assert_eq!(result.member_name, "");
        assert_eq!(result.member_number, "");
        assert_eq!(result.document_date, None);
    }

    #[test]
    fn test_model_file_location_is_ignored() {
        let reply = r#"{"category_name": "Memberdoc", "confidence_score": 0.9,
            "member_name": "", "member_number": "", "file_loc": "/etc/passwd"}"#;
        let result = validate_classification(reply).unwrap();
        assert_eq!(result.final_location, None);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let reply = r#"{"category_name": "Invoices", "confidence_score": 0.95}"#;
        assert!(matches!(
            validate_classification(reply),
            Err(ClassifierError::Schema(_))
        ));

        let lowercase = r#"{"category_name": "loans", "confidence_score": 0.95}"#;
        assert!(validate_classification(lowercase).is_err());
    }

    #[test]
    fn test_confidence_out_of_range_is_rejected() {
        for score in ["1.5", "-0.1"] {
            let reply = format!(
                r#"{{"category_name": "Loans", "confidence_score": {}}}"#,
                score
            );
            assert!(matches!(
                validate_classification(&reply),
                Err(ClassifierError::Schema(_))
            ));
        }
    }

    #[test]
    fn test_path_like_member_number_is_rejected() {
        for member in ["../../..", "12/34", r"12\\34", r"12\u000a34"] {
            let reply = format!(
                r#"{{"category_name": "Loans", "confidence_score": 0.95, "member_number": "{}"}}"#,
                member
            );
            assert!(
                matches!(validate_classification(&reply), Err(ClassifierError::Schema(_))),
                "accepted member_number {}",
                member
            );
        }
    }

    #[test]
    fn test_non_json_and_wrong_types_are_rejected() {
        assert!(validate_classification("I think this is a loan.").is_err());
        assert!(validate_classification(
            r#"{"category_name": "Loans", "confidence_score": "high"}"#
        )
        .is_err());
        assert!(validate_classification(r#"{"confidence_score": 0.9}"#).is_err());
    }
}
