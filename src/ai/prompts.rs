//! Classification prompt and response schema

use super::utils::truncate_chars;
use crate::extract::ExtractedContent;
use serde_json::{json, Value};

/// Extracted text sent to the model is capped to respect its context bound.
/// Anything past this is deliberately dropped.
pub const MAX_PROMPT_CHARS: usize = 2000;

pub const SYSTEM_PROMPT: &str = "You are an expert document classifier. Classify the input into \
one of three categories: Memberdoc, Loans, or Statements. Extract structured data including a \
confidence score into the JSON schema.";

/// User message text for one document
pub fn user_prompt(content: &ExtractedContent) -> String {
    format!(
        "Classify this document based on its content and extracted text: {}.",
        truncate_chars(&content.text, MAX_PROMPT_CHARS)
    )
}

/// Strict JSON schema the model output must follow
pub fn response_schema() -> Value {
    json!({
        "name": "document_classification",
        "strict": true,
        "schema": {
            "type": "object",
            "additionalProperties": false,
            "required": [
                "category_name",
                "confidence_score",
                "member_name",
                "member_number",
                "doc_date",
                "loan_type"
            ],
            "properties": {
                "category_name": {
                    "type": "string",
                    "enum": ["Memberdoc", "Loans", "Statements"],
                    "description": "The suggested category name (Memberdoc, Loans, or Statements)."
                },
                "confidence_score": {
                    "type": "number",
                    "description": "Confidence level for the suggested category (0.0 to 1.0)."
                },
                "member_name": {
                    "type": "string",
                    "description": "The name of the member."
                },
                "member_number": {
                    "type": "string",
                    "description": "The member's account number."
                },
                "doc_date": {
                    "type": ["string", "null"],
                    "description": "The date of the document, statement, or loan."
                },
                "loan_type": {
                    "type": ["string", "null"],
                    "description": "The type of loan, if applicable."
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_prompt_truncates_text() {
        let content = ExtractedContent::text_only("q".repeat(5000));
        let prompt = user_prompt(&content);
        let qs = prompt.chars().filter(|c| *c == 'q').count();
        assert_eq!(qs, MAX_PROMPT_CHARS);
    }

    #[test]
    fn test_schema_restricts_categories() {
        let schema = response_schema();
        let categories = &schema["schema"]["properties"]["category_name"]["enum"];
        assert_eq!(categories.as_array().unwrap().len(), 3);
    }
}
