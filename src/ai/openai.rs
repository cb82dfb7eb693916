//! OpenAI Classifier
//!
//! Multimodal chat-completions client. Sends the truncated document text and,
//! when present, the image payload as a data URL, and requests output under a
//! strict JSON schema. The reply is still validated locally.

use super::classifier::{validate_classification, Classifier, ClassifierError};
use super::prompts::{response_schema, user_prompt, SYSTEM_PROMPT};
use crate::config::ClassifierConfig;
use crate::extract::ExtractedContent;
use crate::models::ClassificationResult;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classifier backed by an OpenAI-compatible endpoint
pub struct OpenAiClassifier {
    client: Client,
    config: ClassifierConfig,
}

impl OpenAiClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                ClassifierError::Transport(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    fn build_request(&self, content: &ExtractedContent) -> ChatRequest {
        let mut parts = vec![ContentPart::Text {
            text: user_prompt(content),
        }];
        if let Some(image) = &content.image {
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrlContent {
                    url: image.data_url(),
                },
            });
        }

        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: vec![ContentPart::Text {
                        text: SYSTEM_PROMPT.to_string(),
                    }],
                },
                ChatMessage {
                    role: "user",
                    content: parts,
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: response_schema(),
            },
        }
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(
        &self,
        content: &ExtractedContent,
    ) -> Result<ClassificationResult, ClassifierError> {
        let request = self.build_request(content);

        tracing::debug!(
            "[OpenAI] Sending classification request to model {} (image: {})",
            self.config.model,
            content.image.is_some()
        );

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("[OpenAI] API error: {} - {}", status, body);
            return Err(ClassifierError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Transport(format!("Failed to parse response: {}", e)))?;

        let reply = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ClassifierError::EmptyResponse)?;

        validate_classification(&reply)
    }
}

// API request/response types

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrlContent },
}

#[derive(Serialize)]
struct ImageUrlContent {
    url: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
