//! OpenAI API data models
//! 
//! Defines the Chat Completions request and response structures

use serde::{Deserialize, Serialize};

/// OpenAI API request structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIRequest {
    /// Model name
    pub model: String,
    /// Message list
    pub messages: Vec<OpenAIMessage>,
    /// Maximum tokens to generate (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Temperature parameter (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// OpenAI message structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIMessage {
    /// Role (system/user/assistant)
    pub role: String,
    /// Message content
    pub content: Option<OpenAIContent>,
}

/// OpenAI message content (can be string or content array)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpenAIContent {
    /// Simple text content
    Text(String),
    /// Content array (supports multimodal)
    Array(Vec<OpenAIContentPart>),
}

/// OpenAI content part
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OpenAIContentPart {
    /// Text part
    #[serde(rename = "text")]
    Text { text: String },
    /// Image URL part
    #[serde(rename = "image_url")]
    ImageUrl { image_url: OpenAIImageUrl },
}

/// OpenAI image URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIImageUrl {
    /// Image URL (may be a `data:` URL)
    pub url: String,
    /// Detail level (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// OpenAI API response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIResponse {
    /// Response ID
    pub id: String,
    /// Model used
    pub model: String,
    /// Choice list
    pub choices: Vec<OpenAIChoice>,
    /// Usage statistics
    pub usage: Option<OpenAIUsage>,
}

impl OpenAIResponse {
    /// Text of the first choice
    pub fn text(&self) -> String {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_ref())
            .map(|content| match content {
                OpenAIContent::Text(text) => text.clone(),
                OpenAIContent::Array(parts) => parts
                    .iter()
                    .filter_map(|part| match part {
                        OpenAIContentPart::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join(""),
            })
            .unwrap_or_default()
    }
}

/// OpenAI choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIChoice {
    /// Choice index
    pub index: u32,
    /// Message
    pub message: OpenAIMessage,
    /// Finish reason
    pub finish_reason: Option<String>,
}

/// OpenAI usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIUsage {
    /// Prompt token count
    pub prompt_tokens: u32,
    /// Completion token count
    pub completion_tokens: u32,
    /// Total token count
    pub total_tokens: u32,
}

/// OpenAI error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIErrorResponse {
    /// Error details
    pub error: OpenAIError,
}

/// OpenAI error details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIError {
    /// Error message
    pub message: String,
    /// Error type
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    /// Error code
    pub code: Option<String>,
}
