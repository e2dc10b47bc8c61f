//! Provider module
//!
//! Defines the Provider trait and one implementation per supported
//! language-model API

pub mod anthropic;
pub mod gemini;
pub mod image;
pub mod openai;

use crate::models::ChatTurn;
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::error;

pub use crate::models::ProviderKind;
pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use image::ImageAttachment;
pub use openai::OpenAIProvider;

/// Static capability flags of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Accepts image input
    pub supports_vision: bool,
    /// Largest accepted image, in bytes
    pub max_image_bytes: u64,
}

/// A single generation request
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    /// Conversation so far, ending with the user turn to answer
    pub turns: Vec<ChatTurn>,
    /// System prompt (optional)
    pub system: Option<String>,
    /// Image attached to the last user turn (optional)
    pub image: Option<ImageAttachment>,
    /// Override of the configured max tokens (optional)
    pub max_tokens: Option<u32>,
}

impl GenerateRequest {
    /// Single-turn request
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            turns: vec![ChatTurn::user(text)],
            ..Default::default()
        }
    }
    
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
    
    pub fn with_image(mut self, image: Option<ImageAttachment>) -> Self {
        self.image = image;
        self
    }
    
    /// Text of the last user turn
    pub fn last_prompt(&self) -> &str {
        self.turns.last().map(|t| t.content.as_str()).unwrap_or("")
    }
}

/// Provider-native completion mapped to plain values
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Counts were estimated from word counts
    pub estimated: bool,
}

/// Provider trait for upstream language-model APIs
///
/// All providers map their native response into a [`Completion`]; failures
/// are returned as [`AppError`] and normalized by the dispatcher.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Which provider this is
    fn kind(&self) -> ProviderKind;
    
    /// Default model identifier
    fn model(&self) -> &str;
    
    /// Capability flags
    fn capabilities(&self) -> Capabilities;
    
    /// Send a generation request
    async fn generate(&self, request: &GenerateRequest) -> AppResult<Completion>;
}

/// Word-count token estimate used when a provider reports no usage
pub fn estimate_tokens(text: &str) -> u64 {
    (text.split_whitespace().count() as f64 * 1.3).floor() as u64
}

/// Build the shared HTTP client for a provider
pub(crate) fn build_client(timeout_secs: u64) -> AppResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("agencyops/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(AppError::from)
}

/// Decode a success body, or classify the error body with [`AppError::from_status`]
///
/// `extract` pulls the provider's message out of its JSON error envelope.
pub(crate) async fn read_json<T, F>(response: Response, label: &str, extract: F) -> AppResult<T>
where
    T: DeserializeOwned,
    F: Fn(&str) -> Option<String>,
{
    let status = response.status();
    
    if status.is_success() {
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    } else {
        let error_text = response.text().await.unwrap_or_default();
        let message = extract(&error_text).unwrap_or_else(|| {
            if error_text.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                error_text.clone()
            }
        });
        
        error!("{} API request failed: {} - {}", label, status, message);
        Err(AppError::from_status(status.as_u16(), message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("hello"), 1);
        assert_eq!(estimate_tokens("one two three four five six seven eight nine ten"), 13);
    }
    
    #[test]
    fn test_request_builder() {
        let request = GenerateRequest::prompt("hi").with_system("be brief");
        assert_eq!(request.last_prompt(), "hi");
        assert_eq!(request.system.as_deref(), Some("be brief"));
        assert!(request.image.is_none());
    }
}
