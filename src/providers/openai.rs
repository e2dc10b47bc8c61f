//! OpenAI Provider implementation
//!
//! Chat Completions client for ChatGPT models

use super::{build_client, read_json, Capabilities, Completion, GenerateRequest, Provider, ProviderKind};
use crate::config::ProviderConfig;
use crate::models::openai::*;
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

/// OpenAI image size limit
pub const MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;

/// OpenAI Provider
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    vision_model: Option<String>,
    max_tokens: u32,
}

impl OpenAIProvider {
    /// Create a provider from configuration; fails when no key is configured
    pub fn new(config: &ProviderConfig, timeout_secs: u64) -> AppResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::ClientNotInitialized(ProviderKind::ChatGpt.display_name().to_string()))?;
        
        info!(
            "ChatGPT client initialized (model: {}, key from {})",
            config.model,
            config.key_source.as_deref().unwrap_or("unknown")
        );
        
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            vision_model: config.vision_model.clone(),
            max_tokens: config.max_tokens,
        })
    }
    
    /// Build the request URL
    fn build_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
    
    /// Build authorization header value
    fn get_auth_header(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
    
    /// Convert the generic request into the Chat Completions shape
    fn build_request(&self, request: &GenerateRequest) -> OpenAIRequest {
        let model = match (&request.image, &self.vision_model) {
            (Some(_), Some(vision)) => vision.clone(),
            _ => self.model.clone(),
        };
        
        let mut messages = Vec::with_capacity(request.turns.len() + 1);
        if let Some(system) = &request.system {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: Some(OpenAIContent::Text(system.clone())),
            });
        }
        
        let last = request.turns.len().saturating_sub(1);
        for (i, turn) in request.turns.iter().enumerate() {
            let content = match (&request.image, i == last) {
                (Some(image), true) => OpenAIContent::Array(vec![
                    OpenAIContentPart::Text { text: turn.content.clone() },
                    OpenAIContentPart::ImageUrl {
                        image_url: OpenAIImageUrl {
                            url: image.data_url(),
                            detail: None,
                        },
                    },
                ]),
                _ => OpenAIContent::Text(turn.content.clone()),
            };
            messages.push(OpenAIMessage {
                role: turn.role.as_str().to_string(),
                content: Some(content),
            });
        }
        
        OpenAIRequest {
            model,
            messages,
            max_tokens: Some(request.max_tokens.unwrap_or(self.max_tokens)),
            temperature: None,
        }
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ChatGpt
    }
    
    fn model(&self) -> &str {
        &self.model
    }
    
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_vision: true,
            max_image_bytes: MAX_IMAGE_BYTES,
        }
    }
    
    async fn generate(&self, request: &GenerateRequest) -> AppResult<Completion> {
        let body = self.build_request(request);
        debug!("Sending OpenAI chat completion request (model: {})", body.model);
        
        let response = self.client
            .post(self.build_url())
            .header("Authorization", self.get_auth_header())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;
        
        let openai_response: OpenAIResponse = read_json(response, "OpenAI", |text| {
            serde_json::from_str::<OpenAIErrorResponse>(text)
                .ok()
                .map(|e| e.error.message)
        })
        .await?;
        
        debug!("OpenAI request completed successfully");
        let text = openai_response.text();
        let (input_tokens, output_tokens, estimated) = match &openai_response.usage {
            Some(usage) => (usage.prompt_tokens as u64, usage.completion_tokens as u64, false),
            None => (
                super::estimate_tokens(request.last_prompt()),
                super::estimate_tokens(&text),
                true,
            ),
        };
        
        Ok(Completion {
            text,
            model: openai_response.model,
            input_tokens,
            output_tokens,
            estimated,
        })
    }
}
