//! Anthropic Provider implementation
//!
//! Messages API client for Claude models

use super::{build_client, read_json, Capabilities, Completion, GenerateRequest, Provider, ProviderKind};
use crate::config::ProviderConfig;
use crate::models::claude::*;
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

/// Messages API version header value
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude image size limit
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Anthropic Provider
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    vision_model: Option<String>,
    max_tokens: u32,
}

impl AnthropicProvider {
    /// Create a provider from configuration; fails when no key is configured
    pub fn new(config: &ProviderConfig, timeout_secs: u64) -> AppResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::ClientNotInitialized(ProviderKind::Claude.display_name().to_string()))?;
        
        info!(
            "Claude client initialized (model: {}, key from {})",
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
        format!("{}/v1/messages", self.base_url)
    }
    
    /// Convert the generic request into the Messages API shape
    fn build_request(&self, request: &GenerateRequest) -> ClaudeRequest {
        let model = match (&request.image, &self.vision_model) {
            (Some(_), Some(vision)) => vision.clone(),
            _ => self.model.clone(),
        };
        
        let last = request.turns.len().saturating_sub(1);
        let messages = request
            .turns
            .iter()
            .enumerate()
            .map(|(i, turn)| {
                let content = match (&request.image, i == last) {
                    (Some(image), true) => ClaudeContent::Blocks(vec![
                        ClaudeContentBlock::Image {
                            source: ClaudeImageSource {
                                source_type: "base64".to_string(),
                                media_type: image.media_type.clone(),
                                data: image.data.clone(),
                            },
                        },
                        ClaudeContentBlock::Text { text: turn.content.clone() },
                    ]),
                    _ => ClaudeContent::Text(turn.content.clone()),
                };
                ClaudeMessage {
                    role: turn.role.as_str().to_string(),
                    content,
                }
            })
            .collect();
        
        ClaudeRequest {
            model,
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            messages,
            system: request.system.clone(),
            temperature: None,
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
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
        debug!("Sending Claude request (model: {}, turns: {})", body.model, body.messages.len());
        
        let response = self.client
            .post(self.build_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;
        
        let claude_response: ClaudeResponse = read_json(response, "Claude", |text| {
            serde_json::from_str::<ClaudeErrorResponse>(text)
                .ok()
                .map(|e| e.error.message)
        })
        .await?;
        
        debug!("Claude request completed successfully");
        Ok(Completion {
            text: claude_response.text(),
            model: claude_response.model.clone(),
            input_tokens: claude_response.usage.input_tokens as u64,
            output_tokens: claude_response.usage.output_tokens as u64,
            estimated: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatTurn;
    use crate::providers::ImageAttachment;
    use std::path::PathBuf;
    
    fn create_test_config(api_key: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            api_key: api_key.map(String::from),
            key_source: Some("ANTHROPIC_API_KEY".to_string()),
            base_url: "https://api.anthropic.com/".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            vision_model: Some("claude-3-5-haiku-20241022".to_string()),
            max_tokens: 8192,
        }
    }
    
    #[test]
    fn test_missing_key() {
        let result = AnthropicProvider::new(&create_test_config(None), 30);
        assert!(matches!(result, Err(AppError::ClientNotInitialized(_))));
    }
    
    #[test]
    fn test_build_request_with_image() {
        let provider = AnthropicProvider::new(&create_test_config(Some("sk-ant-test")), 30).unwrap();
        assert_eq!(provider.build_url(), "https://api.anthropic.com/v1/messages");
        
        let request = GenerateRequest {
            turns: vec![
                ChatTurn::user("first"),
                ChatTurn::assistant("reply"),
                ChatTurn::user("what is in this picture?"),
            ],
            system: Some("be concise".to_string()),
            image: Some(ImageAttachment {
                path: PathBuf::from("x.png"),
                media_type: "image/png".to_string(),
                size: 2,
                data: "aGk=".to_string(),
            }),
            max_tokens: Some(1000),
        };
        
        let body = provider.build_request(&request);
        assert_eq!(body.model, "claude-3-5-haiku-20241022");
        assert_eq!(body.max_tokens, 1000);
        assert!(matches!(body.messages[0].content, ClaudeContent::Text(_)));
        match &body.messages[2].content {
            ClaudeContent::Blocks(blocks) => {
                assert!(matches!(blocks[0], ClaudeContentBlock::Image { .. }));
                assert!(matches!(blocks[1], ClaudeContentBlock::Text { .. }));
            }
            other => panic!("expected blocks, got {:?}", other),
        }
    }
    
    #[test]
    fn test_text_request_uses_default_model() {
        let provider = AnthropicProvider::new(&create_test_config(Some("sk-ant-test")), 30).unwrap();
        let body = provider.build_request(&GenerateRequest::prompt("hello"));
        assert_eq!(body.model, "claude-sonnet-4-20250514");
        assert_eq!(body.max_tokens, 8192);
    }
}
