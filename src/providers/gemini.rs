//! Gemini Provider implementation
//!
//! `generateContent` client for Google Generative AI models

use super::{build_client, estimate_tokens, read_json, Capabilities, Completion, GenerateRequest, Provider, ProviderKind};
use crate::config::ProviderConfig;
use crate::models::gemini::*;
use crate::models::Role;
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

/// Gemini image size limit
pub const MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;

/// Gemini Provider
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl GeminiProvider {
    /// Create a provider from configuration; fails when no key is configured
    pub fn new(config: &ProviderConfig, timeout_secs: u64) -> AppResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::ClientNotInitialized(ProviderKind::Gemini.display_name().to_string()))?;
        
        info!(
            "Gemini client initialized (model: {}, key from {})",
            config.model,
            config.key_source.as_deref().unwrap_or("unknown")
        );
        
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
    
    /// Build the request URL; the key travels in a header, never in the URL
    fn build_url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
    
    /// Convert the generic request into the generateContent shape
    fn build_request(&self, request: &GenerateRequest) -> GeminiRequest {
        let last = request.turns.len().saturating_sub(1);
        let contents = request
            .turns
            .iter()
            .enumerate()
            .map(|(i, turn)| {
                let mut parts = vec![GeminiPart::Text { text: turn.content.clone() }];
                if let (Some(image), true) = (&request.image, i == last) {
                    parts.push(GeminiPart::InlineData {
                        inline_data: GeminiInlineData {
                            mime_type: image.media_type.clone(),
                            data: image.data.clone(),
                        },
                    });
                }
                GeminiContent {
                    role: Some(match turn.role {
                        Role::User => "user".to_string(),
                        Role::Assistant => "model".to_string(),
                    }),
                    parts,
                }
            })
            .collect();
        
        GeminiRequest {
            contents,
            system_instruction: request.system.as_ref().map(|system| GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text { text: system.clone() }],
            }),
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: Some(request.max_tokens.unwrap_or(self.max_tokens)),
                temperature: None,
            }),
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
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
        debug!("Sending Gemini request (model: {})", self.model);
        
        let response = self.client
            .post(self.build_url())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;
        
        let gemini_response: GeminiResponse = read_json(response, "Gemini", |text| {
            serde_json::from_str::<GeminiErrorResponse>(text).ok().map(|e| {
                match e.error.status {
                    Some(status) => format!("{} ({})", e.error.message, status),
                    None => e.error.message,
                }
            })
        })
        .await?;
        
        let text = gemini_response.text();
        let (input_tokens, output_tokens, estimated) = match &gemini_response.usage_metadata {
            Some(usage) if usage.prompt_token_count > 0 || usage.candidates_token_count > 0 => (
                usage.prompt_token_count as u64,
                usage.candidates_token_count as u64,
                false,
            ),
            _ => (estimate_tokens(request.last_prompt()), estimate_tokens(&text), true),
        };
        
        debug!("Gemini request completed successfully");
        Ok(Completion {
            text,
            model: gemini_response.model_version.unwrap_or_else(|| self.model.clone()),
            input_tokens,
            output_tokens,
            estimated,
        })
    }
}
