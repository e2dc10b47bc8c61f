//! Gemini API data models
//!
//! `generateContent` request and response structures

use serde::{Deserialize, Serialize};

/// generateContent request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
}

/// A role-tagged list of parts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    /// "user" or "model"; omitted for system instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// Content part: text or inline binary data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeminiPart {
    Text { text: String },
    InlineData { inline_data: GeminiInlineData },
}

/// Base64 payload with its MIME type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiInlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// generateContent response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    pub usage_metadata: Option<GeminiUsage>,
    pub model_version: Option<String>,
}

impl GeminiResponse {
    /// Text parts of the first candidate, concatenated
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| match part {
                        GeminiPart::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
    pub finish_reason: Option<String>,
}

/// Token counts; the API omits them for some models and responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiUsage {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
    #[serde(default)]
    pub total_token_count: u32,
}

/// Error envelope: `{"error": {"code", "message", "status"}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiErrorResponse {
    pub error: GeminiError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiError {
    pub code: Option<u16>,
    pub message: String,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    
    #[test]
    fn test_request_shape() {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![
                    GeminiPart::Text { text: "hello".to_string() },
                    GeminiPart::InlineData {
                        inline_data: GeminiInlineData {
                            mime_type: "image/png".to_string(),
                            data: "aGk=".to_string(),
                        },
                    },
                ],
            }],
            system_instruction: None,
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: Some(100),
                temperature: None,
            }),
        };
        
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["contents"][0]["parts"][1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 100);
    }
    
    #[test]
    fn test_response_without_usage() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hi"}, {"text": "!"}]},
                "finishReason": "STOP"
            }]
        })).unwrap();
        
        assert_eq!(response.text(), "Hi!");
        assert!(response.usage_metadata.is_none());
    }
}
