//! Claude API data models
//! 
//! Defines the Anthropic Messages API request and response structures

use serde::{Deserialize, Serialize};

/// Claude API request structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeRequest {
    /// Model name
    pub model: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Message list
    pub messages: Vec<ClaudeMessage>,
    /// System prompt (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Temperature parameter (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Claude message structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeMessage {
    /// Role (user/assistant)
    pub role: String,
    /// Message content
    pub content: ClaudeContent,
}

/// Claude content type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaudeContent {
    /// Plain text content
    Text(String),
    /// Structured content blocks
    Blocks(Vec<ClaudeContentBlock>),
}

/// Claude content block
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClaudeContentBlock {
    /// Text block
    #[serde(rename = "text")]
    Text { text: String },
    /// Image block
    #[serde(rename = "image")]
    Image {
        source: ClaudeImageSource,
    },
    /// Any block type this client does not render (tool use, thinking...)
    #[serde(other)]
    Unsupported,
}

/// Claude image source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeImageSource {
    /// Source type (base64)
    #[serde(rename = "type")]
    pub source_type: String,
    /// Media type
    pub media_type: String,
    /// Image data
    pub data: String,
}

/// Claude API response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeResponse {
    /// Response ID
    pub id: String,
    /// Response content
    pub content: Vec<ClaudeContentBlock>,
    /// Model used
    pub model: String,
    /// Stop reason
    pub stop_reason: Option<String>,
    /// Usage statistics
    pub usage: ClaudeUsage,
}

impl ClaudeResponse {
    /// Concatenated text of all text blocks
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ClaudeContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Claude usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeUsage {
    /// Input token count
    pub input_tokens: u32,
    /// Output token count
    pub output_tokens: u32,
}

/// Claude error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeErrorResponse {
    /// Error type
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error details
    pub error: ClaudeError,
}

/// Claude error details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeError {
    /// Error type
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    
    #[test]
    fn test_claude_request_serialization() {
        let request = ClaudeRequest {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1000,
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: ClaudeContent::Blocks(vec![
                    ClaudeContentBlock::Image {
                        source: ClaudeImageSource {
                            source_type: "base64".to_string(),
                            media_type: "image/png".to_string(),
                            data: "aGk=".to_string(),
                        },
                    },
                    ClaudeContentBlock::Text { text: "Describe this".to_string() },
                ]),
            }],
            system: None,
            temperature: None,
        };
        
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["content"][0]["type"], "image");
        assert_eq!(json["messages"][0]["content"][0]["source"]["type"], "base64");
        assert_eq!(json["messages"][0]["content"][1]["type"], "text");
        assert!(json.get("system").is_none());
    }
    
    #[test]
    fn test_claude_response_text() {
        let response: ClaudeResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Hello"},
                {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                {"type": "text", "text": " world"}
            ],
            "model": "claude-sonnet-4-20250514",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 3}
        })).unwrap();
        
        assert_eq!(response.text(), "Hello world");
        assert_eq!(response.usage.input_tokens, 12);
    }
}
