//! Data models module
//!
//! Wire structures for the language-model, CRM and flow APIs, plus the
//! normalized result every provider call is mapped into

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod claude;
pub mod crm;
pub mod flow;
pub mod gemini;
pub mod openai;
pub mod ops;

/// Supported language-model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Claude,
    ChatGpt,
    Gemini,
}

impl ProviderKind {
    /// Every provider, in menu order
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Claude, ProviderKind::ChatGpt, ProviderKind::Gemini];
    
    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude",
            ProviderKind::ChatGpt => "chatgpt",
            ProviderKind::Gemini => "gemini",
        }
    }
    
    /// Name shown to users
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "Claude",
            ProviderKind::ChatGpt => "ChatGPT",
            ProviderKind::Gemini => "Gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;
    
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            "chatgpt" | "openai" | "gpt" => Ok(ProviderKind::ChatGpt),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            other => Err(other.to_string()),
        }
    }
}

/// Conversation role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
    
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Normalized result of a single model invocation
///
/// Every provider maps its native response into this shape. Failures are
/// carried in `error` rather than raised.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Response text, or a readable description of the failure
    pub response: String,
    /// Error tag, absent on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Input + output tokens
    pub tokens_used: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Token counts were derived from word counts, not reported by the API
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub usage_estimated: bool,
    /// Wall-clock latency in seconds
    pub processing_time: f64,
    /// Model identifier used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Provider that produced the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,
    /// Image path echoed back when an image was analyzed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_analyzed: Option<String>,
    /// Provider whose quota error triggered this fallback response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_from: Option<ProviderKind>,
}

impl ProviderResponse {
    /// Error-tagged result with zero usage
    pub fn failure(error: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }
    
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_provider_aliases() {
        assert_eq!("Claude".parse::<ProviderKind>(), Ok(ProviderKind::Claude));
        assert_eq!("anthropic".parse::<ProviderKind>(), Ok(ProviderKind::Claude));
        assert_eq!("OpenAI".parse::<ProviderKind>(), Ok(ProviderKind::ChatGpt));
        assert_eq!(" gpt ".parse::<ProviderKind>(), Ok(ProviderKind::ChatGpt));
        assert_eq!("google".parse::<ProviderKind>(), Ok(ProviderKind::Gemini));
        assert!("llama".parse::<ProviderKind>().is_err());
    }
    
    #[test]
    fn test_failure_serialization() {
        let result = ProviderResponse::failure("client_not_initialized", "ChatGPT client not initialized");
        let json = serde_json::to_value(&result).unwrap();
        
        assert_eq!(json["error"], "client_not_initialized");
        assert_eq!(json["tokens_used"], 0);
        assert!(json.get("model").is_none());
        assert!(json.get("usage_estimated").is_none());
    }
}
