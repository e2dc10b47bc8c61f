//! Error handling module
//! 
//! Defines the error type shared by providers, services and front-ends

use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
    
    /// HTTP transport error, always stripped of its request URL
    #[error("HTTP client error: {0}")]
    HttpClient(reqwest::Error),
    
    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    
    /// Provider client was never constructed (usually a missing credential)
    #[error("{0} client not initialized")]
    ClientNotInitialized(String),
    
    /// Provider name did not match any known alias
    #[error("Unknown agent: {0}. Use 'claude', 'chatgpt', or 'gemini'.")]
    UnknownAgent(String),
    
    /// Request validation failed
    #[error("Request validation failed: {0}")]
    Validation(String),
    
    /// External API answered with a non-success status
    #[error("External API error ({status}): {message}")]
    ExternalApi { status: u16, message: String },
    
    /// A provider call came back error-tagged
    #[error("{provider} call failed: {message}")]
    ProviderFailed { provider: String, message: String },
    
    /// Provider quota exhausted
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),
    
    /// Request timeout
    #[error("Request timeout")]
    Timeout,
    
    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),
    
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    /// Request URLs can carry credentials, so they never reach the message
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AppError::Timeout
        } else {
            AppError::HttpClient(e.without_url())
        }
    }
}

impl AppError {
    /// Classify a non-success API answer
    pub fn from_status(status: u16, message: String) -> Self {
        if status == 429 || is_quota_message(&message) {
            AppError::QuotaExceeded(message)
        } else {
            AppError::ExternalApi { status, message }
        }
    }
    
    /// Stable snake_case code for the well-known error classes
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::HttpClient(_) => "transport_error",
            AppError::Serialization(_) => "invalid_response",
            AppError::Io(_) => "io_error",
            AppError::ClientNotInitialized(_) => "client_not_initialized",
            AppError::UnknownAgent(_) => "unknown_agent",
            AppError::Validation(_) => "invalid_request",
            AppError::ExternalApi { .. } if self.is_quota_exhausted() => "quota_exceeded",
            AppError::ExternalApi { .. } => "api_error",
            AppError::ProviderFailed { .. } => "provider_error",
            AppError::QuotaExceeded(_) => "quota_exceeded",
            AppError::Timeout => "timeout",
            AppError::NotFound(_) => "not_found",
            AppError::Internal(_) => "internal_error",
        }
    }
    
    /// Tag attached to an error-carrying provider result.
    ///
    /// Initialization, alias and quota failures get their fixed code; any
    /// other failure is tagged with the provider's own message.
    pub fn result_tag(&self) -> String {
        match self {
            AppError::ClientNotInitialized(_)
            | AppError::UnknownAgent(_)
            | AppError::QuotaExceeded(_) => self.error_code().to_string(),
            _ if self.is_quota_exhausted() => "quota_exceeded".to_string(),
            _ => self.to_string(),
        }
    }
    
    /// Whether the error signals an exhausted provider quota.
    ///
    /// Only an API answer can say so; transport failures never do.
    pub fn is_quota_exhausted(&self) -> bool {
        match self {
            AppError::QuotaExceeded(_) => true,
            AppError::ExternalApi { status, message } => *status == 429 || is_quota_message(message),
            _ => false,
        }
    }
    
    /// Whether the error is worth logging at error level
    pub fn should_log_details(&self) -> bool {
        !matches!(
            self,
            AppError::ClientNotInitialized(_) | AppError::UnknownAgent(_)
        )
    }
}

/// Quota status text reported by the providers themselves
const QUOTA_MARKERS: [&str; 4] = [
    "resource_exhausted",
    "insufficient_quota",
    "exceeded your current quota",
    "quota exceeded",
];

/// Quota detection over a provider's error message
pub fn is_quota_message(text: &str) -> bool {
    let lower = text.to_lowercase();
    QUOTA_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Error context extension trait
pub trait ErrorContext<T> {
    /// Add validation error context
    fn validation_context(self, message: &str) -> AppResult<T>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn validation_context(self, message: &str) -> AppResult<T> {
        self.map_err(|e| AppError::Validation(format!("{}: {}", message, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::ClientNotInitialized("ChatGPT".to_string()).error_code(), "client_not_initialized");
        assert_eq!(AppError::UnknownAgent("llama".to_string()).error_code(), "unknown_agent");
        assert_eq!(AppError::QuotaExceeded("daily".to_string()).error_code(), "quota_exceeded");
        assert_eq!(AppError::Timeout.error_code(), "timeout");
        assert_eq!(
            AppError::ExternalApi { status: 500, message: "boom".to_string() }.error_code(),
            "api_error"
        );
    }
    
    #[test]
    fn test_quota_detection() {
        let by_status = AppError::ExternalApi { status: 429, message: "slow down".to_string() };
        assert!(by_status.is_quota_exhausted());
        
        let by_text = AppError::ExternalApi { status: 400, message: "You exceeded your current Quota".to_string() };
        assert!(by_text.is_quota_exhausted());
        
        let by_marker = AppError::ExternalApi { status: 403, message: "RESOURCE_EXHAUSTED".to_string() };
        assert!(by_marker.is_quota_exhausted());
        
        let other = AppError::ExternalApi { status: 401, message: "invalid x-api-key".to_string() };
        assert!(!other.is_quota_exhausted());
        
        // A 429 inside the text is not a quota signal
        let index = AppError::ExternalApi { status: 400, message: "Invalid value at 'contents[429].parts'".to_string() };
        assert!(!index.is_quota_exhausted());
        assert_eq!(index.error_code(), "api_error");
    }
    
    #[test]
    fn test_from_status() {
        assert!(matches!(AppError::from_status(429, "slow down".to_string()), AppError::QuotaExceeded(_)));
        assert!(matches!(
            AppError::from_status(403, "Quota exceeded for metric".to_string()),
            AppError::QuotaExceeded(_)
        ));
        assert!(matches!(
            AppError::from_status(400, "bad key AIza429abc".to_string()),
            AppError::ExternalApi { status: 400, .. }
        ));
    }
    
    #[test]
    fn test_result_tag_uses_provider_message() {
        let err = AppError::ExternalApi { status: 401, message: "invalid x-api-key".to_string() };
        assert_eq!(err.result_tag(), "External API error (401): invalid x-api-key");
        
        let quota = AppError::ExternalApi { status: 429, message: "rate".to_string() };
        assert_eq!(quota.result_tag(), "quota_exceeded");
    }
    
    #[test]
    fn test_error_context() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found"
        ));
        
        let app_result = result.validation_context("Failed to read image");
        
        if let Err(AppError::Validation(msg)) = app_result {
            assert!(msg.contains("Failed to read image"));
            assert!(msg.contains("file not found"));
        } else {
            panic!("Expected validation error");
        }
    }
}
