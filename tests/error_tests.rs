//! Error classification tests

use agencyops::utils::error::{is_quota_message, ErrorContext};
use agencyops::AppError;

#[test]
fn test_conversions_keep_their_class() {
    let io: AppError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
    assert_eq!(io.error_code(), "io_error");
    
    let json: AppError = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err().into();
    assert_eq!(json.error_code(), "invalid_response");
    
    let invalid = "x".parse::<u32>().validation_context("Invalid image size");
    assert!(matches!(invalid, Err(AppError::Validation(ref m)) if m.starts_with("Invalid image size")));
}

#[test]
fn test_quota_markers() {
    assert!(is_quota_message("status: RESOURCE_EXHAUSTED"));
    assert!(is_quota_message("You exceeded your current QUOTA"));
    assert!(is_quota_message("insufficient_quota"));
    assert!(!is_quota_message("invalid api key"));
    assert!(!is_quota_message("HTTP 429 Too Many Requests"));
    assert!(!is_quota_message("Invalid value at 'contents[429].parts'"));
    
    assert!(AppError::QuotaExceeded("daily limit".to_string()).is_quota_exhausted());
    assert!(!AppError::Timeout.is_quota_exhausted());
}

#[test]
fn test_status_classification() {
    assert_eq!(AppError::from_status(429, "Too Many Requests".to_string()).error_code(), "quota_exceeded");
    assert_eq!(AppError::from_status(400, "quota exceeded for project".to_string()).error_code(), "quota_exceeded");
    
    let bad_request = AppError::from_status(400, "Invalid value at 'contents[429].parts'".to_string());
    assert_eq!(bad_request.error_code(), "api_error");
    assert!(!bad_request.is_quota_exhausted());
    
    let server = AppError::from_status(503, "overloaded".to_string());
    assert!(matches!(server, AppError::ExternalApi { status: 503, .. }));
}

#[test]
fn test_result_tags() {
    assert_eq!(AppError::ClientNotInitialized("Gemini".to_string()).result_tag(), "client_not_initialized");
    assert_eq!(AppError::UnknownAgent("llama".to_string()).result_tag(), "unknown_agent");
    
    let quota_text = AppError::ExternalApi { status: 400, message: "RESOURCE_EXHAUSTED".to_string() };
    assert_eq!(quota_text.error_code(), "quota_exceeded");
    assert_eq!(quota_text.result_tag(), "quota_exceeded");
    
    let provider = AppError::ProviderFailed { provider: "Claude".to_string(), message: "overloaded".to_string() };
    assert_eq!(provider.result_tag(), "Claude call failed: overloaded");
}

#[test]
fn test_log_levels() {
    assert!(!AppError::ClientNotInitialized("Claude".to_string()).should_log_details());
    assert!(!AppError::UnknownAgent("x".to_string()).should_log_details());
    assert!(AppError::Internal("boom".to_string()).should_log_details());
    assert!(AppError::Timeout.should_log_details());
}
