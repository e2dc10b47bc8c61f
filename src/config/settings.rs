//! Application configuration settings
//! 
//! Defines all configuration structures and loading logic. Every value comes
//! from the environment (optionally seeded from a `.env` file); credentials
//! follow a service-specific → generic precedence and have no built-in
//! fallback value.

use crate::models::ProviderKind;
use crate::utils::logging::mask_secret;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Language-model providers
    pub providers: ProvidersConfig,
    /// CRM API configuration
    pub crm: CrmConfig,
    /// Outbound rate limits
    pub rate_limits: RateLimitsConfig,
    /// Flow automation API configuration
    pub flow: FlowConfig,
    /// Output and log directories
    pub paths: PathsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// All provider configurations plus the quota fallback map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub claude: ProviderConfig,
    pub chatgpt: ProviderConfig,
    pub gemini: ProviderConfig,
    /// Provider to retry on when the key provider reports quota exhaustion
    pub quota_fallback: HashMap<ProviderKind, ProviderKind>,
    /// Request timeout in seconds
    pub timeout: u64,
}

/// Single provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key, absent when no variable supplied one
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Name of the variable the key came from
    pub key_source: Option<String>,
    /// API base URL
    pub base_url: String,
    /// Default model
    pub model: String,
    /// Model used when an image is attached
    pub vision_model: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

/// CRM (GoHighLevel) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub location_id: Option<String>,
    pub base_url: String,
    /// Value of the `Version` header
    pub api_version: String,
    /// Contacts per page
    pub page_limit: usize,
    /// Safety cap on pages fetched by one listing walk
    pub max_pages: usize,
    /// Request timeout in seconds
    pub timeout: u64,
}

/// Per-minute / per-second quota pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub calls_per_minute: u32,
    pub calls_per_second: u32,
}

/// Rate limits per external service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitsConfig {
    pub anthropic: RateLimitConfig,
    pub crm: RateLimitConfig,
}

/// Flow automation API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    /// Web UI root used for manual instructions
    pub web_url: String,
}

/// Directory layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub base_dir: PathBuf,
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (text/json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Settings {
    /// Create a new configuration instance from the process environment
    pub fn new() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();
        
        Self::from_lookup(|key| std::env::var(key).ok())
    }
    
    /// Build settings from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        
        let timeout: u64 = get_or("REQUEST_TIMEOUT", "60")
            .parse()
            .context("Invalid request timeout")?;
        
        let (claude_key, claude_source) = first_key(&get, &["PLM_ANTHROPIC_API_KEY", "ANTHROPIC_API_KEY"]);
        let (openai_key, openai_source) = first_key(&get, &["PLM_OPENAI_API_KEY", "OPENAI_API_KEY"]);
        let (gemini_key, gemini_source) = first_key(&get, &["PLM_GEMINI_API_KEY", "GEMINI_API_KEY"]);
        
        let quota_fallback = parse_fallback_map(&get_or("QUOTA_FALLBACK", "gemini=claude"))?;
        
        let base_dir = match get("AI_OPS_BASE_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("DigitalMarketing"),
        };
        let output_dir = get("AI_OPS_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| base_dir.join("AI_Generated"));
        let log_dir = get("AI_OPS_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| base_dir.join("logs"));
        
        let settings = Self {
            providers: ProvidersConfig {
                claude: ProviderConfig {
                    api_key: claude_key,
                    key_source: claude_source,
                    base_url: get_or("ANTHROPIC_BASE_URL", "https://api.anthropic.com"),
                    model: get_or("CLAUDE_MODEL", "claude-sonnet-4-20250514"),
                    vision_model: Some(get_or("CLAUDE_VISION_MODEL", "claude-3-5-haiku-20241022")),
                    max_tokens: get_or("CLAUDE_MAX_TOKENS", "8192")
                        .parse()
                        .context("Invalid CLAUDE_MAX_TOKENS")?,
                },
                chatgpt: ProviderConfig {
                    api_key: openai_key,
                    key_source: openai_source,
                    base_url: get_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
                    model: get_or("OPENAI_MODEL", "gpt-4"),
                    vision_model: get("OPENAI_VISION_MODEL"),
                    max_tokens: 4096,
                },
                gemini: ProviderConfig {
                    api_key: gemini_key,
                    key_source: gemini_source,
                    base_url: get_or("GEMINI_BASE_URL", "https://generativelanguage.googleapis.com"),
                    model: get_or("GEMINI_MODEL", "gemini-2.5-flash"),
                    vision_model: None,
                    max_tokens: 4096,
                },
                quota_fallback,
                timeout,
            },
            crm: CrmConfig {
                api_key: get("GHL_API_KEY"),
                location_id: get("GHL_LOCATION_ID"),
                base_url: get_or("GHL_BASE_URL", "https://services.leadconnectorhq.com"),
                api_version: get_or("GHL_API_VERSION", "2021-07-28"),
                page_limit: 100,
                max_pages: 50,
                timeout: 30,
            },
            rate_limits: RateLimitsConfig {
                anthropic: RateLimitConfig {
                    calls_per_minute: get_or("ANTHROPIC_CALLS_PER_MINUTE", "50")
                        .parse()
                        .context("Invalid ANTHROPIC_CALLS_PER_MINUTE")?,
                    calls_per_second: get_or("ANTHROPIC_CALLS_PER_SECOND", "1")
                        .parse()
                        .context("Invalid ANTHROPIC_CALLS_PER_SECOND")?,
                },
                crm: RateLimitConfig {
                    calls_per_minute: get_or("GHL_CALLS_PER_MINUTE", "100")
                        .parse()
                        .context("Invalid GHL_CALLS_PER_MINUTE")?,
                    calls_per_second: get_or("GHL_CALLS_PER_SECOND", "5")
                        .parse()
                        .context("Invalid GHL_CALLS_PER_SECOND")?,
                },
            },
            flow: FlowConfig {
                api_key: get("POSTMAN_API_KEY"),
                base_url: get_or("POSTMAN_BASE_URL", "https://api.getpostman.com"),
                web_url: get_or("POSTMAN_WEB_URL", "https://postman.com"),
            },
            paths: PathsConfig {
                base_dir,
                output_dir,
                log_dir,
            },
            logging: LoggingConfig {
                level: get_or("RUST_LOG", "info"),
                format: get_or("LOG_FORMAT", "text"),
            },
        };
        
        // Validate configuration
        settings.validate()?;
        
        Ok(settings)
    }
    
    /// Validate configuration validity
    pub fn validate(&self) -> Result<()> {
        let urls = [
            ("ANTHROPIC_BASE_URL", &self.providers.claude.base_url),
            ("OPENAI_BASE_URL", &self.providers.chatgpt.base_url),
            ("GEMINI_BASE_URL", &self.providers.gemini.base_url),
            ("GHL_BASE_URL", &self.crm.base_url),
            ("POSTMAN_BASE_URL", &self.flow.base_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http") {
                anyhow::bail!("Invalid {} format, should start with 'http': {}", name, url);
            }
        }
        
        if self.providers.timeout == 0 || self.crm.timeout == 0 {
            anyhow::bail!("Timeout values cannot be 0");
        }
        
        for (name, limit) in [("Anthropic", self.rate_limits.anthropic), ("CRM", self.rate_limits.crm)] {
            if limit.calls_per_minute == 0 || limit.calls_per_second == 0 {
                anyhow::bail!("{} rate limits must be positive", name);
            }
        }
        
        if self.providers.claude.max_tokens == 0 {
            anyhow::bail!("CLAUDE_MAX_TOKENS cannot be 0");
        }
        
        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }
        
        // Validate log format
        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }
        
        Ok(())
    }
    
    /// Non-fatal configuration problems; each one disables a feature
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        
        if self.providers.claude.api_key.is_none() {
            issues.push("ANTHROPIC_API_KEY not set (Claude disabled)".to_string());
        }
        if self.providers.chatgpt.api_key.is_none() {
            issues.push("OPENAI_API_KEY not set (ChatGPT disabled)".to_string());
        }
        if self.providers.gemini.api_key.is_none() {
            issues.push("GEMINI_API_KEY not set (Gemini disabled)".to_string());
        }
        if self.crm.api_key.is_none() {
            issues.push("GHL_API_KEY not set (GHL features disabled)".to_string());
        }
        if self.crm.location_id.is_none() {
            issues.push("GHL_LOCATION_ID not set (GHL features disabled)".to_string());
        }
        
        issues
    }
    
    /// Provider configuration by kind
    pub fn provider(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::Claude => &self.providers.claude,
            ProviderKind::ChatGpt => &self.providers.chatgpt,
            ProviderKind::Gemini => &self.providers.gemini,
        }
    }
    
    /// Whether at least one language-model credential is configured
    pub fn has_any_llm_key(&self) -> bool {
        ProviderKind::ALL
            .iter()
            .any(|kind| self.provider(*kind).api_key.is_some())
    }
    
    /// Whether CRM calls can be made
    pub fn crm_configured(&self) -> bool {
        self.crm.api_key.is_some() && self.crm.location_id.is_some()
    }
    
    /// Render the configuration with secrets masked
    pub fn describe(&self) -> String {
        let mut lines = vec![
            "--- Configuration ---".to_string(),
            format!("Base Directory: {}", self.paths.base_dir.display()),
            format!("Output Directory: {}", self.paths.output_dir.display()),
            format!("Log Directory: {}", self.paths.log_dir.display()),
        ];
        for kind in ProviderKind::ALL {
            let provider = self.provider(kind);
            lines.push(format!(
                "{} Model: {} | API Key: {}{}",
                kind.display_name(),
                provider.model,
                mask_secret(provider.api_key.as_deref()),
                provider
                    .key_source
                    .as_ref()
                    .map(|s| format!(" (from {})", s))
                    .unwrap_or_default(),
            ));
        }
        lines.push(format!("GHL API Key: {}", mask_secret(self.crm.api_key.as_deref())));
        lines.push(format!(
            "GHL Location ID: {}",
            self.crm.location_id.as_deref().unwrap_or("NOT SET")
        ));
        lines.push("--------------------".to_string());
        lines.join("\n")
    }
}

/// First non-empty variable among `keys`, with the name that supplied it
fn first_key<G>(get: &G, keys: &[&str]) -> (Option<String>, Option<String>)
where
    G: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = get(key) {
            return (Some(value), Some(key.to_string()));
        }
    }
    (None, None)
}

/// Parse `from=to,from=to` pairs of provider names
fn parse_fallback_map(raw: &str) -> Result<HashMap<ProviderKind, ProviderKind>> {
    let mut map = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (from, to) = pair
            .split_once('=')
            .with_context(|| format!("Invalid QUOTA_FALLBACK entry: {}", pair))?;
        let from: ProviderKind = from.trim().parse()
            .map_err(|_| anyhow::anyhow!("Unknown provider in QUOTA_FALLBACK: {}", from))?;
        let to: ProviderKind = to.trim().parse()
            .map_err(|_| anyhow::anyhow!("Unknown provider in QUOTA_FALLBACK: {}", to))?;
        if from == to {
            warn!("Ignoring QUOTA_FALLBACK entry pointing {} at itself", from);
            continue;
        }
        map.insert(from, to);
    }
    Ok(map)
}
