//! Provider dispatcher
//!
//! Routes a prompt to one provider by kind and normalizes whatever comes
//! back into a [`ProviderResponse`]. Expected failures (missing client,
//! transport, provider errors) are reported in the result, never raised.
//! A quota error gets exactly one retry on the configured fallback provider.

use crate::config::Settings;
use crate::models::ops::UsageSnapshot;
use crate::models::{ProviderKind, ProviderResponse};
use crate::providers::{
    AnthropicProvider, GeminiProvider, GenerateRequest, ImageAttachment, OpenAIProvider, Provider,
};
use crate::services::rate_limiter::RateLimiter;
use crate::services::usage::{combined_summary, UsageTracker};
use crate::utils::error::{AppError, AppResult};
use crate::utils::logging::truncate_for_log;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Provider dispatcher
///
/// Holds one optional client per provider kind, the per-provider rate
/// limiters and usage trackers, and the quota fallback map.
pub struct Dispatcher {
    /// Provider instances by kind; absent kinds failed to initialize
    providers: HashMap<ProviderKind, Arc<dyn Provider>>,
    /// Optional limiter per kind
    limiters: HashMap<ProviderKind, Arc<RateLimiter>>,
    /// Quota fallback targets
    fallback: HashMap<ProviderKind, ProviderKind>,
    /// Usage per kind; never locked across an await
    usage: Mutex<BTreeMap<ProviderKind, UsageTracker>>,
}

impl Dispatcher {
    /// Empty dispatcher with a fallback map
    pub fn new(fallback: HashMap<ProviderKind, ProviderKind>) -> Self {
        Self {
            providers: HashMap::new(),
            limiters: HashMap::new(),
            fallback,
            usage: Mutex::new(BTreeMap::new()),
        }
    }
    
    /// Build every provider whose credential is configured
    pub fn from_settings(settings: &Settings) -> AppResult<Self> {
        let mut dispatcher = Self::new(settings.providers.quota_fallback.clone());
        let timeout = settings.providers.timeout;
        
        for kind in ProviderKind::ALL {
            let config = settings.provider(kind);
            let built: AppResult<Arc<dyn Provider>> = match kind {
                ProviderKind::Claude => AnthropicProvider::new(config, timeout).map(|p| Arc::new(p) as Arc<dyn Provider>),
                ProviderKind::ChatGpt => OpenAIProvider::new(config, timeout).map(|p| Arc::new(p) as Arc<dyn Provider>),
                ProviderKind::Gemini => GeminiProvider::new(config, timeout).map(|p| Arc::new(p) as Arc<dyn Provider>),
            };
            
            match built {
                Ok(provider) => dispatcher = dispatcher.with_provider(provider),
                Err(AppError::ClientNotInitialized(_)) => {
                    warn!("{} disabled: no API key configured", kind.display_name());
                }
                Err(e) => {
                    error!("{} init failed: {}", kind.display_name(), e);
                }
            }
        }
        
        // One limiter per API key, shared by every Claude call site
        let anthropic = RateLimiter::from_config("Anthropic", &settings.rate_limits.anthropic)?;
        dispatcher = dispatcher.with_limiter(ProviderKind::Claude, Arc::new(anthropic));
        
        info!("Dispatcher initialized with {} provider(s)", dispatcher.providers.len());
        Ok(dispatcher)
    }
    
    /// Register a provider under its own kind
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        let kind = provider.kind();
        self.lock_usage()
            .entry(kind)
            .or_insert_with(|| UsageTracker::for_model(kind.display_name(), provider.model()));
        self.providers.insert(kind, provider);
        self
    }
    
    /// Route every call to `kind` through `limiter`
    pub fn with_limiter(mut self, kind: ProviderKind, limiter: Arc<RateLimiter>) -> Self {
        self.limiters.insert(kind, limiter);
        self
    }
    
    pub fn is_available(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }
    
    /// Initialized providers, in menu order
    pub fn available(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.is_available(*kind))
            .collect()
    }
    
    /// Model identifier of an initialized provider
    pub fn model_of(&self, kind: ProviderKind) -> Option<&str> {
        self.providers.get(&kind).map(|p| p.model())
    }
    
    /// Limiter attached to a provider
    pub fn limiter(&self, kind: ProviderKind) -> Option<&Arc<RateLimiter>> {
        self.limiters.get(&kind)
    }
    
    /// Send a single prompt to a provider named by string or alias
    pub async fn call_agent(&self, name: &str, prompt: &str) -> ProviderResponse {
        self.call_agent_with_image(name, prompt, None).await
    }
    
    /// Like [`call_agent`](Self::call_agent), optionally attaching an image
    pub async fn call_agent_with_image(
        &self,
        name: &str,
        prompt: &str,
        image_path: Option<&Path>,
    ) -> ProviderResponse {
        let kind = match name.parse::<ProviderKind>() {
            Ok(kind) => kind,
            Err(unknown) => {
                let err = AppError::UnknownAgent(unknown);
                return ProviderResponse::failure(err.result_tag(), err.to_string());
            }
        };
        
        let image = image_path.and_then(|path| match ImageAttachment::load(path) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("Image processing failed, sending text only: {}", e);
                None
            }
        });
        
        let request = GenerateRequest::prompt(prompt).with_image(image);
        self.dispatch(kind, &request).await
    }
    
    /// Send a request to `kind`, falling back once on quota exhaustion
    pub async fn dispatch(&self, kind: ProviderKind, request: &GenerateRequest) -> ProviderResponse {
        let started = Instant::now();
        
        let err = match self.attempt(kind, request).await {
            Ok(response) => return response,
            Err(e) => e,
        };
        
        if err.is_quota_exhausted() {
            if let Some(target) = self.fallback.get(&kind).copied() {
                if self.is_available(target) {
                    warn!(
                        "{} quota exhausted, retrying once on {}",
                        kind.display_name(),
                        target.display_name()
                    );
                    let mut response = match self.attempt(target, request).await {
                        Ok(response) => response,
                        Err(fallback_err) => self.failure(target, &fallback_err, started),
                    };
                    // Both attempts count
                    response.processing_time = started.elapsed().as_secs_f64();
                    response.fallback_from = Some(kind);
                    return response;
                }
                warn!("{} quota exhausted and fallback {} is unavailable", kind.display_name(), target.display_name());
            }
        }
        
        self.failure(kind, &err, started)
    }
    
    /// Dispatch and turn an error-tagged result into an error
    pub async fn complete(&self, kind: ProviderKind, request: &GenerateRequest) -> AppResult<ProviderResponse> {
        let response = self.dispatch(kind, request).await;
        match &response.error {
            None => Ok(response),
            Some(tag) if tag == "client_not_initialized" => {
                Err(AppError::ClientNotInitialized(kind.display_name().to_string()))
            }
            Some(_) => Err(AppError::ProviderFailed {
                provider: kind.display_name().to_string(),
                message: response.response,
            }),
        }
    }
    
    /// One call to one provider, no fallback
    async fn attempt(&self, kind: ProviderKind, request: &GenerateRequest) -> AppResult<ProviderResponse> {
        let provider = self
            .providers
            .get(&kind)
            .ok_or_else(|| AppError::ClientNotInitialized(kind.display_name().to_string()))?;
        
        let capabilities = provider.capabilities();
        let degraded;
        let request = match &request.image {
            Some(_) if !capabilities.supports_vision => {
                warn!("{} does not accept images, sending text only", kind.display_name());
                degraded = without_image(request);
                &degraded
            }
            Some(image) => match image.check_size(capabilities.max_image_bytes) {
                Ok(()) => request,
                Err(e) => {
                    warn!("{}: {}, sending text only", kind.display_name(), e);
                    degraded = without_image(request);
                    &degraded
                }
            },
            None => request,
        };
        
        if let Some(limiter) = self.limiters.get(&kind) {
            limiter.admit().await;
        }
        
        let started = Instant::now();
        debug!("Dispatching to {}: {}", kind, truncate_for_log(request.last_prompt(), 100));
        let completion = provider.generate(request).await?;
        let elapsed = started.elapsed().as_secs_f64();
        
        self.lock_usage()
            .entry(kind)
            .or_insert_with(|| UsageTracker::for_model(kind.display_name(), provider.model()))
            .add_usage(completion.input_tokens, completion.output_tokens);
        
        debug!(
            "{} responded in {:.2}s ({} in, {} out)",
            kind, elapsed, completion.input_tokens, completion.output_tokens
        );
        
        Ok(ProviderResponse {
            response: completion.text,
            error: None,
            tokens_used: completion.input_tokens + completion.output_tokens,
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
            usage_estimated: completion.estimated,
            processing_time: elapsed,
            model: Some(completion.model),
            provider: Some(kind),
            image_analyzed: request.image.as_ref().map(|i| i.path.display().to_string()),
            fallback_from: None,
        })
    }
    
    fn failure(&self, kind: ProviderKind, err: &AppError, started: Instant) -> ProviderResponse {
        if err.should_log_details() {
            error!("Error calling {}: {}", kind.display_name(), err);
        } else {
            debug!("{} unavailable: {}", kind.display_name(), err);
        }
        
        let mut response = ProviderResponse::failure(
            err.result_tag(),
            format!("Error calling {}: {}", kind.display_name(), err),
        );
        response.provider = Some(kind);
        response.model = self.model_of(kind).map(String::from);
        response.processing_time = started.elapsed().as_secs_f64();
        response
    }
    
    fn lock_usage(&self) -> MutexGuard<'_, BTreeMap<ProviderKind, UsageTracker>> {
        self.usage.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
    
    /// Copy of one provider's tracker
    pub fn usage(&self, kind: ProviderKind) -> Option<UsageTracker> {
        self.lock_usage().get(&kind).cloned()
    }
    
    /// Totals over every provider
    pub fn usage_snapshot(&self) -> UsageSnapshot {
        self.lock_usage().values().fold(UsageSnapshot::default(), |mut acc, t| {
            acc.input_tokens += t.input_tokens;
            acc.output_tokens += t.output_tokens;
            acc.total_tokens += t.total_tokens;
            acc.estimated_cost += t.cost;
            acc.api_calls += t.calls;
            acc
        })
    }
    
    /// Combined human-readable usage and cost report
    pub fn usage_summary(&self) -> String {
        let usage = self.lock_usage();
        combined_summary(usage.values())
    }
}

fn without_image(request: &GenerateRequest) -> GenerateRequest {
    GenerateRequest {
        image: None,
        ..request.clone()
    }
}
