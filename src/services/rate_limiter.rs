//! Sliding-window rate limiter
//!
//! Bounds outbound calls along two axes at once: at most `calls_per_minute`
//! admissions in any rolling 60-second window, and at least
//! `1 / calls_per_second` between two consecutive admissions. Callers wait
//! instead of being rejected.

use crate::config::RateLimitConfig;
use crate::utils::error::{AppError, AppResult};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

/// Length of the per-minute quota window
pub const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct LimiterState {
    /// Admission times inside the current window, oldest first
    calls: VecDeque<Instant>,
    last_call: Option<Instant>,
}

impl LimiterState {
    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.calls.front() {
            if now.duration_since(*oldest) >= WINDOW {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Rate limiter shared by every call site of one external service
#[derive(Debug)]
pub struct RateLimiter {
    name: String,
    calls_per_minute: usize,
    min_interval: Duration,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Create a limiter; both quotas must be positive
    pub fn new(name: impl Into<String>, calls_per_minute: u32, calls_per_second: u32) -> AppResult<Self> {
        if calls_per_minute == 0 || calls_per_second == 0 {
            return Err(AppError::Validation(
                "rate limits must be positive".to_string(),
            ));
        }
        
        Ok(Self {
            name: name.into(),
            calls_per_minute: calls_per_minute as usize,
            min_interval: Duration::from_secs_f64(1.0 / calls_per_second as f64),
            state: Mutex::new(LimiterState::default()),
        })
    }
    
    /// Create a limiter from a configured quota pair
    pub fn from_config(name: impl Into<String>, config: &RateLimitConfig) -> AppResult<Self> {
        Self::new(name, config.calls_per_minute, config.calls_per_second)
    }
    
    /// Wait until a call is allowed, then record it.
    ///
    /// The state lock is held across the sleeps so concurrent callers queue
    /// up in order instead of racing for the same slot.
    pub async fn admit(&self) {
        let mut state = self.state.lock().await;
        
        let now = Instant::now();
        state.prune(now);
        
        if state.calls.len() >= self.calls_per_minute {
            if let Some(oldest) = state.calls.front().copied() {
                let resume = oldest + WINDOW;
                info!(
                    "{} rate limit reached ({}/min), waiting {:.1}s",
                    self.name,
                    self.calls_per_minute,
                    resume.saturating_duration_since(now).as_secs_f64()
                );
                sleep_until(resume).await;
                state.prune(Instant::now());
            }
        }
        
        if let Some(last) = state.last_call {
            let earliest = last + self.min_interval;
            if Instant::now() < earliest {
                debug!("{} spacing calls, next at +{:?}", self.name, earliest.saturating_duration_since(Instant::now()));
                sleep_until(earliest).await;
            }
        }
        
        let admitted = Instant::now();
        state.calls.push_back(admitted);
        state.last_call = Some(admitted);
    }
    
    /// Number of admissions inside the current window
    pub async fn calls_in_window(&self) -> usize {
        let mut state = self.state.lock().await;
        state.prune(Instant::now());
        state.calls.len()
    }
    
    /// Human readable window usage
    pub async fn status(&self) -> String {
        format!(
            "API calls in last minute: {}/{}",
            self.calls_in_window().await,
            self.calls_per_minute
        )
    }
    
    pub fn calls_per_minute(&self) -> usize {
        self.calls_per_minute
    }
    
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}
