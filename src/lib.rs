//! Agency operations toolkit
//! 
//! Multi-provider AI chat and dispatch, CRM analysis, an operations manager,
//! connectivity diagnostics, flow variable updates and document templates

pub mod cli;
pub mod config;
pub mod models;
pub mod providers;
pub mod services;
pub mod utils;

// Re-export common types
pub use config::Settings;
pub use models::{ProviderKind, ProviderResponse};
pub use providers::{GenerateRequest, Provider};
pub use services::{Dispatcher, OpsManager, Paginator, RateLimiter, UsageTracker};
pub use utils::error::{AppError, AppResult};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version information
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}
