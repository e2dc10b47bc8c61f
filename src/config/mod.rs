//! Configuration management module
//!
//! Responsible for loading the environment-driven settings of every tool

pub mod settings;

pub use settings::{
    CrmConfig, FlowConfig, LoggingConfig, PathsConfig, ProviderConfig, ProvidersConfig,
    RateLimitConfig, RateLimitsConfig, Settings,
};
