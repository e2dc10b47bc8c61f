//! Service layer module
//!
//! Rate limiting, pagination, usage accounting, provider dispatch and the
//! operational tools built on them

pub mod chat;
pub mod crm;
pub mod diagnostics;
pub mod dispatcher;
pub mod extract;
pub mod flow;
pub mod ops;
pub mod paginator;
pub mod rate_limiter;
pub mod templates;
pub mod usage;

pub use chat::ChatSession;
pub use crm::{CrmAnalyzer, CrmClient};
pub use diagnostics::{CheckResult, Diagnostics};
pub use dispatcher::Dispatcher;
pub use flow::{FlowVariableUpdater, ManualFlowUpdater, RestFlowUpdater};
pub use ops::OpsManager;
pub use paginator::{PageSource, Paginator};
pub use rate_limiter::RateLimiter;
pub use usage::UsageTracker;
