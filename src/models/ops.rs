//! Operations manager report models
//!
//! Everything here ends up in the business analysis JSON dump.

use super::crm::CrmAnalysis;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Findings for one industry
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarketResearch {
    pub industry: String,
    pub market_size: String,
    pub avg_client_value: f64,
    pub competition_level: String,
    pub pain_points: Vec<String>,
    pub best_pricing_model: String,
    pub recommended_services: Vec<String>,
    pub go_to_market_strategy: String,
    pub timestamp: String,
}

/// Head-to-head comparison of several industries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndustryComparison {
    pub industries: Vec<String>,
    pub comparison: String,
    pub timestamp: String,
}

/// A service worth reviewing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavingsItem {
    pub service: String,
    pub current_cost: f64,
    pub potential_saving: f64,
    pub recommendation: String,
}

/// Monthly cost breakdown
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CostAnalysis {
    pub total_monthly_cost: f64,
    pub service_breakdown: BTreeMap<String, f64>,
    pub overhead_percentage: f64,
    pub recommendations: Vec<String>,
    pub potential_savings: Vec<SavingsItem>,
    pub timestamp: String,
}

/// Compensation research for a role
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalaryBenchmark {
    pub position: String,
    pub location: String,
    pub analysis: String,
    pub timestamp: String,
}

/// 30-60-90 day plan
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StrategyReport {
    pub strategy: String,
    pub recommendations: Vec<String>,
    pub priorities: Vec<String>,
    pub metrics: Vec<String>,
    pub timestamp: String,
}

/// Token usage snapshot stored with a report
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UsageSnapshot {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub estimated_cost: f64,
    pub api_calls: u64,
}

/// Run metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisMetadata {
    pub run_id: String,
    pub timestamp: String,
    pub errors: Vec<String>,
    pub token_usage: UsageSnapshot,
}

/// Full business analysis; a failed step leaves its slot empty
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BusinessAnalysis {
    pub crm: Option<CrmAnalysis>,
    pub costs: Option<CostAnalysis>,
    pub markets: Vec<MarketResearch>,
    pub strategy: Option<StrategyReport>,
    pub metadata: AnalysisMetadata,
}
