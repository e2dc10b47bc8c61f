//! Token usage and cost tracking
//!
//! Linear price-per-million-token model, separate input and output prices.

use serde::{Deserialize, Serialize};

/// Price per million tokens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPricing {
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self { input_per_million, output_per_million }
    }
    
    /// Cost of one call
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        input_tokens as f64 / 1_000_000.0 * self.input_per_million
            + output_tokens as f64 / 1_000_000.0 * self.output_per_million
    }
}

/// Static price table, matched by model-name prefix; longest match wins
const PRICING_TABLE: &[(&str, ModelPricing)] = &[
    ("claude-3-5-haiku", ModelPricing::new(0.80, 4.00)),
    ("claude-3-haiku", ModelPricing::new(0.25, 1.25)),
    ("claude-opus", ModelPricing::new(15.00, 75.00)),
    ("claude-3-opus", ModelPricing::new(15.00, 75.00)),
    ("claude", ModelPricing::new(3.00, 15.00)),
    ("gpt-4o-mini", ModelPricing::new(0.15, 0.60)),
    ("gpt-4o", ModelPricing::new(2.50, 10.00)),
    ("gpt-4-turbo", ModelPricing::new(10.00, 30.00)),
    ("gpt-4", ModelPricing::new(30.00, 60.00)),
    ("gpt-3.5", ModelPricing::new(0.50, 1.50)),
    ("gemini", ModelPricing::new(0.075, 0.30)),
];

/// Price of a model, if it is in the table
pub fn pricing_for(model: &str) -> Option<ModelPricing> {
    longest_prefix(PRICING_TABLE, model)
}

fn longest_prefix(table: &[(&str, ModelPricing)], model: &str) -> Option<ModelPricing> {
    let model = model.to_lowercase();
    table
        .iter()
        .filter(|(prefix, _)| model.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, pricing)| *pricing)
}

/// Accumulated usage of one provider
///
/// Counters only grow; a fresh tracker is the only reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageTracker {
    pub label: String,
    pub pricing: ModelPricing,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub calls: u64,
    pub cost: f64,
}

impl UsageTracker {
    pub fn new(label: impl Into<String>, pricing: ModelPricing) -> Self {
        Self {
            label: label.into(),
            pricing,
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            calls: 0,
            cost: 0.0,
        }
    }
    
    /// Tracker priced from the static table; unknown models cost nothing
    pub fn for_model(label: impl Into<String>, model: &str) -> Self {
        Self::new(label, pricing_for(model).unwrap_or(ModelPricing::new(0.0, 0.0)))
    }
    
    /// Record one call
    pub fn add_usage(&mut self, input_tokens: u64, output_tokens: u64) {
        self.input_tokens += input_tokens;
        self.output_tokens += output_tokens;
        self.total_tokens += input_tokens + output_tokens;
        self.calls += 1;
        self.cost += self.pricing.cost(input_tokens, output_tokens);
    }
    
    /// Formatted totals
    pub fn summary(&self) -> String {
        format!(
            "{}\n  Calls:  {:>10}\n  Input:  {:>10} tokens\n  Output: {:>10} tokens\n  Total:  {:>10} tokens\n  Cost:   ${:>10.4}",
            self.label.to_uppercase(),
            self.calls,
            self.input_tokens,
            self.output_tokens,
            self.total_tokens,
            self.cost
        )
    }
}

/// Combined summary over several trackers
pub fn combined_summary<'a, I>(trackers: I) -> String
where
    I: IntoIterator<Item = &'a UsageTracker>,
{
    let rule = "=".repeat(50);
    let mut out = vec![rule.clone(), "TOKEN USAGE & COSTS".to_string(), rule.clone()];
    let mut total = 0.0;
    for tracker in trackers {
        out.push(tracker.summary());
        out.push("-".repeat(50));
        total += tracker.cost;
    }
    out.push(format!("TOTAL COST: ${:.4}", total));
    out.push(rule);
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_pricing_lookup() {
        assert_eq!(pricing_for("claude-sonnet-4-20250514"), Some(ModelPricing::new(3.0, 15.0)));
        assert_eq!(pricing_for("claude-3-5-haiku-20241022"), Some(ModelPricing::new(0.80, 4.00)));
        assert_eq!(pricing_for("gpt-4"), Some(ModelPricing::new(30.0, 60.0)));
        assert_eq!(pricing_for("gpt-4o-2024-08-06"), Some(ModelPricing::new(2.50, 10.00)));
        assert_eq!(pricing_for("gemini-2.5-flash"), Some(ModelPricing::new(0.075, 0.30)));
        assert_eq!(pricing_for("llama-3"), None);
    }
    
    #[test]
    fn test_unknown_model_is_free() {
        let mut tracker = UsageTracker::for_model("local", "llama-3");
        tracker.add_usage(1000, 1000);
        assert_eq!(tracker.cost, 0.0);
        assert_eq!(tracker.total_tokens, 2000);
    }
    
    #[test]
    fn test_longest_prefix_ignores_table_order() {
        let table = [
            ("gpt-4", ModelPricing::new(30.0, 60.0)),
            ("gpt-4o", ModelPricing::new(2.5, 10.0)),
            ("gpt-4o-mini", ModelPricing::new(0.15, 0.60)),
        ];
        assert_eq!(longest_prefix(&table, "GPT-4o-mini-2024"), Some(ModelPricing::new(0.15, 0.60)));
        assert_eq!(longest_prefix(&table, "gpt-4o-2024-08-06"), Some(ModelPricing::new(2.5, 10.0)));
        assert_eq!(longest_prefix(&table, "gpt-4-0613"), Some(ModelPricing::new(30.0, 60.0)));
        assert_eq!(longest_prefix(&table, "o1-preview"), None);
    }
}
