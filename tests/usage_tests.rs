//! Usage tracker tests

use agencyops::services::usage::{combined_summary, pricing_for, ModelPricing, UsageTracker};

fn create_test_tracker() -> UsageTracker {
    UsageTracker::for_model("Claude", "claude-sonnet-4-20250514")
}

#[test]
fn test_one_million_input_tokens_costs_three_dollars() {
    let mut tracker = create_test_tracker();
    tracker.add_usage(1_000_000, 0);
    
    assert!((tracker.cost - 3.00).abs() < 1e-9);
    assert_eq!(tracker.calls, 1);
}

#[test]
fn test_output_tokens_priced_separately() {
    let mut tracker = create_test_tracker();
    tracker.add_usage(0, 1_000_000);
    assert!((tracker.cost - 15.00).abs() < 1e-9);
    
    tracker.add_usage(500_000, 100_000);
    // 15 + 1.5 + 1.5
    assert!((tracker.cost - 18.00).abs() < 1e-9);
}

#[test]
fn test_counters_accumulate() {
    let mut tracker = UsageTracker::new("test", ModelPricing::new(1.0, 2.0));
    for _ in 0..4 {
        tracker.add_usage(250, 50);
    }
    
    assert_eq!(tracker.calls, 4);
    assert_eq!(tracker.input_tokens, 1000);
    assert_eq!(tracker.output_tokens, 200);
    assert_eq!(tracker.total_tokens, 1200);
    assert_eq!(tracker.total_tokens, tracker.input_tokens + tracker.output_tokens);
}

#[test]
fn test_prefix_order() {
    // More specific prefixes win over the family default
    assert_eq!(pricing_for("gpt-4o-mini"), Some(ModelPricing::new(0.15, 0.60)));
    assert_eq!(pricing_for("gpt-4-turbo-preview"), Some(ModelPricing::new(10.0, 30.0)));
    assert_eq!(pricing_for("Claude-3-5-Haiku-latest"), Some(ModelPricing::new(0.80, 4.00)));
}

#[test]
fn test_combined_summary() {
    let mut claude = create_test_tracker();
    claude.add_usage(1_000_000, 0);
    let mut gemini = UsageTracker::for_model("Gemini", "gemini-2.5-flash");
    gemini.add_usage(1_000_000, 1_000_000);
    
    let summary = combined_summary([&claude, &gemini]);
    assert!(summary.contains("TOKEN USAGE & COSTS"));
    assert!(summary.contains("CLAUDE"));
    assert!(summary.contains("GEMINI"));
    assert!(summary.contains("TOTAL COST: $3.3750"));
}

#[test]
fn test_summary_is_read_only() {
    let mut tracker = create_test_tracker();
    tracker.add_usage(1200, 300);
    
    let first = tracker.summary();
    let second = tracker.summary();
    assert_eq!(first, second);
    assert_eq!(tracker.calls, 1);
}
