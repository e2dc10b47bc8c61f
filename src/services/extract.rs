//! Best-effort extraction from free-form model text
//!
//! These heuristics summarize prose for display and JSON dumps. They make no
//! guarantees: a reply that ignores the requested layout simply yields empty
//! lists or the fallback strings.

use once_cell::sync::Lazy;
use regex::Regex;

static BILLION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\$?(\d+\.?\d*)\s*billion").expect("static regex"));
static MILLION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\$?(\d+\.?\d*)\s*million").expect("static regex"));
static DOLLAR_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\d{1,3}(?:,\d{3})*(?:\.\d{2})?)").expect("static regex"));

const BULLETS: [char; 3] = ['-', '*', '•'];

/// Whether a trimmed line looks like a bullet or a numbered item
fn is_list_line(line: &str) -> bool {
    if line.starts_with(BULLETS) {
        return true;
    }
    let mut chars = line.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_digit())
        && line.chars().take(3).any(|c| c == '.')
}

/// Strip leading bullet markers, digits, dots and spaces
fn clean_list_line(line: &str) -> &str {
    line.trim_start_matches(|c: char| BULLETS.contains(&c) || c.is_ascii_digit() || c == '.' || c == ' ')
}

/// Bullet and numbered items longer than 10 characters, at most `limit`
pub fn list_items(text: &str, limit: usize) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| is_list_line(line))
        .map(clean_list_line)
        .filter(|item| item.chars().count() > 10)
        .take(limit)
        .map(String::from)
        .collect()
}

/// Like [`list_items`] but skipping items of 200 characters or more
pub fn short_list_items(text: &str, limit: usize) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| is_list_line(line))
        .map(clean_list_line)
        .filter(|item| {
            let len = item.chars().count();
            len > 10 && len < 200
        })
        .take(limit)
        .map(String::from)
        .collect()
}

/// `$N billion` → `$NB`, else `$N million` → `$NM`
pub fn market_size(text: &str) -> String {
    if let Some(caps) = BILLION.captures(text) {
        return format!("${}B", &caps[1]);
    }
    if let Some(caps) = MILLION.captures(text) {
        return format!("${}M", &caps[1]);
    }
    "Market size not specified".to_string()
}

/// Largest dollar amount mentioned, usually the lifetime value
pub fn client_value(text: &str) -> f64 {
    DOLLAR_AMOUNT
        .captures_iter(text)
        .filter_map(|caps| caps[1].replace(',', "").parse::<f64>().ok())
        .fold(0.0, f64::max)
}

/// High, Low or Medium
pub fn competition_level(text: &str) -> String {
    let lower = text.to_lowercase();
    if ["high competition", "very competitive", "highly competitive"]
        .iter()
        .any(|p| lower.contains(p))
    {
        "High".to_string()
    } else if ["low competition", "less competitive"].iter().any(|p| lower.contains(p)) {
        "Low".to_string()
    } else {
        "Medium".to_string()
    }
}

/// Recommended pricing model
pub fn pricing_model(text: &str) -> String {
    let lower = text.to_lowercase();
    let model = if lower.contains("monthly retainer") {
        "Monthly Retainer"
    } else if lower.contains("performance") && lower.contains("based") {
        "Performance-Based"
    } else if lower.contains("project") && lower.contains("based") {
        "Project-Based"
    } else {
        "Hybrid Model"
    };
    model.to_string()
}

/// Last two substantial paragraphs, or the tail of the text
pub fn closing_paragraphs(text: &str) -> String {
    let paragraphs: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| p.chars().count() > 50)
        .collect();
    
    if paragraphs.is_empty() {
        let total = text.chars().count();
        return text.chars().skip(total.saturating_sub(500)).collect();
    }
    paragraphs[paragraphs.len().saturating_sub(2)..].join("\n\n")
}

/// Bullets within the ten lines starting at the first line mentioning metrics
pub fn metrics_section(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let start = match lines.iter().position(|l| l.to_lowercase().contains("metrics")) {
        Some(i) => i,
        None => return Vec::new(),
    };
    
    lines[start..]
        .iter()
        .take(10)
        .map(|l| l.trim())
        .filter(|l| l.starts_with(BULLETS))
        .map(|l| l.trim_start_matches(BULLETS).trim().to_string())
        .collect()
}
