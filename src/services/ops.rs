//! Operations & business development manager
//!
//! A set of prompt-driven agents sharing one dispatcher, and therefore one
//! Anthropic rate limiter and one usage tracker. The full analysis runs
//! CRM → costs → markets → strategy; a failed step is recorded and the next
//! step still runs.

use crate::config::Settings;
use crate::models::crm::CrmAnalysis;
use crate::models::ops::*;
use crate::models::{ChatTurn, ProviderKind};
use crate::providers::GenerateRequest;
use crate::services::crm::{CrmAnalyzer, CrmClient};
use crate::services::dispatcher::Dispatcher;
use crate::services::extract;
use crate::utils::error::{AppError, AppResult};
use chrono::Local;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Industries the agency targets; the full analysis researches the first three
pub const TARGET_INDUSTRIES: [&str; 8] = [
    "Real Estate Agents",
    "Contractors (HVAC, Plumbing, Electrical)",
    "Med Spas",
    "Dentists",
    "Chiropractors",
    "Law Firms (Personal Injury, Family)",
    "Auto Repair Shops",
    "Roofing Companies",
];

/// A recurring monthly service cost
#[derive(Debug, Clone, Copy)]
pub struct KnownService {
    pub name: &'static str,
    pub monthly_cost: f64,
    pub description: &'static str,
}

pub const KNOWN_SERVICES: [KnownService; 5] = [
    KnownService { name: "GHL", monthly_cost: 297.0, description: "Go High Level CRM" },
    KnownService { name: "Claude", monthly_cost: 0.0, description: "Anthropic API (usage-based)" },
    KnownService { name: "Hosting", monthly_cost: 50.0, description: "Website hosting" },
    KnownService { name: "Domains", monthly_cost: 15.0, description: "Domain registrations" },
    KnownService { name: "N8N", monthly_cost: 0.0, description: "Self-hosted automation" },
];

/// Turns kept in the ops chat history
pub const MAX_HISTORY_TURNS: usize = 40;

const OPS_SYSTEM_PROMPT: &str = "You are an AI Operations & Business Development Manager for Premier Lead Marketing, \
a digital marketing agency specializing in Go High Level implementations for local businesses.

Your responsibilities:
1. Strategic Planning - Market analysis, go-to-market strategies, industry selection
2. Operations Management - CRM optimization, automation workflows, infrastructure
3. Financial Control - Cost tracking, overhead management, pricing strategies
4. Business Development - Lead generation, service offerings, competitive positioning
5. Documentation - SOPs, landing pages, CTAs, technical documentation

Provide actionable, data-driven advice with specific steps. Always consider:
- Cost efficiency and ROI
- Market trends and competitive landscape
- Implementation complexity vs. impact
- Scalability and sustainability

Be direct, analytical, and focused on revenue growth and operational excellence.";

fn now() -> String {
    Local::now().to_rfc3339()
}

fn current_month() -> String {
    Local::now().format("%B %Y").to_string()
}

/// Dispatcher handle plus the provider an agent talks to
#[derive(Clone)]
struct AgentContext {
    dispatcher: Arc<Dispatcher>,
    provider: ProviderKind,
}

impl AgentContext {
    async fn ask(&self, prompt: String, max_tokens: u32) -> AppResult<String> {
        let request = GenerateRequest {
            max_tokens: Some(max_tokens),
            ..GenerateRequest::prompt(prompt)
        };
        let response = self.dispatcher.complete(self.provider, &request).await?;
        debug!("{} in, {} out", response.input_tokens, response.output_tokens);
        Ok(response.response)
    }
}

/// SOPs, landing pages and CTA copy
pub struct DocumentationAgent {
    ctx: AgentContext,
}

impl DocumentationAgent {
    /// Standard operating procedure in markdown
    pub async fn generate_sop(&self, topic: &str, target_audience: &str) -> AppResult<String> {
        info!("Generating SOP for: {}", topic);
        let prompt = format!(
            "Create a detailed SOP for: {topic}\n\n\
             Target Audience: {target_audience}\n\n\
             Include:\n\
             1. Purpose and Scope\n\
             2. Step-by-step procedures\n\
             3. Screenshots/visual references needed (note locations)\n\
             4. Common issues and troubleshooting\n\
             5. Success criteria\n\n\
             Format as markdown with clear headings and numbered steps."
        );
        self.ctx.ask(prompt, 4096).await
    }
    
    /// Landing page copy and structure
    pub async fn generate_landing_page(&self, industry: &str, service: &str, pain_points: &[String]) -> AppResult<String> {
        info!("Generating landing page for: {} - {}", industry, service);
        let prompt = format!(
            "Create a high-converting landing page for:\n\n\
             Industry: {industry}\n\
             Service: {service}\n\
             Pain Points: {}\n\n\
             Provide:\n\
             1. Compelling headline (with 3 variations)\n\
             2. Subheadline\n\
             3. Hero section copy\n\
             4. Benefits (5-7 bullet points)\n\
             5. Social proof section (what to include)\n\
             6. CTA (3 variations - primary, secondary, urgent)\n\
             7. FAQ section (top 5 questions)\n\
             8. Technical specs (form fields, tracking pixels needed)\n\n\
             Return as JSON structure.",
            pain_points.join(", ")
        );
        self.ctx.ask(prompt, 4096).await
    }
    
    /// Ten CTA button variations as a numbered list
    pub async fn generate_cta_variations(&self, context: &str, goal: &str) -> AppResult<String> {
        info!("Generating CTA variations for goal: {}", goal);
        let prompt = format!(
            "Generate 10 high-converting CTA button variations for:\n\n\
             Context: {context}\n\
             Goal: {goal}\n\n\
             Requirements:\n\
             - Action-oriented\n\
             - Create urgency\n\
             - Clear value proposition\n\
             - Mix of short (2-3 words) and longer (4-7 words)\n\
             - Consider different psychological triggers (urgency, curiosity, benefit, social proof)\n\n\
             Return as a numbered list."
        );
        self.ctx.ask(prompt, 2048).await
    }
}

/// Industry research and comparison
pub struct MarketResearcher {
    ctx: AgentContext,
}

impl MarketResearcher {
    /// Deep dive on one industry
    pub async fn research_industry(&self, industry: &str) -> AppResult<MarketResearch> {
        info!("Researching industry: {}", industry);
        let prompt = format!(
            "Conduct comprehensive market research for: {industry}\n\n\
             As of {}, provide:\n\n\
             1. Market Size & Growth\n   - Total addressable market\n   - Growth rate\n   - Market trends\n\n\
             2. Client Economics\n   - Average client lifetime value\n   - Typical marketing budget\n   - ROI expectations\n\n\
             3. Pain Points (top 5-7)\n   - What keeps them up at night?\n   - Current frustrations with marketing\n   - Technology gaps\n\n\
             4. Competition Analysis\n   - Competition level (Low/Medium/High)\n   - What competitors are doing\n   - Gaps in market\n\n\
             5. Pricing Strategy\n   - Recommended pricing model (monthly retainer, project-based, performance-based)\n   - Price range that converts\n   - What services to bundle\n\n\
             6. Service Recommendations\n   - Most needed services\n   - Quick win services\n   - Premium services\n\n\
             7. Go-to-Market Strategy\n   - Best channels to reach them\n   - Messaging that resonates\n   - Objection handling\n\n\
             Return as detailed analysis with specific numbers and actionable insights.",
            current_month()
        );
        
        let analysis = self.ctx.ask(prompt, 4096).await?;
        let pain_points = extract::short_list_items(&analysis, 7);
        
        Ok(MarketResearch {
            industry: industry.to_string(),
            market_size: extract::market_size(&analysis),
            avg_client_value: extract::client_value(&analysis),
            competition_level: extract::competition_level(&analysis),
            recommended_services: pain_points.iter().take(5).cloned().collect(),
            pain_points,
            best_pricing_model: extract::pricing_model(&analysis),
            go_to_market_strategy: extract::closing_paragraphs(&analysis),
            timestamp: now(),
        })
    }
    
    /// The first three target industries; a failed industry is skipped
    pub async fn research_top_industries(&self) -> Vec<MarketResearch> {
        let industries = &TARGET_INDUSTRIES[..3];
        info!("Researching {} industries", industries.len());
        
        let mut results = Vec::with_capacity(industries.len());
        for industry in industries {
            match self.research_industry(industry).await {
                Ok(research) => {
                    info!("Completed research for: {}", industry);
                    results.push(research);
                }
                Err(e) => error!("Failed to research {}: {}", industry, e),
            }
        }
        results
    }
    
    /// Head-to-head comparison table
    pub async fn compare_industries(&self, industries: &[String]) -> AppResult<IndustryComparison> {
        info!("Comparing industries: {:?}", industries);
        let prompt = format!(
            "Compare these industries for a digital marketing agency:\n\n\
             Industries: {}\n\n\
             Create a comparison table with:\n\
             - Market attractiveness score (1-10)\n\
             - Ease of entry (1-10)\n\
             - Profit potential (1-10)\n\
             - Competition level (1-10)\n\
             - Time to first sale\n\
             - Recommended focus for {}\n\n\
             Provide final recommendation of top 2 industries to pursue NOW.",
            industries.join(", "),
            current_month()
        );
        
        Ok(IndustryComparison {
            industries: industries.to_vec(),
            comparison: self.ctx.ask(prompt, 3072).await?,
            timestamp: now(),
        })
    }
}

/// Monthly costs and compensation research
pub struct CostController {
    ctx: AgentContext,
}

impl CostController {
    /// Known services plus this session's API spend
    pub fn monthly_costs(&self) -> BTreeMap<String, f64> {
        let mut costs: BTreeMap<String, f64> = KNOWN_SERVICES
            .iter()
            .map(|s| (s.name.to_string(), s.monthly_cost))
            .collect();
        costs.insert(
            "Claude_API_Session".to_string(),
            self.ctx.dispatcher.usage_snapshot().estimated_cost,
        );
        costs
    }
    
    /// Cost breakdown with model recommendations
    pub async fn analyze_costs(&self) -> AppResult<CostAnalysis> {
        info!("Starting cost analysis");
        let costs = self.monthly_costs();
        
        let prompt = format!(
            "Analyze these monthly costs for a digital marketing agency:\n\n\
             Current Costs:\n{}\n\n\
             Provide:\n\
             1. Cost optimization opportunities\n\
             2. Services that could be eliminated/consolidated\n\
             3. Alternative solutions that cost less\n\
             4. Warning signs of overspending\n\
             5. Benchmark comparison (are these costs normal for this business?)\n\n\
             Return actionable recommendations.",
            serde_json::to_string_pretty(&costs)?
        );
        let text = self.ctx.ask(prompt, 2048).await?;
        
        Ok(CostAnalysis {
            total_monthly_cost: costs.values().sum(),
            recommendations: extract::list_items(&text, 10),
            potential_savings: identify_savings(&costs, &text),
            service_breakdown: costs,
            overhead_percentage: 0.0,
            timestamp: now(),
        })
    }
    
    /// Competitive compensation for a position
    pub async fn benchmark_salary(&self, position: &str, location: &str) -> AppResult<SalaryBenchmark> {
        info!("Researching salary benchmark for: {}", position);
        let prompt = format!(
            "Research competitive compensation for: {position}\n\n\
             Location: {location}\n\
             Date: {}\n\n\
             Provide:\n\
             1. Salary Range (min-max annual)\n\
             2. Typical hourly rate (if contractor)\n\
             3. Commission/bonus structure (if sales)\n\
             4. Benefits package expectations\n\
             5. Market trends (up/down/stable)\n\
             6. Red flags in negotiations\n\n\
             Be specific with numbers.",
            current_month()
        );
        
        Ok(SalaryBenchmark {
            position: position.to_string(),
            location: location.to_string(),
            analysis: self.ctx.ask(prompt, 2048).await?,
            timestamp: now(),
        })
    }
}

/// Paid services the model's answer mentions by name
fn identify_savings(costs: &BTreeMap<String, f64>, analysis: &str) -> Vec<SavingsItem> {
    let lower = analysis.to_lowercase();
    costs
        .iter()
        .filter(|(service, cost)| **cost > 0.0 && lower.contains(&service.to_lowercase()))
        .map(|(service, cost)| SavingsItem {
            service: service.clone(),
            current_cost: *cost,
            potential_saving: 0.0,
            recommendation: format!("Review {} usage", service),
        })
        .collect()
}

/// 30-60-90 day planning
pub struct BusinessStrategist {
    ctx: AgentContext,
}

impl BusinessStrategist {
    pub async fn generate_strategy(
        &self,
        crm: Option<&CrmAnalysis>,
        costs: Option<&CostAnalysis>,
        markets: &[MarketResearch],
    ) -> AppResult<StrategyReport> {
        info!("Generating business strategy");
        let prompt = format!(
            "As Premier Lead Marketing's Operations & Business Development Manager,\n\
             create a comprehensive 30-60-90 day strategic plan.\n\n\
             Current Business State:\n{}\n\n\
             Provide:\n\n\
             1. IMMEDIATE ACTIONS (Next 7 Days)\n   - Quick wins to generate revenue\n   - Critical infrastructure fixes\n   - Market opportunities to pursue NOW\n\n\
             2. SHORT-TERM STRATEGY (30 Days)\n   - Industry focus and why\n   - Service offering refinement\n   - Pricing strategy\n   - Marketing approach\n   - Sales process improvements\n\n\
             3. MEDIUM-TERM STRATEGY (60 Days)\n   - Team building (what roles, when)\n   - Automation expansion\n   - Client retention programs\n   - New service launches\n\n\
             4. LONG-TERM VISION (90 Days)\n   - Revenue targets and how to hit them\n   - Market positioning\n   - Scaling strategy\n   - Risk mitigation\n\n\
             5. KEY METRICS TO TRACK\n   - What to measure daily/weekly/monthly\n   - Target numbers\n\n\
             Be specific, actionable, and focused on profitable growth.",
            business_context(crm, costs, markets)
        );
        
        let text = self.ctx.ask(prompt, 8192).await?;
        let recommendations = extract::list_items(&text, 20);
        
        Ok(StrategyReport {
            priorities: recommendations.iter().take(5).cloned().collect(),
            recommendations,
            metrics: extract::metrics_section(&text),
            strategy: text,
            timestamp: now(),
        })
    }
}

/// Plain-text state summary fed to the strategist
pub fn business_context(crm: Option<&CrmAnalysis>, costs: Option<&CostAnalysis>, markets: &[MarketResearch]) -> String {
    let mut out = String::from("CRM State:\n");
    match crm {
        Some(crm) => out.push_str(&format!(
            "- Total Contacts: {}\n- Active Pipelines: {}\n- Conversion Rate: {:.1}%\n",
            crm.total_contacts, crm.active_pipelines, crm.conversion_rate
        )),
        None => out.push_str("- Total Contacts: 0\n- Active Pipelines: 0\n- Conversion Rate: 0%\n"),
    }
    
    out.push_str("\nCost Structure:\n");
    match costs {
        Some(costs) => out.push_str(&format!(
            "- Monthly Costs: ${:.2}\n- Services: {}\n",
            costs.total_monthly_cost,
            costs.service_breakdown.keys().cloned().collect::<Vec<_>>().join(", ")
        )),
        None => out.push_str("- Monthly Costs: $0.00\n- Services: N/A\n"),
    }
    
    out.push_str("\nMarket Research:\n");
    if markets.is_empty() {
        out.push_str("No market data available\n");
    }
    for research in markets {
        out.push_str(&format!(
            "\nIndustry: {}\n- Market Size: {}\n- Competition: {}\n- Avg Client Value: ${}\n- Pricing Model: {}\n",
            research.industry,
            research.market_size,
            research.competition_level,
            research.avg_client_value,
            research.best_pricing_model
        ));
    }
    
    out.push_str(&format!("\nCurrent Date: {}\n", current_month()));
    out
}

/// Result of a full analysis run
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub analysis: BusinessAnalysis,
    /// Where the JSON dump was written, if saving succeeded
    pub saved_to: Option<PathBuf>,
}

/// The operations manager
pub struct OpsManager {
    dispatcher: Arc<Dispatcher>,
    pub docs: DocumentationAgent,
    pub crm: CrmAnalyzer,
    pub market: MarketResearcher,
    pub costs: CostController,
    pub strategist: BusinessStrategist,
    history: Vec<ChatTurn>,
    output_dir: PathBuf,
}

impl OpsManager {
    /// Build from settings; requires a configured Claude key
    pub fn from_settings(settings: &Settings) -> AppResult<Self> {
        let dispatcher = Arc::new(Dispatcher::from_settings(settings)?);
        if !dispatcher.is_available(ProviderKind::Claude) {
            return Err(AppError::Config(
                "Anthropic API key required. Set ANTHROPIC_API_KEY environment variable.".to_string(),
            ));
        }
        
        let crm_client = match CrmClient::new(&settings.crm, &settings.rate_limits.crm) {
            Ok(client) => Some(client),
            Err(AppError::ClientNotInitialized(_)) => None,
            Err(e) => return Err(e),
        };
        
        Ok(Self::new(dispatcher, crm_client, settings.paths.output_dir.clone()))
    }
    
    /// Assemble from parts
    pub fn new(dispatcher: Arc<Dispatcher>, crm_client: Option<CrmClient>, output_dir: PathBuf) -> Self {
        let ctx = AgentContext {
            dispatcher: dispatcher.clone(),
            provider: ProviderKind::Claude,
        };
        
        info!("OpsManager initialized");
        Self {
            docs: DocumentationAgent { ctx: ctx.clone() },
            crm: CrmAnalyzer::new(crm_client, dispatcher.clone()),
            market: MarketResearcher { ctx: ctx.clone() },
            costs: CostController { ctx: ctx.clone() },
            strategist: BusinessStrategist { ctx },
            dispatcher,
            history: Vec::new(),
            output_dir,
        }
    }
    
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
    
    /// Run every step and save the combined result
    pub async fn analyze_business_state(&self) -> AnalysisOutcome {
        info!("Starting comprehensive business analysis");
        let mut analysis = BusinessAnalysis::default();
        let mut errors = Vec::new();
        
        info!("[1/4] Analyzing GHL CRM infrastructure");
        match self.crm.analyze_infrastructure().await {
            Ok(crm) => {
                info!("CRM analysis complete: {} contacts", crm.total_contacts);
                analysis.crm = Some(crm);
            }
            Err(e) => {
                error!("CRM analysis failed: {}", e);
                errors.push(format!("CRM analysis failed: {}", e));
            }
        }
        
        info!("[2/4] Analyzing costs & overhead");
        match self.costs.analyze_costs().await {
            Ok(costs) => {
                info!("Cost analysis complete: ${:.2}/month", costs.total_monthly_cost);
                analysis.costs = Some(costs);
            }
            Err(e) => {
                error!("Cost analysis failed: {}", e);
                errors.push(format!("Cost analysis failed: {}", e));
            }
        }
        
        info!("[3/4] Researching market trends");
        analysis.markets = self.market.research_top_industries().await;
        if analysis.markets.is_empty() {
            errors.push("Market research failed: no industry could be researched".to_string());
        }
        
        info!("[4/4] Generating strategic recommendations");
        match self
            .strategist
            .generate_strategy(analysis.crm.as_ref(), analysis.costs.as_ref(), &analysis.markets)
            .await
        {
            Ok(strategy) => {
                info!("Strategy generation complete: {} recommendations", strategy.recommendations.len());
                analysis.strategy = Some(strategy);
            }
            Err(e) => {
                error!("Strategy generation failed: {}", e);
                errors.push(format!("Strategy generation failed: {}", e));
            }
        }
        
        analysis.metadata = AnalysisMetadata {
            run_id: Uuid::new_v4().to_string(),
            timestamp: now(),
            errors,
            token_usage: self.dispatcher.usage_snapshot(),
        };
        
        let saved_to = match save_analysis(&self.output_dir, &analysis).await {
            Ok(path) => {
                info!("Analysis saved to {}", path.display());
                Some(path)
            }
            Err(e) => {
                error!("Failed to save analysis: {}", e);
                None
            }
        };
        
        AnalysisOutcome { analysis, saved_to }
    }
    
    /// Multi-turn chat with the ops system prompt
    pub async fn chat(&mut self, message: &str) -> AppResult<String> {
        if self.history.len() > MAX_HISTORY_TURNS {
            let excess = self.history.len() - MAX_HISTORY_TURNS;
            self.history.drain(..excess);
            debug!("Trimmed conversation history");
        }
        
        self.history.push(ChatTurn::user(message));
        let request = GenerateRequest {
            turns: self.history.clone(),
            system: Some(OPS_SYSTEM_PROMPT.to_string()),
            ..Default::default()
        };
        
        match self.dispatcher.complete(ProviderKind::Claude, &request).await {
            Ok(response) => {
                self.history.push(ChatTurn::assistant(response.response.clone()));
                Ok(response.response)
            }
            Err(e) => {
                self.history.pop();
                warn!("Chat error: {}", e);
                Err(e)
            }
        }
    }
    
    pub fn history_len(&self) -> usize {
        self.history.len()
    }
    
    /// Token usage plus the Anthropic limiter window
    pub async fn token_status(&self) -> String {
        let usage = self.dispatcher.usage_snapshot();
        let mut status = format!(
            "[Token Status] API Calls: {} | Tokens: {} (in: {}, out: {}) | Est. Cost: ${:.4}",
            usage.api_calls, usage.total_tokens, usage.input_tokens, usage.output_tokens, usage.estimated_cost
        );
        if let Some(limiter) = self.dispatcher.limiter(ProviderKind::Claude) {
            status.push_str(&format!("\n[Rate Limit] {}", limiter.status().await));
        }
        status
    }
}

/// Write `<output>/Business_Analysis/business_analysis_YYYYMMDD_HHMMSS.json`
pub async fn save_analysis(output_dir: &Path, analysis: &BusinessAnalysis) -> AppResult<PathBuf> {
    let dir = output_dir.join("Business_Analysis");
    tokio::fs::create_dir_all(&dir).await?;
    
    let path = dir.join(format!(
        "business_analysis_{}.json",
        Local::now().format("%Y%m%d_%H%M%S")
    ));
    tokio::fs::write(&path, serde_json::to_string_pretty(analysis)?).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_identify_savings() {
        let mut costs = BTreeMap::new();
        costs.insert("GHL".to_string(), 297.0);
        costs.insert("N8N".to_string(), 0.0);
        costs.insert("Hosting".to_string(), 50.0);
        
        let savings = identify_savings(&costs, "Consider renegotiating ghl and self-hosting n8n");
        assert_eq!(savings.len(), 1);
        assert_eq!(savings[0].service, "GHL");
        assert_eq!(savings[0].recommendation, "Review GHL usage");
    }
    
    #[test]
    fn test_business_context_without_data() {
        let context = business_context(None, None, &[]);
        assert!(context.contains("Total Contacts: 0"));
        assert!(context.contains("Services: N/A"));
        assert!(context.contains("No market data available"));
    }
    
    #[tokio::test]
    async fn test_save_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let analysis = BusinessAnalysis {
            metadata: AnalysisMetadata {
                run_id: "run-1".to_string(),
                errors: vec!["CRM analysis failed: boom".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        
        let path = save_analysis(dir.path(), &analysis).await.unwrap();
        assert!(path.starts_with(dir.path().join("Business_Analysis")));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("business_analysis_") && name.ends_with(".json"));
        
        let saved: BusinessAnalysis = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, analysis);
    }
}
