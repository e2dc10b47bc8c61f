//! `agencyops ops`: the numbered operations menu

use super::{preview, split_list, Prompter};
use crate::config::Settings;
use crate::services::ops::{AnalysisOutcome, OpsManager, TARGET_INDUSTRIES};
use crate::utils::error::AppResult;
use anyhow::Context;
use tracing::error;

const BANNER: &str = "
+-------------------------------------------------------------------------------+
|           Premier Lead Marketing - AI Operations Manager                      |
|     Your AI-powered Operations & Business Development Manager                 |
+-------------------------------------------------------------------------------+";

const MENU: &str = "
Available Commands:
  1. Full Business Analysis
  2. Market Research (specific industry)
  3. CRM Infrastructure Review
  4. Cost Analysis & Optimization
  5. Generate SOP
  6. Generate Landing Page Copy
  7. Generate CTA Variations
  8. Salary Benchmarking
  9. Compare Industries
 10. Chat with AI Ops Manager
 11. Show Token Usage
 12. Show Configuration
  0. Exit";

fn build_manager(settings: &Settings) -> anyhow::Result<OpsManager> {
    let issues = settings.issues();
    if !issues.is_empty() {
        println!("\n[CONFIG] Warnings:");
        for issue in &issues {
            println!("  - {}", issue);
        }
    }
    OpsManager::from_settings(settings).context("Critical configuration missing")
}

/// `ops analyze`
pub async fn run_analysis(settings: &Settings) -> anyhow::Result<()> {
    let manager = build_manager(settings)?;
    let outcome = manager.analyze_business_state().await;
    print_analysis(&outcome);
    println!("\n{}", manager.token_status().await);
    Ok(())
}

/// Interactive menu; per-option errors are reported and the loop continues
pub async fn run_menu(settings: &Settings) -> anyhow::Result<()> {
    println!("{}", BANNER);
    let mut manager = build_manager(settings)?;
    
    println!("\n[OK] Initialized successfully!");
    println!("[INFO] Logs: {}", settings.paths.log_dir.display());
    println!("[INFO] Output: {}", settings.paths.output_dir.display());
    println!("{}", MENU);
    
    let mut prompter = Prompter::new();
    loop {
        let Some(choice) = prompter.ask("\nSelect option (0-12): ").await? else {
            break;
        };
        
        match choice.as_str() {
            "0" => {
                println!("\n{}", manager.token_status().await);
                println!("\nGoodbye!");
                break;
            }
            "11" => println!("\n{}", manager.token_status().await),
            "12" => println!("\n{}", settings.describe()),
            option => {
                if let Err(e) = run_option(option, &mut manager, &mut prompter).await {
                    error!("Error in main loop: {}", e);
                    println!("\n[ERROR] {}", e);
                }
            }
        }
    }
    
    Ok(())
}

async fn run_option(option: &str, manager: &mut OpsManager, prompter: &mut Prompter) -> AppResult<()> {
    match option {
        "1" => {
            let outcome = manager.analyze_business_state().await;
            print_analysis(&outcome);
        }
        "2" => {
            let industry = prompter.ask("Industry to research: ").await?.unwrap_or_default();
            if industry.is_empty() {
                println!("[WARN] Industry name required");
                return Ok(());
            }
            println!("\n[RESEARCH] Researching {}...", industry);
            let research = manager.market.research_industry(&industry).await?;
            println!("\n[OK] Research complete for {}", industry);
            println!("Market Size: {}", research.market_size);
            println!("Competition: {}", research.competition_level);
            println!("Pricing Model: {}", research.best_pricing_model);
        }
        "3" => {
            println!("\n[CRM] Analyzing GHL infrastructure...");
            let analysis = manager.crm.analyze_infrastructure().await?;
            println!("\n[OK] CRM Analysis:");
            println!("  Contacts: {}", analysis.total_contacts);
            println!("  Pipelines: {}", analysis.active_pipelines);
            println!("  Workflows: {}", analysis.automation_count);
            println!("  Conversion Rate: {:.1}%", analysis.conversion_rate);
            println!("  Quick Wins: {}", analysis.quick_wins.len());
            if let Some(note) = &analysis.note {
                println!("  Note: {}", note);
            }
        }
        "4" => {
            println!("\n[COSTS] Analyzing costs...");
            let costs = manager.costs.analyze_costs().await?;
            println!("\n[OK] Cost Analysis:");
            println!("  Monthly Total: ${:.2}", costs.total_monthly_cost);
            println!("  Recommendations: {}", costs.recommendations.len());
            for saving in &costs.potential_savings {
                println!("  - {}: save up to ${:.2} ({})", saving.service, saving.potential_saving, saving.recommendation);
            }
        }
        "5" => {
            let topic = prompter.ask("SOP topic: ").await?.unwrap_or_default();
            if topic.is_empty() {
                println!("[WARN] Topic required");
                return Ok(());
            }
            let audience = prompter.ask("Target audience [team]: ").await?.unwrap_or_default();
            let audience = if audience.is_empty() { "team".to_string() } else { audience };
            let sop = manager.docs.generate_sop(&topic, &audience).await?;
            println!("\n[OK] SOP generated");
            println!("{}", preview(&sop, 500));
        }
        "6" => {
            let industry = prompter.ask("Industry: ").await?.unwrap_or_default();
            let service = prompter.ask("Service: ").await?.unwrap_or_default();
            let pain_points = split_list(&prompter.ask("Pain points (comma-separated): ").await?.unwrap_or_default());
            if industry.is_empty() || service.is_empty() {
                println!("[WARN] Industry and service required");
                return Ok(());
            }
            let copy = manager.docs.generate_landing_page(&industry, &service, &pain_points).await?;
            println!("\n[OK] Landing page copy generated");
            println!("{}", preview(&copy, 500));
        }
        "7" => {
            let context = prompter.ask("Context: ").await?.unwrap_or_default();
            let goal = prompter.ask("Goal: ").await?.unwrap_or_default();
            if context.is_empty() || goal.is_empty() {
                println!("[WARN] Context and goal required");
                return Ok(());
            }
            let ctas = manager.docs.generate_cta_variations(&context, &goal).await?;
            println!("\n[OK] CTA variations:");
            println!("{}", ctas);
        }
        "8" => {
            let position = prompter.ask("Position title: ").await?.unwrap_or_default();
            if position.is_empty() {
                println!("[WARN] Position title required");
                return Ok(());
            }
            let location = prompter.ask("Location [Remote]: ").await?.unwrap_or_default();
            let location = if location.is_empty() { "Remote".to_string() } else { location };
            let benchmark = manager.costs.benchmark_salary(&position, &location).await?;
            println!("\n[OK] Salary research for {}:", position);
            println!("{}", benchmark.analysis);
        }
        "9" => {
            println!("Industries: {}", TARGET_INDUSTRIES.join(", "));
            let industries = split_list(&prompter.ask("Select industries (comma-separated): ").await?.unwrap_or_default());
            if industries.is_empty() {
                println!("[WARN] At least one industry required");
                return Ok(());
            }
            let comparison = manager.market.compare_industries(&industries).await?;
            println!("\n[OK] Industry comparison:");
            println!("{}", comparison.comparison);
        }
        "10" => {
            println!("\n[CHAT] Chat Mode (type 'exit' to return to menu)");
            loop {
                let Some(input) = prompter.ask("\nYou: ").await? else {
                    break;
                };
                if input.eq_ignore_ascii_case("exit") {
                    break;
                }
                if input.is_empty() {
                    continue;
                }
                match manager.chat(&input).await {
                    Ok(reply) => println!("\nAI Ops Manager: {}", reply),
                    Err(e) => println!("\n[ERROR] {}", e),
                }
            }
        }
        _ => {
            println!("[WARN] Invalid option. Try again (0-12).");
            return Ok(());
        }
    }
    
    println!("\n{}", manager.token_status().await);
    Ok(())
}

fn print_analysis(outcome: &AnalysisOutcome) {
    let analysis = &outcome.analysis;
    println!("\n[OK] Full analysis complete");
    if let Some(crm) = &analysis.crm {
        println!("  CRM: {} contacts, {} pipelines, {} workflows", crm.total_contacts, crm.active_pipelines, crm.automation_count);
    }
    if let Some(costs) = &analysis.costs {
        println!("  Costs: ${:.2}/month", costs.total_monthly_cost);
    }
    println!("  Markets researched: {}", analysis.markets.len());
    if let Some(strategy) = &analysis.strategy {
        println!("  Strategy: {} recommendations", strategy.recommendations.len());
    }
    for error in &analysis.metadata.errors {
        println!("  [WARN] {}", error);
    }
    match &outcome.saved_to {
        Some(path) => println!("  Saved to: {}", path.display()),
        None => println!("  [WARN] Analysis could not be saved"),
    }
}
