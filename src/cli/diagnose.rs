//! `agencyops diagnose`

use crate::config::Settings;
use crate::services::diagnostics::{write_env_template, Diagnostics};
use anyhow::Context;
use std::path::Path;

const NEXT_STEPS: &str = "
  1. Set the variables in your environment or in a .env file next to the binary
       N8N_API_KEY=your-key
       N8N_API_URL=http://localhost:5678
       GHL_API_KEY=your-ghl-key
  2. For the Docker MCP Toolkit the n8n key is entered in Docker Desktop
     (n8n > Configuration > Secrets), separately from the environment
  3. Reopen your terminal after changing environment variables
  4. Restart Docker Desktop if networking issues persist";

pub async fn run(settings: &Settings, template: Option<&Path>) -> anyhow::Result<()> {
    let diagnostics = Diagnostics::from_env(&settings.crm).context("Failed to initialize diagnostics")?;
    let report = diagnostics.run().await;
    
    println!("{}", report.render());
    
    if let Some(path) = template {
        match write_env_template(path).await {
            Ok(()) => {
                println!("\n  ✓ Created {}", path.display());
                println!("    Copy to .env and fill in your actual values");
            }
            Err(e) => println!("\n  ✗ Failed to create template: {}", e),
        }
    }
    
    println!("\n{}\n NEXT STEPS\n{}{}", "=".repeat(60), "=".repeat(60), NEXT_STEPS);
    println!("\n{} check(s) failed", report.failures());
    Ok(())
}
