//! `agencyops templates`

use crate::config::Settings;
use crate::services::templates::write_templates;
use std::path::PathBuf;

pub async fn run(settings: &Settings, out: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = out.unwrap_or_else(|| settings.paths.output_dir.join("templates"));
    
    println!("Creating PLM Templates...");
    println!("{}", "-".repeat(40));
    for path in write_templates(&dir).await? {
        println!("Created: {}", path.display());
    }
    println!("{}", "-".repeat(40));
    println!("All templates created successfully!");
    Ok(())
}
