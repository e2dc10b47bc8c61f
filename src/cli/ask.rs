//! `agencyops ask`

use crate::config::Settings;
use crate::services::Dispatcher;
use anyhow::Context;
use std::path::Path;

pub async fn run(
    settings: &Settings,
    provider: &str,
    prompt: &str,
    image: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let dispatcher = Dispatcher::from_settings(settings).context("Failed to initialize providers")?;
    let response = dispatcher.call_agent_with_image(provider, prompt, image).await;
    
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else if let Some(error) = &response.error {
        println!("[ERROR] {}: {}", error, response.response);
    } else {
        let provider_name = response.provider.map(|p| p.display_name()).unwrap_or("unknown");
        if let Some(from) = response.fallback_from {
            println!("[FALLBACK] {} unavailable, answered by {}", from.display_name(), provider_name);
        }
        println!("{}", response.response);
        println!(
            "\n[{} | {} | {} tokens{} | {:.2}s]",
            provider_name,
            response.model.as_deref().unwrap_or("-"),
            response.tokens_used,
            if response.usage_estimated { " (est.)" } else { "" },
            response.processing_time
        );
    }
    
    match response.error {
        Some(error) => anyhow::bail!("{} call failed: {}", provider, error),
        None => Ok(()),
    }
}
