//! `agencyops chat`

use super::Prompter;
use crate::config::Settings;
use crate::services::chat::{ChatSession, Command, CommandOutcome};
use crate::services::Dispatcher;
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

const BANNER: &str = "
+-------------------------------------------------------------------------------+
|              Premier Lead Marketing - Unified AI Chat                         |
|                 Claude + ChatGPT + Gemini in One Interface                    |
|         Type /help for commands | /exit to quit | /cost for usage             |
+-------------------------------------------------------------------------------+";

pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    if !settings.has_any_llm_key() {
        anyhow::bail!(
            "No API keys found. Set at least one of ANTHROPIC_API_KEY, OPENAI_API_KEY or GEMINI_API_KEY"
        );
    }
    
    let dispatcher = Arc::new(Dispatcher::from_settings(settings).context("Failed to initialize providers")?);
    let mut session = ChatSession::new(dispatcher);
    let mut prompter = Prompter::new();
    
    println!("{}", BANNER);
    println!("\n[STATUS] Current model: {}\n", session.mode().to_string().to_uppercase());
    info!("Chat session started in {} mode", session.mode());
    
    loop {
        let line = match prompter.ask(&format!("\n[{}] You: ", session.mode())).await? {
            Some(line) => line,
            None => {
                // End of input behaves like /exit
                if let CommandOutcome::Exit(text) = session.handle_command(Command::Exit) {
                    println!("\n{}", text);
                }
                break;
            }
        };
        if line.is_empty() {
            continue;
        }
        
        if let Some(command) = Command::parse(&line) {
            match session.handle_command(command) {
                CommandOutcome::Continue(text) => println!("\n{}", text),
                CommandOutcome::Exit(text) => {
                    println!("\n{}", text);
                    break;
                }
            }
            continue;
        }
        
        println!("\n[Thinking...]");
        let reply = session.send(&line).await;
        println!("\n{}", reply);
    }
    
    Ok(())
}
