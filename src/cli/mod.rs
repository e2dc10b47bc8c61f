//! Command-line front-end
//!
//! Argument parsing and the interactive loops. This layer owns all console
//! output; the services underneath only log.

mod ask;
mod chat;
mod diagnose;
mod flow;
mod ops;
mod templates;

use crate::config::Settings;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

/// Agency automation toolkit
#[derive(Debug, Parser)]
#[command(name = "agencyops", version, about)]
pub struct Cli {
    /// Log level override (trace|debug|info|warn|error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    
    /// Emit console logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
    
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive chat across Claude, ChatGPT and Gemini
    Chat,
    
    /// Operations manager menu
    Ops {
        #[command(subcommand)]
        action: Option<OpsAction>,
    },
    
    /// Send one prompt to one provider
    Ask {
        /// claude | chatgpt | gemini (aliases accepted)
        provider: String,
        prompt: String,
        /// Image to attach
        #[arg(long)]
        image: Option<PathBuf>,
        /// Print the normalized response as JSON
        #[arg(long)]
        json: bool,
    },
    
    /// Connectivity diagnostics for n8n, Docker and the CRM
    Diagnose {
        /// Also write a .env template to this path
        #[arg(long)]
        write_template: Option<PathBuf>,
    },
    
    /// Flow variable management
    Flow {
        #[command(subcommand)]
        action: FlowAction,
    },
    
    /// Write the proposal and competitive-analysis templates
    Templates {
        /// Output directory (default: <output dir>/templates)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum OpsAction {
    /// Run the full business analysis without the menu
    Analyze,
}

#[derive(Debug, Subcommand)]
pub enum FlowAction {
    /// Update flow configuration variables
    Update {
        #[arg(long)]
        flow_id: String,
        /// NAME=VALUE or NAME=VALUE:secret
        #[arg(long = "var", required = true)]
        vars: Vec<String>,
        /// NAME=VARIABLE_ID, to update by id
        #[arg(long = "id")]
        ids: Vec<String>,
        /// Skip the API and go straight to the guided manual update
        #[arg(long)]
        manual: bool,
    },
}

impl Cli {
    /// Fold command-line overrides into the loaded settings
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(level) = &self.log_level {
            settings.logging.level = level.to_lowercase();
        }
        if self.json_logs {
            settings.logging.format = "json".to_string();
        }
    }
}

/// Run the selected command
pub async fn run(cli: Cli, settings: Settings) -> anyhow::Result<()> {
    match cli.command {
        Commands::Chat => chat::run(&settings).await,
        Commands::Ops { action: None } => ops::run_menu(&settings).await,
        Commands::Ops { action: Some(OpsAction::Analyze) } => ops::run_analysis(&settings).await,
        Commands::Ask { provider, prompt, image, json } => {
            ask::run(&settings, &provider, &prompt, image.as_deref(), json).await
        }
        Commands::Diagnose { write_template } => diagnose::run(&settings, write_template.as_deref()).await,
        Commands::Flow { action: FlowAction::Update { flow_id, vars, ids, manual } } => {
            flow::run_update(&settings, &flow_id, &vars, &ids, manual).await
        }
        Commands::Templates { out } => templates::run(&settings, out).await,
    }
}

/// Line-oriented prompt reader over stdin
pub(crate) struct Prompter {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompter {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
    
    /// Print `label`, read one trimmed line; `None` at end of input
    pub async fn ask(&mut self, label: &str) -> std::io::Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(label.as_bytes()).await?;
        stdout.flush().await?;
        Ok(self.lines.next_line().await?.map(|line| line.trim().to_string()))
    }
}

/// First `max` characters followed by `...` when longer
pub(crate) fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Split a comma-separated answer into trimmed, non-empty items
pub(crate) fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
