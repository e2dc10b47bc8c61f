//! Agency operations CLI
//! 
//! Loads settings from the environment, installs logging and runs the
//! selected command

use agencyops::cli::{self, Cli};
use agencyops::config::Settings;
use agencyops::utils::logging::init_logging;
use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    
    let mut settings = match Settings::new().context("Failed to load settings") {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("[ERROR] {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    cli.apply_overrides(&mut settings);
    
    // Keep the guard alive so buffered file logs are flushed on exit
    let _guard = init_logging(&settings.logging, &settings.paths.log_dir);
    info!("{}", agencyops::version_info());
    
    match cli::run(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("\n[ERROR] {:#}", e);
            ExitCode::FAILURE
        }
    }
}
