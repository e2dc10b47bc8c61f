//! Logging utilities
//!
//! Subscriber setup (console + daily-rotated file) and small helpers for
//! keeping secrets and long model output out of log lines

use crate::config::LoggingConfig;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log file prefix; the appender adds the `.YYYY-MM-DD` suffix
pub const LOG_FILE_PREFIX: &str = "agencyops.log";

/// Initialize the global subscriber.
///
/// Returns the guard of the non-blocking file writer; dropping it flushes
/// and closes the file, so the caller keeps it alive for the whole run.
pub fn init_logging(config: &LoggingConfig, log_dir: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = config.format == "json";
    
    let (file_layer, guard) = match std::fs::create_dir_all(log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("WARNING: cannot create log directory {:?}: {} (console logging only)", log_dir, e);
            (None, None)
        }
    };
    
    // Human readable format for the console unless JSON was requested
    let text_console = (!json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
    });
    let json_console = json.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(false)
            .with_span_list(false)
    });
    
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(text_console)
        .with(json_console)
        .with(file_layer)
        .try_init();
    
    if let Err(e) = installed {
        eprintln!("WARNING: logging already initialized: {}", e);
    }
    
    guard
}

/// Truncate a string with a note about original length
pub fn truncate_for_log(s: &str, max_chars: usize) -> String {
    let total = s.chars().count();
    if total > max_chars {
        let head: String = s.chars().take(max_chars).collect();
        format!("{}... ({} chars truncated)", head, total - max_chars)
    } else {
        s.to_string()
    }
}

/// Mask a secret, keeping only its last four characters
pub fn mask_secret(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => {
            let tail: String = v.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            format!("{}{}", "*".repeat(20), tail)
        }
        _ => "NOT SET".to_string(),
    }
}

/// Show the first ten characters of a value followed by an ellipsis
pub fn mask_prefix(value: &str) -> String {
    if value.chars().count() > 10 {
        let head: String = value.chars().take(10).collect();
        format!("{}...", head)
    } else {
        value.to_string()
    }
}
