//! Connectivity diagnostics
//!
//! Checks the environment, local ports, the Docker engine and the n8n and CRM
//! APIs. Every probe yields a [`CheckResult`]; no probe aborts the run.

use crate::config::CrmConfig;
use crate::services::crm::CrmClient;
use crate::services::rate_limiter::RateLimiter;
use crate::utils::error::{AppError, AppResult};
use crate::utils::logging::mask_prefix;
use chrono::Local;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::{debug, info};

/// Variables reported by the environment check
pub const DIAGNOSTIC_VARS: [&str; 8] = [
    "N8N_API_KEY",
    "N8N_API_URL",
    "N8N_HOST",
    "N8N_BASE_URL",
    "GHL_API_KEY",
    "GHL_LOCATION_ID",
    "GHL_BASE_URL",
    "DOCKER_HOST",
];

pub const DEFAULT_N8N_URL: &str = "http://localhost:5678";
pub const N8N_PORT: u16 = 5678;

/// Limits for the single location request
const CRM_CALLS_PER_MINUTE: u32 = 100;
const CRM_CALLS_PER_SECOND: u32 = 5;

pub const ENV_TEMPLATE: &str = "# n8n Configuration
N8N_API_KEY=your-n8n-api-key-here
N8N_API_URL=http://localhost:5678
# For Docker: N8N_API_URL=http://host.docker.internal:5678

# GHL (GoHighLevel) Configuration
GHL_API_KEY=your-ghl-api-key-here
GHL_LOCATION_ID=your-location-id-here
GHL_BASE_URL=https://services.leadconnectorhq.com

# Optional Docker configuration
# DOCKER_HOST=tcp://localhost:2375
";

/// Outcome of a single probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { name: name.into(), passed: true, detail: detail.into() }
    }
    
    pub fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { name: name.into(), passed: false, detail: detail.into() }
    }
    
    /// `[✓] name: PASS` followed by the detail line
    pub fn render(&self) -> String {
        let (icon, status) = if self.passed { ("✓", "PASS") } else { ("✗", "FAIL") };
        let mut line = format!("  [{}] {}: {}", icon, self.name, status);
        if !self.detail.is_empty() {
            line.push_str(&format!("\n      → {}", self.detail));
        }
        line
    }
}

/// Titled group of checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub checks: Vec<CheckResult>,
    /// Free-form notes such as skipped probes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Full diagnostics run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub timestamp: String,
    pub sections: Vec<ReportSection>,
    pub recommendations: Vec<String>,
}

impl DiagnosticReport {
    pub fn failures(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| s.checks.iter())
            .filter(|c| !c.passed)
            .count()
    }
    
    pub fn render(&self) -> String {
        let mut out = vec![
            header("DOCKER API ENVIRONMENT DEBUGGER"),
            format!(" Run time: {}", self.timestamp),
        ];
        for section in &self.sections {
            out.push(header(&section.title));
            out.extend(section.checks.iter().map(CheckResult::render));
            out.extend(section.notes.iter().map(|n| format!("  ⚠️  {}", n)));
        }
        out.push(header("RECOMMENDATIONS"));
        if self.recommendations.is_empty() {
            out.push("  ✓ No critical issues detected!".to_string());
            out.push("    If still experiencing problems:".to_string());
            out.push("    - Reopen your terminal to reload environment variables".to_string());
            out.push("    - Restart Docker Desktop".to_string());
            out.push("    - Regenerate API keys and update configuration".to_string());
        } else {
            out.push("  Issues found and recommendations:".to_string());
            for (i, rec) in self.recommendations.iter().enumerate() {
                out.push(format!("\n  {}. {}", i + 1, rec));
            }
        }
        out.join("\n")
    }
}

fn header(title: &str) -> String {
    format!("\n{}\n {}\n{}", "=".repeat(60), title, "=".repeat(60))
}

/// A TCP endpoint to probe
#[derive(Debug, Clone)]
pub struct PortTarget {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl PortTarget {
    pub fn new(name: &str, host: &str, port: u16) -> Self {
        Self { name: name.to_string(), host: host.to_string(), port }
    }
}

/// Default n8n port targets
pub fn default_port_targets() -> Vec<PortTarget> {
    vec![
        PortTarget::new("n8n (localhost)", "localhost", N8N_PORT),
        PortTarget::new("n8n (127.0.0.1)", "127.0.0.1", N8N_PORT),
        PortTarget::new("n8n (Docker internal)", "host.docker.internal", N8N_PORT),
    ]
}

/// Diagnostics runner
pub struct Diagnostics {
    client: Client,
    vars: Vec<(String, Option<String>)>,
    port_targets: Vec<PortTarget>,
    crm: CrmConfig,
    probe_timeout: Duration,
    command_timeout: Duration,
}

impl Diagnostics {
    /// Read the diagnostic variables from the process environment
    pub fn from_env(crm: &CrmConfig) -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), crm)
    }
    
    pub fn from_lookup<F>(lookup: F, crm: &CrmConfig) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = DIAGNOSTIC_VARS
            .iter()
            .map(|key| (key.to_string(), lookup(key).filter(|v| !v.is_empty())))
            .collect();
        
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        
        Ok(Self {
            client,
            vars,
            port_targets: default_port_targets(),
            crm: crm.clone(),
            probe_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(10),
        })
    }
    
    pub fn with_port_targets(mut self, targets: Vec<PortTarget>) -> Self {
        self.port_targets = targets;
        self
    }
    
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }
    
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }
    
    /// n8n base URL: `N8N_API_URL`, then `N8N_BASE_URL`, then localhost
    pub fn n8n_url(&self) -> String {
        self.var("N8N_API_URL")
            .or_else(|| self.var("N8N_BASE_URL"))
            .unwrap_or(DEFAULT_N8N_URL)
            .trim_end_matches('/')
            .to_string()
    }
    
    /// Report which variables are set, with values truncated
    pub fn check_env(&self) -> ReportSection {
        let checks: Vec<CheckResult> = self
            .vars
            .iter()
            .map(|(key, value)| match value {
                Some(v) => CheckResult::pass(key, format!("Set (value: {})", mask_prefix(v))),
                None => CheckResult::fail(key, "Not set"),
            })
            .collect();
        
        let mut notes = Vec::new();
        if checks.iter().all(|c| !c.passed) {
            notes.push("No API environment variables detected; set them in the environment or a .env file".to_string());
        }
        
        ReportSection { title: "ENVIRONMENT VARIABLES CHECK".to_string(), checks, notes }
    }
    
    pub async fn check_network(&self) -> ReportSection {
        let mut checks = Vec::with_capacity(self.port_targets.len());
        for target in &self.port_targets {
            checks.push(probe_port(target, self.probe_timeout).await);
        }
        ReportSection { title: "NETWORK CONNECTIVITY CHECK".to_string(), checks, notes: Vec::new() }
    }
    
    /// `docker info`, then the n8n container listing
    pub async fn check_docker(&self) -> ReportSection {
        let mut checks = Vec::new();
        
        match run_command("docker", &["info"], self.command_timeout).await {
            ProcessOutcome::Completed { success: true, .. } => {
                checks.push(CheckResult::pass("Docker Engine", "Running"));
                
                let args = ["ps", "--filter", "name=n8n", "--format", "{{.Names}}: {{.Status}}"];
                match run_command("docker", &args, self.command_timeout).await {
                    ProcessOutcome::Completed { stdout, .. } if !stdout.trim().is_empty() => {
                        checks.push(CheckResult::pass("n8n Container", stdout.trim()));
                    }
                    _ => checks.push(CheckResult::fail("n8n Container", "No n8n container found running")),
                }
            }
            ProcessOutcome::Completed { stderr, .. } => {
                checks.push(CheckResult::fail("Docker Engine", stderr.trim()));
            }
            ProcessOutcome::NotFound => {
                checks.push(CheckResult::fail("Docker CLI", "Docker command not found in PATH"));
            }
            ProcessOutcome::TimedOut => {
                checks.push(CheckResult::fail("Docker Engine", "Command timed out - Docker may be unresponsive"));
            }
            ProcessOutcome::Failed(e) => {
                checks.push(CheckResult::fail("Docker Engine", format!("Error: {}", e)));
            }
        }
        
        ReportSection { title: "DOCKER STATUS CHECK".to_string(), checks, notes: Vec::new() }
    }
    
    pub async fn check_n8n(&self) -> ReportSection {
        let base = self.n8n_url();
        let endpoints = [
            ("List Workflows", format!("{}/api/v1/workflows", base)),
            ("Health Check", format!("{}/healthz", base)),
            ("List Credentials", format!("{}/api/v1/credentials", base)),
        ];
        
        let mut checks = Vec::new();
        for (name, url) in endpoints {
            let mut request = self.client.get(&url);
            if let Some(key) = self.var("N8N_API_KEY") {
                request = request.header("X-N8N-API-KEY", key);
            }
            
            let check = match request.send().await {
                Ok(response) if response.status().is_success() => {
                    CheckResult::pass(name, format!("HTTP {} - {}", response.status().as_u16(), url))
                }
                Ok(response) => match response.status() {
                    StatusCode::UNAUTHORIZED => CheckResult::fail(name, "HTTP 401 Unauthorized - API key may be invalid"),
                    StatusCode::FORBIDDEN => CheckResult::fail(name, "HTTP 403 Forbidden - Check API permissions"),
                    status => CheckResult::fail(name, format!("HTTP {} - {}", status.as_u16(), url)),
                },
                Err(e) => CheckResult::fail(name, format!("Connection failed: {}", e)),
            };
            checks.push(check);
        }
        
        ReportSection { title: "N8N API TEST".to_string(), checks, notes: Vec::new() }
    }
    
    pub async fn check_crm(&self) -> ReportSection {
        let title = "GHL (GOHIGHLEVEL) API TEST".to_string();
        let Some(key) = self.var("GHL_API_KEY") else {
            return ReportSection {
                title,
                checks: Vec::new(),
                notes: vec!["GHL_API_KEY not set - skipping GHL tests".to_string()],
            };
        };
        
        let name = "GHL API Connection";
        let Some(location) = self.var("GHL_LOCATION_ID") else {
            return ReportSection {
                title,
                checks: vec![CheckResult::fail(name, "GHL_LOCATION_ID not set")],
                notes: Vec::new(),
            };
        };
        
        let mut config = self.crm.clone();
        config.api_key = Some(key.to_string());
        config.location_id = Some(location.to_string());
        if let Some(base) = self.var("GHL_BASE_URL") {
            config.base_url = base.to_string();
        }
        
        let client = RateLimiter::new("GHL", CRM_CALLS_PER_MINUTE, CRM_CALLS_PER_SECOND)
            .and_then(|limiter| CrmClient::with_limiter(&config, Arc::new(limiter)));
        let result = match client {
            Ok(client) => client.fetch_location().await,
            Err(e) => Err(e),
        };
        
        let check = match result {
            Ok(_) => CheckResult::pass(name, format!("Location {} reachable", location)),
            Err(AppError::ExternalApi { status, .. }) => match status {
                401 => CheckResult::fail(name, "HTTP 401 - API key is invalid or expired; regenerate it"),
                403 => CheckResult::fail(name, "HTTP 403 - Check API permissions/scopes"),
                status => CheckResult::fail(name, format!("HTTP {}", status)),
            },
            Err(e) => CheckResult::fail(name, format!("Connection failed: {}", e)),
        };
        
        ReportSection { title, checks: vec![check], notes: Vec::new() }
    }
    
    /// Run every section in order
    pub async fn run(&self) -> DiagnosticReport {
        info!("Running connectivity diagnostics");
        let env = self.check_env();
        let network = self.check_network().await;
        let docker = self.check_docker().await;
        let n8n = self.check_n8n().await;
        let crm = self.check_crm().await;
        
        let recommendations = recommendations(&self.vars, &network.checks);
        
        DiagnosticReport {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            sections: vec![env, network, docker, n8n, crm],
            recommendations,
        }
    }
}

/// Open a TCP connection within the timeout
pub async fn probe_port(target: &PortTarget, timeout: Duration) -> CheckResult {
    let name = format!("{} ({}:{})", target.name, target.host, target.port);
    let address = (target.host.as_str(), target.port);
    
    match tokio::time::timeout(timeout, TcpStream::connect(address)).await {
        Ok(Ok(_)) => CheckResult::pass(name, "Port is open"),
        Ok(Err(e)) => {
            debug!("Connect to {}:{} failed: {}", target.host, target.port, e);
            CheckResult::fail(name, format!("Port closed: {}", e))
        }
        Err(_) => CheckResult::fail(name, "Connection timed out"),
    }
}

enum ProcessOutcome {
    Completed { success: bool, stdout: String, stderr: String },
    NotFound,
    TimedOut,
    Failed(std::io::Error),
}

async fn run_command(program: &str, args: &[&str], timeout: Duration) -> ProcessOutcome {
    let output = Command::new(program).args(args).kill_on_drop(true).output();
    match tokio::time::timeout(timeout, output).await {
        Ok(Ok(output)) => ProcessOutcome::Completed {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        },
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => ProcessOutcome::NotFound,
        Ok(Err(e)) => ProcessOutcome::Failed(e),
        Err(_) => ProcessOutcome::TimedOut,
    }
}

/// Recommendations derived from the environment and port results
pub fn recommendations(vars: &[(String, Option<String>)], network: &[CheckResult]) -> Vec<String> {
    let is_set = |key: &str| vars.iter().any(|(k, v)| k == key && v.is_some());
    let port_ok = |label: &str| network.iter().any(|c| c.passed && c.name.starts_with(label));
    
    let mut recs = Vec::new();
    if !is_set("N8N_API_KEY") {
        recs.push(
            "N8N_API_KEY not set:\n     - Set it in your system environment variables\n     - Or add to .env: N8N_API_KEY=your-api-key-here"
                .to_string(),
        );
    }
    if !is_set("GHL_API_KEY") {
        recs.push(
            "GHL_API_KEY not set:\n     - Set it in your system environment variables\n     - Or add to .env: GHL_API_KEY=your-api-key-here"
                .to_string(),
        );
    }
    
    let localhost_ok = port_ok("n8n (localhost)");
    let docker_internal_ok = port_ok("n8n (Docker internal)");
    if !localhost_ok && !docker_internal_ok {
        recs.push(
            "n8n service not reachable:\n     - Make sure n8n is running (docker start n8n, or n8n start)\n     - Check if port 5678 is blocked by a firewall"
                .to_string(),
        );
    }
    if localhost_ok && !docker_internal_ok {
        recs.push(
            "Docker internal networking issue:\n     - 'host.docker.internal' is not resolving\n     - Use 'localhost' or '127.0.0.1' instead, or enable it in Docker Desktop"
                .to_string(),
        );
    }
    recs
}

/// Write the `.env` template
pub async fn write_env_template(path: &Path) -> AppResult<()> {
    tokio::fs::write(path, ENV_TEMPLATE).await?;
    info!("Created {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    
    fn vars(set: &[&str]) -> Vec<(String, Option<String>)> {
        DIAGNOSTIC_VARS
            .iter()
            .map(|k| (k.to_string(), set.contains(k).then(|| "value".to_string())))
            .collect()
    }
    
    #[test]
    fn test_check_result_render() {
        let pass = CheckResult::pass("Docker Engine", "Running");
        assert_eq!(pass.render(), "  [✓] Docker Engine: PASS\n      → Running");
        
        let fail = CheckResult::fail("n8n Container", "");
        assert_eq!(fail.render(), "  [✗] n8n Container: FAIL");
    }
    
    #[test]
    fn test_recommendations() {
        let all_down = vec![
            CheckResult::fail("n8n (localhost) (localhost:5678)", "closed"),
            CheckResult::fail("n8n (Docker internal) (host.docker.internal:5678)", "closed"),
        ];
        let recs = recommendations(&vars(&[]), &all_down);
        assert_eq!(recs.len(), 3);
        assert!(recs[2].starts_with("n8n service not reachable"));
        
        let localhost_only = vec![
            CheckResult::pass("n8n (localhost) (localhost:5678)", "open"),
            CheckResult::fail("n8n (Docker internal) (host.docker.internal:5678)", "closed"),
        ];
        let recs = recommendations(&vars(&["N8N_API_KEY", "GHL_API_KEY"]), &localhost_only);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].starts_with("Docker internal networking issue"));
        
        let healthy = vec![
            CheckResult::pass("n8n (localhost) (localhost:5678)", "open"),
            CheckResult::pass("n8n (Docker internal) (host.docker.internal:5678)", "open"),
        ];
        assert!(recommendations(&vars(&["N8N_API_KEY", "GHL_API_KEY"]), &healthy).is_empty());
    }
}
