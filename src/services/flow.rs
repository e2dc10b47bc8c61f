//! Flow variable updaters
//!
//! The flow API is speculative: endpoint shapes are tried in order until one
//! answers 200. When no API path works, [`ManualFlowUpdater`] walks the
//! operator through the web UI behind the same trait. Values only ever come
//! from the caller.

use crate::config::FlowConfig;
use crate::models::flow::*;
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Path prefixes tried for every flow request
const PREFIXES: [&str; 3] = ["", "/v1", "/api"];

/// Something that can write flow variables
#[async_trait]
pub trait FlowVariableUpdater: Send + Sync {
    fn name(&self) -> &str;
    
    async fn update(&self, flow_id: &str, updates: &[VariableUpdate]) -> AppResult<FlowUpdateReport>;
}

/// REST updater against the flow API
pub struct RestFlowUpdater {
    client: Client,
    api_key: String,
    base_url: String,
}

impl RestFlowUpdater {
    /// Create an updater; fails without an API key
    pub fn new(config: &FlowConfig) -> AppResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::ClientNotInitialized("Postman".to_string()))?;
        
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("agencyops/", env!("CARGO_PKG_VERSION")))
            .build()?;
        
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
    
    fn flow_urls(&self, flow_id: &str, suffix: &str) -> Vec<String> {
        PREFIXES
            .iter()
            .map(|prefix| format!("{}{}/flows/{}{}", self.base_url, prefix, flow_id, suffix))
            .collect()
    }
    
    /// Fetch the flow from the first endpoint that answers 200
    pub async fn get_flow(&self, flow_id: &str) -> AppResult<Flow> {
        for url in self.flow_urls(flow_id, "") {
            let response = match self.client.get(&url).header("X-Api-Key", &self.api_key).send().await {
                Ok(response) => response,
                Err(e) => {
                    debug!("GET {} failed: {}", url, e);
                    continue;
                }
            };
            
            if response.status() == StatusCode::OK {
                let body = response.text().await?;
                let envelope: FlowEnvelope = serde_json::from_str(&body)?;
                debug!("Flow fetched from {}", url);
                return Ok(envelope.into_flow());
            }
            debug!("GET {} answered {}", url, response.status());
        }
        
        Err(AppError::NotFound(
            "Flow not found. Flows may not have a public API endpoint; update variables manually in the web UI."
                .to_string(),
        ))
    }
    
    /// PATCH configuration values by variable id
    pub async fn update_by_id(&self, flow_id: &str, updates: &[VariableUpdate]) -> AppResult<FlowUpdateReport> {
        let flow = self.get_flow(flow_id).await?;
        
        let mut values = Vec::with_capacity(updates.len());
        for update in updates {
            let id = update.id.clone().ok_or_else(|| {
                AppError::Validation(format!("No variable id given for {}", update.name))
            })?;
            values.push(ConfigurationValue {
                id,
                value: update.value.clone(),
                variable_type: variable_type(update),
            });
        }
        let patch = ConfigurationPatch { configurations: values };
        
        let mut statuses = Vec::new();
        for url in self.flow_urls(flow_id, "/configurations") {
            match self.patch(&url, &patch).await {
                Ok(StatusCode::OK) => {
                    info!("Updated {} variable(s) via {}", updates.len(), url);
                    return Ok(report("rest", flow_id, updates, url));
                }
                Ok(status) => {
                    debug!("PATCH {} answered {}", url, status);
                    statuses.push(status);
                }
                Err(e) => debug!("PATCH {} failed: {}", url, e),
            }
        }
        
        if !statuses.is_empty() && statuses.iter().all(|s| *s == StatusCode::NOT_FOUND) {
            return self.update_whole_flow(flow_id, flow, &patch, updates).await;
        }
        
        Err(AppError::ExternalApi {
            status: statuses.last().map(|s| s.as_u16()).unwrap_or(0),
            message: "No configuration endpoint accepted the update".to_string(),
        })
    }
    
    /// Resolve names to ids from the fetched flow, then update by id
    pub async fn update_by_name(&self, flow_id: &str, updates: &[VariableUpdate]) -> AppResult<FlowUpdateReport> {
        let flow = self.get_flow(flow_id).await?;
        let ids: HashMap<&str, &str> = flow
            .configurations
            .iter()
            .map(|c| (c.name.as_str(), c.id.as_str()))
            .collect();
        
        let mut resolved = Vec::new();
        let mut skipped = Vec::new();
        for update in updates {
            match ids.get(update.name.as_str()) {
                Some(id) => resolved.push(VariableUpdate {
                    id: Some(id.to_string()),
                    ..update.clone()
                }),
                None => {
                    warn!("Variable '{}' not found in flow configurations", update.name);
                    skipped.push(update.name.clone());
                }
            }
        }
        
        if resolved.is_empty() {
            return Err(AppError::Validation("No variables found to update".to_string()));
        }
        
        let mut report = self.update_by_id(flow_id, &resolved).await?;
        report.skipped = skipped;
        Ok(report)
    }
    
    /// Rewrite the configuration list inside the flow and PATCH the whole flow
    async fn update_whole_flow(
        &self,
        flow_id: &str,
        mut flow: Flow,
        patch: &ConfigurationPatch,
        updates: &[VariableUpdate],
    ) -> AppResult<FlowUpdateReport> {
        info!("Configuration endpoints not found, updating the whole flow");
        for config in flow.configurations.iter_mut() {
            if let Some(value) = patch.configurations.iter().find(|v| v.id == config.id) {
                config.value = serde_json::Value::String(value.value.clone());
                config.variable_type = value.variable_type.clone();
            }
        }
        
        let url = format!("{}/flows/{}", self.base_url, flow_id);
        let body = serde_json::json!({ "flow": flow });
        let status = self.patch(&url, &body).await?;
        if status.is_success() {
            Ok(report("rest", flow_id, updates, url))
        } else {
            Err(AppError::ExternalApi {
                status: status.as_u16(),
                message: format!("Whole-flow update rejected at {}", url),
            })
        }
    }
    
    async fn patch<B: serde::Serialize + ?Sized>(&self, url: &str, body: &B) -> AppResult<StatusCode> {
        let response = self.client
            .patch(url)
            .header("X-Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;
        Ok(response.status())
    }
}

#[async_trait]
impl FlowVariableUpdater for RestFlowUpdater {
    fn name(&self) -> &str {
        "rest"
    }
    
    /// By id when every update carries one, falling back to names
    async fn update(&self, flow_id: &str, updates: &[VariableUpdate]) -> AppResult<FlowUpdateReport> {
        if updates.iter().all(|u| u.id.is_some()) {
            match self.update_by_id(flow_id, updates).await {
                Ok(report) => return Ok(report),
                Err(e) => warn!("Update by ID failed: {}; trying by variable name", e),
            }
        }
        self.update_by_name(flow_id, updates).await
    }
}

fn variable_type(update: &VariableUpdate) -> String {
    if update.secret { "secret" } else { "string" }.to_string()
}

fn report(updater: &str, flow_id: &str, updates: &[VariableUpdate], endpoint: String) -> FlowUpdateReport {
    FlowUpdateReport {
        updater: updater.to_string(),
        flow_id: flow_id.to_string(),
        updated: updates.iter().map(|u| u.name.clone()).collect(),
        skipped: Vec::new(),
        endpoint: Some(endpoint),
    }
}

/// Operator-guided update through the web UI
pub struct ManualFlowUpdater {
    web_url: String,
    input: Arc<Mutex<Box<dyn BufRead + Send>>>,
    output: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl ManualFlowUpdater {
    /// Prompt on stdout, confirm on stdin
    pub fn new(web_url: &str) -> Self {
        Self::with_io(
            web_url,
            Box::new(std::io::BufReader::new(std::io::stdin())),
            Box::new(std::io::stdout()),
        )
    }
    
    pub fn with_io(web_url: &str, input: Box<dyn BufRead + Send>, output: Box<dyn Write + Send>) -> Self {
        Self {
            web_url: web_url.trim_end_matches('/').to_string(),
            input: Arc::new(Mutex::new(input)),
            output: Arc::new(Mutex::new(output)),
        }
    }
    
    /// Step-by-step instructions with secret values masked
    pub fn instructions(&self, flow_id: &str, updates: &[VariableUpdate]) -> String {
        let mut lines = vec![
            "=".repeat(60),
            "MANUAL UPDATE INSTRUCTIONS".to_string(),
            "=".repeat(60),
            format!("1. Go to: {}/flows/{}", self.web_url, flow_id),
            "2. Open the Flow".to_string(),
            "3. Click on the Configuration panel".to_string(),
            "4. Update the following variables:".to_string(),
        ];
        for update in updates {
            lines.push(format!(
                "   - {}: {} ({})",
                update.name,
                update.display_value(),
                variable_type(update)
            ));
        }
        lines.push("5. Save the flow".to_string());
        lines.join("\n")
    }
}

#[async_trait]
impl FlowVariableUpdater for ManualFlowUpdater {
    fn name(&self) -> &str {
        "manual"
    }
    
    async fn update(&self, flow_id: &str, updates: &[VariableUpdate]) -> AppResult<FlowUpdateReport> {
        let text = self.instructions(flow_id, updates);
        let input = Arc::clone(&self.input);
        let output = Arc::clone(&self.output);
        
        // Terminal I/O blocks, keep it off the runtime threads
        let (read, answer) = tokio::task::spawn_blocking(move || confirm(&input, &output, &text))
            .await
            .map_err(|e| AppError::Internal(format!("confirmation task failed: {}", e)))??;
        
        let answer = answer.trim().to_lowercase();
        if read == 0 || answer == "n" || answer == "no" {
            return Err(AppError::Validation("Manual update not confirmed".to_string()));
        }
        
        Ok(FlowUpdateReport {
            updater: "manual".to_string(),
            flow_id: flow_id.to_string(),
            updated: updates.iter().map(|u| u.name.clone()).collect(),
            skipped: Vec::new(),
            endpoint: Some(format!("{}/flows/{}", self.web_url, flow_id)),
        })
    }
}

/// Print the instructions and read one answer line
fn confirm(
    input: &Mutex<Box<dyn BufRead + Send>>,
    output: &Mutex<Box<dyn Write + Send>>,
    text: &str,
) -> AppResult<(usize, String)> {
    {
        let mut output = output.lock().map_err(|_| AppError::Internal("output lock poisoned".to_string()))?;
        writeln!(output, "{}", text)?;
        write!(output, "Press Enter once the variables are saved (type 'no' to abort): ")?;
        output.flush()?;
    }
    
    let mut answer = String::new();
    let read = input
        .lock()
        .map_err(|_| AppError::Internal("input lock poisoned".to_string()))?
        .read_line(&mut answer)?;
    Ok((read, answer))
}

/// Try each updater in order; first success wins
pub async fn update_with_fallbacks(
    updaters: &[Box<dyn FlowVariableUpdater>],
    flow_id: &str,
    updates: &[VariableUpdate],
) -> AppResult<FlowUpdateReport> {
    let mut last_error = AppError::Validation("No flow updater available".to_string());
    for updater in updaters {
        info!("Updating flow {} with the {} updater", flow_id, updater.name());
        match updater.update(flow_id, updates).await {
            Ok(report) => return Ok(report),
            Err(e) => {
                warn!("{} updater failed: {}", updater.name(), e);
                last_error = e;
            }
        }
    }
    Err(last_error)
}
