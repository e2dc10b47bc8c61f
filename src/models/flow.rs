//! Flow automation API models

use serde::{Deserialize, Serialize};

/// A configurable flow variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConfiguration {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(rename = "type", default = "default_variable_type")]
    pub variable_type: String,
}

fn default_variable_type() -> String {
    "string".to_string()
}

/// Flow document; unknown fields are preserved for whole-flow updates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Flow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub configurations: Vec<FlowConfiguration>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Some endpoints wrap the flow in `{"flow": {...}}`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FlowEnvelope {
    Wrapped { flow: Flow },
    Bare(Flow),
}

impl FlowEnvelope {
    pub fn into_flow(self) -> Flow {
        match self {
            FlowEnvelope::Wrapped { flow } => flow,
            FlowEnvelope::Bare(flow) => flow,
        }
    }
}

/// Body of a configuration PATCH
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationPatch {
    pub configurations: Vec<ConfigurationValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigurationValue {
    pub id: String,
    pub value: String,
    #[serde(rename = "type")]
    pub variable_type: String,
}

/// An operator-supplied variable value
#[derive(Debug, Clone, PartialEq)]
pub struct VariableUpdate {
    pub name: String,
    /// Variable id, when known
    pub id: Option<String>,
    pub value: String,
    /// Mask the value whenever it is displayed
    pub secret: bool,
}

impl VariableUpdate {
    /// Parse `NAME=VALUE` or `NAME=VALUE:secret`
    pub fn parse(raw: &str) -> Option<Self> {
        let (name, value) = raw.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let (value, secret) = match value.strip_suffix(":secret") {
            Some(v) => (v, true),
            None => (value, false),
        };
        Some(Self {
            name: name.to_string(),
            id: None,
            value: value.to_string(),
            secret,
        })
    }
    
    /// Value as it may be shown on screen or in logs
    pub fn display_value(&self) -> String {
        if self.secret {
            crate::utils::logging::mask_secret(Some(&self.value))
        } else {
            self.value.clone()
        }
    }
}

/// Outcome of an update attempt
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FlowUpdateReport {
    pub updater: String,
    pub flow_id: String,
    /// Names of variables that were written
    pub updated: Vec<String>,
    /// Names that could not be resolved
    pub skipped: Vec<String>,
    /// Endpoint that accepted the write
    pub endpoint: Option<String>,
}
