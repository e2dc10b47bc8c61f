//! CRM (GoHighLevel) data models
//!
//! Only the fields the analyzer reads are modelled; everything else in the
//! payloads is ignored.

use serde::{Deserialize, Serialize};

/// A CRM contact
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(default)]
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub source: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Opportunities attached to the contact, when the API includes them
    #[serde(default)]
    pub opportunities: Vec<serde_json::Value>,
    pub date_added: Option<String>,
}

impl Contact {
    pub fn has_opportunities(&self) -> bool {
        !self.opportunities.is_empty()
    }
}

/// One page of the contact listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactsPage {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

/// Listing metadata carrying the continuation cursor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: Option<u64>,
    /// Cursor for the next page; the API returns strings or numbers
    pub start_after: Option<serde_json::Value>,
}

impl PageMeta {
    /// Cursor as a query-string value
    pub fn cursor(&self) -> Option<String> {
        match self.start_after.as_ref()? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Opportunity pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stages: Vec<PipelineStage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineStage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelinesResponse {
    #[serde(default)]
    pub pipelines: Vec<Pipeline>,
}

/// Automation workflow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowsResponse {
    #[serde(default)]
    pub workflows: Vec<Workflow>,
}

/// Result of the CRM analysis step
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CrmAnalysis {
    pub total_contacts: usize,
    pub active_pipelines: usize,
    /// Number of automation workflows
    pub automation_count: usize,
    /// Percentage of contacts that have at least one opportunity
    pub conversion_rate: f64,
    pub recommendations: Vec<String>,
    pub quick_wins: Vec<String>,
    pub infrastructure_gaps: Vec<String>,
    /// Present when the analysis ran degraded (missing credentials, model failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub timestamp: String,
}
