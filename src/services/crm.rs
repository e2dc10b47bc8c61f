//! CRM (GoHighLevel) client and analyzer
//!
//! Every request goes through the CRM rate limiter. The contact listing is
//! walked by the [`Paginator`]; pipelines and workflows are single requests.

use crate::config::{CrmConfig, RateLimitConfig};
use crate::models::crm::*;
use crate::models::ProviderKind;
use crate::providers::GenerateRequest;
use crate::services::dispatcher::Dispatcher;
use crate::services::extract;
use crate::services::paginator::{Page, PageSource, Paginator};
use crate::services::rate_limiter::RateLimiter;
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Contacts sent to the model for analysis
const CONTACTS_FOR_ANALYSIS: usize = 50;

/// CRM REST client
pub struct CrmClient {
    client: Client,
    api_key: String,
    location_id: String,
    base_url: String,
    api_version: String,
    page_limit: usize,
    max_pages: usize,
    limiter: Arc<RateLimiter>,
}

/// Everything fetched for one analysis
#[derive(Debug, Default)]
pub struct CrmSnapshot {
    pub contacts: Vec<Contact>,
    pub pipelines: Vec<Pipeline>,
    pub workflows: Vec<Workflow>,
    /// Contact listing ended early
    pub partial_error: Option<String>,
}

impl CrmSnapshot {
    /// Percentage of contacts with at least one opportunity
    pub fn conversion_rate(&self) -> f64 {
        if self.contacts.is_empty() || self.pipelines.is_empty() {
            return 0.0;
        }
        let with_opportunities = self.contacts.iter().filter(|c| c.has_opportunities()).count();
        with_opportunities as f64 / self.contacts.len() as f64 * 100.0
    }
}

impl CrmClient {
    /// Create a client; fails when the key or location id is missing
    pub fn new(config: &CrmConfig, limits: &RateLimitConfig) -> AppResult<Self> {
        let limiter = Arc::new(RateLimiter::from_config("GHL", limits)?);
        Self::with_limiter(config, limiter)
    }
    
    /// Create a client sharing an existing limiter
    pub fn with_limiter(config: &CrmConfig, limiter: Arc<RateLimiter>) -> AppResult<Self> {
        let (api_key, location_id) = match (&config.api_key, &config.location_id) {
            (Some(key), Some(location)) => (key.clone(), location.clone()),
            _ => return Err(AppError::ClientNotInitialized("GHL".to_string())),
        };
        
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(concat!("agencyops/", env!("CARGO_PKG_VERSION")))
            .build()?;
        
        Ok(Self {
            client,
            api_key,
            location_id,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            page_limit: config.page_limit,
            max_pages: config.max_pages,
            limiter,
        })
    }
    
    pub fn location_id(&self) -> &str {
        &self.location_id
    }
    
    /// Rate-limited authenticated GET
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> AppResult<T> {
        self.limiter.admit().await;
        
        let url = format!("{}{}", self.base_url, path);
        debug!("GHL GET {}", url);
        
        let response = self.client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Version", &self.api_version)
            .header("Content-Type", "application/json")
            .query(query)
            .send()
            .await?;
        
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi {
                status: status.as_u16(),
                message,
            });
        }
        
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
    
    /// Every contact, walked page by page; failures keep the partial list
    pub async fn fetch_all_contacts(&self) -> (Vec<Contact>, Option<AppError>) {
        info!("Fetching contacts from GHL API...");
        // The client's own limiter already spaces each request
        let paginator = Paginator::new(self.page_limit, self.max_pages);
        let result = paginator.collect(self, None).await;
        info!("Fetched {} total contacts in {} request(s)", result.items.len(), result.requests);
        (result.items, result.error)
    }
    
    /// All opportunity pipelines
    pub async fn fetch_pipelines(&self) -> AppResult<Vec<Pipeline>> {
        let response: PipelinesResponse = self
            .get("/opportunities/pipelines", &[("locationId", self.location_id.clone())])
            .await?;
        Ok(response.pipelines)
    }
    
    /// All automation workflows
    pub async fn fetch_workflows(&self) -> AppResult<Vec<Workflow>> {
        let response: WorkflowsResponse = self
            .get("/workflows/", &[("locationId", self.location_id.clone())])
            .await?;
        Ok(response.workflows)
    }
    
    /// Fetch the location record; doubles as a credential check
    pub async fn fetch_location(&self) -> AppResult<serde_json::Value> {
        self.get(&format!("/locations/{}", self.location_id), &[]).await
    }
    
    /// Contacts, pipelines and workflows; a failed listing yields an empty list
    pub async fn snapshot(&self) -> CrmSnapshot {
        let (contacts, contacts_error) = self.fetch_all_contacts().await;
        
        let pipelines = self.fetch_pipelines().await.unwrap_or_else(|e| {
            error!("Error fetching pipelines: {}", e);
            Vec::new()
        });
        info!("Fetched {} pipelines", pipelines.len());
        
        let workflows = self.fetch_workflows().await.unwrap_or_else(|e| {
            error!("Error fetching workflows: {}", e);
            Vec::new()
        });
        info!("Fetched {} workflows", workflows.len());
        
        CrmSnapshot {
            contacts,
            pipelines,
            workflows,
            partial_error: contacts_error.map(|e| e.to_string()),
        }
    }
}

#[async_trait]
impl PageSource for CrmClient {
    type Item = Contact;
    
    async fn fetch_page(&self, cursor: Option<&str>, page_size: usize) -> AppResult<Page<Contact>> {
        let mut query = vec![
            ("locationId", self.location_id.clone()),
            ("limit", page_size.to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("startAfter", cursor.to_string()));
        }
        
        let page: ContactsPage = self.get("/contacts/", &query).await?;
        Ok(Page {
            next_cursor: page.meta.as_ref().and_then(PageMeta::cursor),
            items: page.contacts,
        })
    }
}

/// Analyzes CRM infrastructure with the help of a model
pub struct CrmAnalyzer {
    client: Option<CrmClient>,
    dispatcher: Arc<Dispatcher>,
    provider: ProviderKind,
}

impl CrmAnalyzer {
    /// `client` is `None` when CRM credentials are missing
    pub fn new(client: Option<CrmClient>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            client,
            dispatcher,
            provider: ProviderKind::Claude,
        }
    }
    
    /// Use a provider other than Claude for the analysis prompt
    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }
    
    pub fn client(&self) -> Option<&CrmClient> {
        self.client.as_ref()
    }
    
    /// Fetch CRM data and ask the model for recommendations
    pub async fn analyze_infrastructure(&self) -> AppResult<CrmAnalysis> {
        info!("Starting CRM infrastructure analysis");
        let timestamp = Local::now().to_rfc3339();
        
        let client = match &self.client {
            Some(client) => client,
            None => {
                warn!("GHL API key or Location ID not configured");
                return Ok(CrmAnalysis {
                    note: Some("GHL API key or Location ID not configured".to_string()),
                    timestamp,
                    ..Default::default()
                });
            }
        };
        
        let snapshot = client.snapshot().await;
        let mut analysis = CrmAnalysis {
            total_contacts: snapshot.contacts.len(),
            active_pipelines: snapshot.pipelines.len(),
            automation_count: snapshot.workflows.len(),
            conversion_rate: snapshot.conversion_rate(),
            note: snapshot.partial_error.as_ref().map(|e| format!("Contact listing incomplete: {}", e)),
            timestamp,
            ..Default::default()
        };
        
        let prompt = build_analysis_prompt(&snapshot)?;
        match self.dispatcher.complete(self.provider, &GenerateRequest::prompt(prompt)).await {
            Ok(response) => {
                analysis.recommendations = extract::list_items(&response.response, 10);
                analysis.quick_wins = extract::list_items(&response.response, 5);
                analysis.infrastructure_gaps = extract::list_items(&response.response, 5);
            }
            Err(e) => {
                warn!("CRM recommendations unavailable: {}", e);
                let note = format!("Recommendations unavailable: {}", e);
                analysis.note = Some(match analysis.note.take() {
                    Some(existing) => format!("{}; {}", existing, note),
                    None => note,
                });
            }
        }
        
        Ok(analysis)
    }
}

fn build_analysis_prompt(snapshot: &CrmSnapshot) -> AppResult<String> {
    let data = serde_json::json!({
        "contact_count": snapshot.contacts.len(),
        "pipeline_count": snapshot.pipelines.len(),
        "workflow_count": snapshot.workflows.len(),
        "conversion_rate": snapshot.conversion_rate(),
        "contacts": snapshot.contacts.iter().take(CONTACTS_FOR_ANALYSIS).collect::<Vec<_>>(),
        "pipelines": snapshot.pipelines,
        "workflows": snapshot.workflows,
    });
    
    Ok(format!(
        "Analyze this Go High Level CRM infrastructure and provide recommendations:\n\n\
         CRM Data:\n{}\n\n\
         Provide:\n\
         1. Key metrics summary\n\
         2. Infrastructure gaps (missing pipelines, automations, etc.)\n\
         3. Quick wins (easy improvements with high impact)\n\
         4. Long-term recommendations\n\
         5. Automation opportunities\n\
         6. Lead flow optimization\n\n\
         Return each item as a bullet point.",
        serde_json::to_string_pretty(&data)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    
    #[test]
    fn test_conversion_rate() {
        let mut snapshot = CrmSnapshot::default();
        assert_eq!(snapshot.conversion_rate(), 0.0);
        
        snapshot.contacts = vec![
            Contact { opportunities: vec![json!({"id": "o1"})], ..Default::default() },
            Contact::default(),
            Contact::default(),
            Contact { opportunities: vec![json!({"id": "o2"})], ..Default::default() },
        ];
        // No pipelines, no conversion figure
        assert_eq!(snapshot.conversion_rate(), 0.0);
        
        snapshot.pipelines = vec![Pipeline::default()];
        assert_eq!(snapshot.conversion_rate(), 50.0);
    }
    
    #[test]
    fn test_missing_credentials() {
        let config = CrmConfig {
            api_key: Some("pit-key".to_string()),
            location_id: None,
            base_url: "https://services.leadconnectorhq.com".to_string(),
            api_version: "2021-07-28".to_string(),
            page_limit: 100,
            max_pages: 50,
            timeout: 30,
        };
        let limits = RateLimitConfig { calls_per_minute: 100, calls_per_second: 5 };
        assert!(matches!(
            CrmClient::new(&config, &limits),
            Err(AppError::ClientNotInitialized(_))
        ));
    }
    
    #[test]
    fn test_prompt_caps_contacts() {
        let snapshot = CrmSnapshot {
            contacts: (0..120).map(|i| Contact { id: format!("c{}", i), ..Default::default() }).collect(),
            ..Default::default()
        };
        let prompt = build_analysis_prompt(&snapshot).unwrap();
        assert!(prompt.contains("\"c49\""));
        assert!(!prompt.contains("\"c50\""));
        assert!(prompt.contains("\"contact_count\": 120"));
    }
}
