//! CRM client and analyzer tests against a mock GHL server

use agencyops::config::{CrmConfig, ProviderConfig, RateLimitConfig};
use agencyops::providers::AnthropicProvider;
use agencyops::services::crm::{CrmAnalyzer, CrmClient};
use agencyops::services::Dispatcher;
use httpmock::prelude::*;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

const LIMITS: RateLimitConfig = RateLimitConfig { calls_per_minute: 1000, calls_per_second: 1000 };

fn create_test_config(server: &MockServer) -> CrmConfig {
    CrmConfig {
        api_key: Some("pit-test-key".to_string()),
        location_id: Some("loc_test".to_string()),
        base_url: server.base_url(),
        api_version: "2021-07-28".to_string(),
        page_limit: 100,
        max_pages: 50,
        timeout: 30,
    }
}

/// `count` contacts starting at `offset`; every fourth one has an opportunity
fn contacts(offset: usize, count: usize) -> Vec<Value> {
    (offset..offset + count)
        .map(|i| {
            let opportunities = if i % 4 == 0 { json!([{"id": format!("opp{}", i)}]) } else { json!([]) };
            json!({"id": format!("c{}", i), "firstName": "Lead", "opportunities": opportunities})
        })
        .collect()
}

/// Contacts 100/100/50 across three pages, two pipelines, one workflow
async fn mount_crm(server: &MockServer) -> (httpmock::Mock<'_>, httpmock::Mock<'_>) {
    // More specific mocks first
    server.mock_async(|when, then| {
        when.method(GET).path("/contacts/").query_param("startAfter", "c199");
        then.status(200).json_body(json!({"contacts": contacts(200, 50), "meta": {"total": 250, "startAfter": "c249"}}));
    }).await;
    server.mock_async(|when, then| {
        when.method(GET).path("/contacts/").query_param("startAfter", "c99");
        then.status(200).json_body(json!({"contacts": contacts(100, 100), "meta": {"total": 250, "startAfter": "c199"}}));
    }).await;
    let first_page = server.mock_async(|when, then| {
        when.method(GET)
            .path("/contacts/")
            .query_param("locationId", "loc_test")
            .query_param("limit", "100")
            .header("Authorization", "Bearer pit-test-key")
            .header("Version", "2021-07-28");
        then.status(200).json_body(json!({"contacts": contacts(0, 100), "meta": {"total": 250, "startAfter": "c99"}}));
    }).await;
    let pipelines = server.mock_async(|when, then| {
        when.method(GET).path("/opportunities/pipelines").query_param("locationId", "loc_test");
        then.status(200).json_body(json!({"pipelines": [
            {"id": "p1", "name": "Sales", "stages": [{"id": "s1", "name": "New"}]},
            {"id": "p2", "name": "Onboarding", "stages": []}
        ]}));
    }).await;
    server.mock_async(|when, then| {
        when.method(GET).path("/workflows/");
        then.status(200).json_body(json!({"workflows": [{"id": "w1", "name": "Nurture", "status": "published"}]}));
    }).await;
    (first_page, pipelines)
}

#[tokio::test]
async fn test_snapshot_walks_all_pages() {
    let server = MockServer::start_async().await;
    let (first_page, pipelines) = mount_crm(&server).await;
    
    let client = CrmClient::new(&create_test_config(&server), &LIMITS).unwrap();
    let snapshot = client.snapshot().await;
    
    assert_eq!(snapshot.contacts.len(), 250);
    assert_eq!(snapshot.pipelines.len(), 2);
    assert_eq!(snapshot.workflows.len(), 1);
    assert!(snapshot.partial_error.is_none());
    // c0, c4, ... c248: 63 of 250
    assert!((snapshot.conversion_rate() - 25.2).abs() < 1e-9);
    
    // The cursor-bearing requests also match the generic mock's filters,
    // so only the first page lands on it
    first_page.assert_hits_async(1).await;
    pipelines.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_failed_page_keeps_partial_contacts() {
    let server = MockServer::start_async().await;
    server.mock_async(|when, then| {
        when.method(GET).path("/contacts/").query_param("startAfter", "c99");
        then.status(500).body("upstream error");
    }).await;
    server.mock_async(|when, then| {
        when.method(GET).path("/contacts/");
        then.status(200).json_body(json!({"contacts": contacts(0, 100), "meta": {"startAfter": "c99"}}));
    }).await;
    
    let client = CrmClient::new(&create_test_config(&server), &LIMITS).unwrap();
    let (contacts, error) = client.fetch_all_contacts().await;
    
    assert_eq!(contacts.len(), 100);
    assert!(error.unwrap().to_string().contains("500"));
}

#[tokio::test]
async fn test_analysis_with_model_recommendations() {
    let server = MockServer::start_async().await;
    mount_crm(&server).await;
    let claude = server.mock_async(|when, then| {
        when.method(POST).path("/v1/messages").body_contains("contact_count");
        then.status(200).json_body(json!({
            "id": "msg_1",
            "content": [{"type": "text", "text": "- Add a follow-up workflow for new leads\n- Create a reactivation pipeline for old contacts\n- Tag contacts by lead source consistently"}],
            "model": "claude-sonnet-4-20250514",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 900, "output_tokens": 60}
        }));
    }).await;
    
    let provider = AnthropicProvider::new(&ProviderConfig {
        api_key: Some("sk-ant-test".to_string()),
        key_source: Some("ANTHROPIC_API_KEY".to_string()),
        base_url: server.base_url(),
        model: "claude-sonnet-4-20250514".to_string(),
        vision_model: None,
        max_tokens: 1024,
    }, 30).unwrap();
    let dispatcher = Arc::new(Dispatcher::new(HashMap::new()).with_provider(Arc::new(provider)));
    
    let client = CrmClient::new(&create_test_config(&server), &LIMITS).unwrap();
    let analysis = CrmAnalyzer::new(Some(client), dispatcher).analyze_infrastructure().await.unwrap();
    
    claude.assert_hits_async(1).await;
    assert_eq!(analysis.total_contacts, 250);
    assert_eq!(analysis.active_pipelines, 2);
    assert_eq!(analysis.automation_count, 1);
    assert_eq!(analysis.recommendations.len(), 3);
    assert!(analysis.note.is_none());
}

#[tokio::test]
async fn test_analysis_survives_model_failure() {
    let server = MockServer::start_async().await;
    mount_crm(&server).await;
    
    // No provider registered, so the model call fails
    let dispatcher = Arc::new(Dispatcher::new(HashMap::new()));
    let client = CrmClient::new(&create_test_config(&server), &LIMITS).unwrap();
    let analysis = CrmAnalyzer::new(Some(client), dispatcher).analyze_infrastructure().await.unwrap();
    
    assert_eq!(analysis.total_contacts, 250);
    assert_eq!(analysis.active_pipelines, 2);
    assert!(analysis.recommendations.is_empty());
    assert!(analysis.quick_wins.is_empty());
    assert!(analysis.note.unwrap().contains("Recommendations unavailable"));
}

#[tokio::test]
async fn test_analysis_without_credentials() {
    let dispatcher = Arc::new(Dispatcher::new(HashMap::new()));
    let analysis = CrmAnalyzer::new(None, dispatcher).analyze_infrastructure().await.unwrap();
    
    assert_eq!(analysis.total_contacts, 0);
    assert_eq!(analysis.active_pipelines, 0);
    assert_eq!(analysis.conversion_rate, 0.0);
    assert!(analysis.note.unwrap().contains("not configured"));
}
