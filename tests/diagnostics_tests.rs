//! Connectivity diagnostics tests

use agencyops::config::CrmConfig;
use agencyops::services::diagnostics::{probe_port, write_env_template, Diagnostics, PortTarget, ENV_TEMPLATE};
use httpmock::prelude::*;
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpListener;

fn create_test_crm_config(base_url: &str) -> CrmConfig {
    CrmConfig {
        api_key: None,
        location_id: None,
        base_url: base_url.to_string(),
        api_version: "2021-07-28".to_string(),
        page_limit: 100,
        max_pages: 50,
        timeout: 30,
    }
}

fn create_test_diagnostics(vars: &[(&str, &str)], crm_base: &str) -> Diagnostics {
    let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    Diagnostics::from_lookup(|key| vars.get(key).cloned(), &create_test_crm_config(crm_base))
        .unwrap()
        .with_port_targets(Vec::new())
        .with_probe_timeout(Duration::from_millis(500))
}

#[tokio::test]
async fn test_probe_open_and_closed_ports() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open_port = listener.local_addr().unwrap().port();
    
    let open = probe_port(&PortTarget::new("n8n (localhost)", "127.0.0.1", open_port), Duration::from_secs(2)).await;
    assert!(open.passed);
    assert_eq!(open.name, format!("n8n (localhost) (127.0.0.1:{})", open_port));
    
    let closed_port = {
        let other = TcpListener::bind("127.0.0.1:0").await.unwrap();
        other.local_addr().unwrap().port()
    };
    let closed = probe_port(&PortTarget::new("n8n (localhost)", "127.0.0.1", closed_port), Duration::from_secs(2)).await;
    assert!(!closed.passed);
}

#[tokio::test]
async fn test_env_check_truncates_values() {
    let diagnostics = create_test_diagnostics(&[("N8N_API_KEY", "n8n-very-long-secret-key"), ("N8N_HOST", "")], "http://127.0.0.1:1");
    let section = diagnostics.check_env();
    
    assert_eq!(section.checks.len(), 8);
    let key = section.checks.iter().find(|c| c.name == "N8N_API_KEY").unwrap();
    assert!(key.passed);
    assert_eq!(key.detail, "Set (value: n8n-very-l...)");
    // Empty counts as unset
    assert!(!section.checks.iter().find(|c| c.name == "N8N_HOST").unwrap().passed);
    assert!(section.notes.is_empty());
    
    let empty = create_test_diagnostics(&[], "http://127.0.0.1:1").check_env();
    assert_eq!(empty.notes.len(), 1);
}

#[tokio::test]
async fn test_n8n_url_precedence() {
    let both = create_test_diagnostics(&[("N8N_API_URL", "http://a:5678/"), ("N8N_BASE_URL", "http://b:5678")], "http://127.0.0.1:1");
    assert_eq!(both.n8n_url(), "http://a:5678");
    
    let base = create_test_diagnostics(&[("N8N_BASE_URL", "http://b:5678")], "http://127.0.0.1:1");
    assert_eq!(base.n8n_url(), "http://b:5678");
    
    assert_eq!(create_test_diagnostics(&[], "http://127.0.0.1:1").n8n_url(), "http://localhost:5678");
}

#[tokio::test]
async fn test_n8n_probes() {
    let server = MockServer::start_async().await;
    let workflows = server.mock_async(|when, then| {
        when.method(GET).path("/api/v1/workflows").header("X-N8N-API-KEY", "n8n-key");
        then.status(200).json_body(serde_json::json!({"data": []}));
    }).await;
    server.mock_async(|when, then| {
        when.method(GET).path("/healthz");
        then.status(200).body("ok");
    }).await;
    server.mock_async(|when, then| {
        when.method(GET).path("/api/v1/credentials");
        then.status(401);
    }).await;
    
    let diagnostics = create_test_diagnostics(&[("N8N_API_KEY", "n8n-key"), ("N8N_API_URL", &server.base_url())], "http://127.0.0.1:1");
    let section = diagnostics.check_n8n().await;
    
    workflows.assert_hits_async(1).await;
    let passed: Vec<bool> = section.checks.iter().map(|c| c.passed).collect();
    assert_eq!(passed, vec![true, true, false]);
    assert_eq!(section.checks[2].detail, "HTTP 401 Unauthorized - API key may be invalid");
}

#[tokio::test]
async fn test_crm_forbidden() {
    let skipped = create_test_diagnostics(&[], "http://127.0.0.1:1").check_crm().await;
    assert!(skipped.checks.is_empty());
    assert!(skipped.notes[0].contains("skipping"));
    
    let server = MockServer::start_async().await;
    let location = server.mock_async(|when, then| {
        when.method(GET)
            .path("/locations/loc_1")
            .header("Authorization", "Bearer pit-key")
            .header("Version", "2021-07-28");
        then.status(403);
    }).await;
    
    let diagnostics = create_test_diagnostics(&[("GHL_API_KEY", "pit-key"), ("GHL_LOCATION_ID", "loc_1")], &server.base_url());
    let section = diagnostics.check_crm().await;
    
    location.assert_hits_async(1).await;
    assert!(!section.checks[0].passed);
    assert!(section.checks[0].detail.contains("403"));
}

#[tokio::test]
async fn test_crm_location_reachable() {
    let server = MockServer::start_async().await;
    let location = server.mock_async(|when, then| {
        when.method(GET)
            .path("/locations/loc_9")
            .header("Authorization", "Bearer pit-key");
        then.status(200).json_body(serde_json::json!({"location": {"id": "loc_9", "name": "Main office"}}));
    }).await;
    
    // GHL_BASE_URL wins over the configured base
    let diagnostics = create_test_diagnostics(
        &[("GHL_API_KEY", "pit-key"), ("GHL_LOCATION_ID", "loc_9"), ("GHL_BASE_URL", &server.base_url())],
        "http://127.0.0.1:1",
    );
    let section = diagnostics.check_crm().await;
    
    location.assert_hits_async(1).await;
    assert!(section.checks[0].passed);
    assert_eq!(section.checks[0].detail, "Location loc_9 reachable");
    
    let no_location = create_test_diagnostics(&[("GHL_API_KEY", "pit-key")], &server.base_url());
    let section = no_location.check_crm().await;
    assert!(!section.checks[0].passed);
    assert_eq!(section.checks[0].detail, "GHL_LOCATION_ID not set");
    location.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_report_counts_failures() {
    let diagnostics = create_test_diagnostics(&[], "http://127.0.0.1:1");
    let report = diagnostics.run().await;
    
    assert_eq!(report.sections.len(), 5);
    // Every variable is unset
    assert!(report.failures() >= 8);
    assert!(report.recommendations.iter().any(|r| r.starts_with("N8N_API_KEY not set")));
    assert!(report.recommendations.iter().any(|r| r.starts_with("n8n service not reachable")));
    assert!(report.render().contains("ENVIRONMENT VARIABLES CHECK"));
}

#[tokio::test]
async fn test_write_env_template() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".env.template");
    write_env_template(&path).await.unwrap();
    
    let written = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(written, ENV_TEMPLATE);
    assert!(written.contains("N8N_API_KEY="));
}
