//! Flow variable updater tests against a mock flow API

use agencyops::config::FlowConfig;
use agencyops::models::flow::VariableUpdate;
use agencyops::services::flow::update_with_fallbacks;
use agencyops::services::{FlowVariableUpdater, ManualFlowUpdater, RestFlowUpdater};
use agencyops::AppError;
use httpmock::prelude::*;
use httpmock::Method;
use serde_json::json;
use std::io::Cursor;

fn create_test_updater(server: &MockServer) -> RestFlowUpdater {
    RestFlowUpdater::new(&FlowConfig {
        api_key: Some("PMAK-test".to_string()),
        base_url: server.base_url(),
        web_url: "https://flows.example.test".to_string(),
    })
    .unwrap()
}

fn create_test_flow() -> serde_json::Value {
    json!({
        "id": "flow-1",
        "name": "Lead intake",
        "configurations": [
            {"id": "var-key", "name": "GHL_API_KEY", "value": "", "type": "secret"},
            {"id": "var-loc", "name": "GHL_LOCATION_ID", "value": "", "type": "string"}
        ],
        "nodes": [{"id": "n1"}]
    })
}

fn updates(raw: &[&str]) -> Vec<VariableUpdate> {
    raw.iter().map(|r| VariableUpdate::parse(r).unwrap()).collect()
}

#[tokio::test]
async fn test_get_flow_probes_prefixes() {
    let server = MockServer::start_async().await;
    // Only the /v1 variant exists and it wraps the flow
    let v1 = server.mock_async(|when, then| {
        when.method(GET).path("/v1/flows/flow-1").header("X-Api-Key", "PMAK-test");
        then.status(200).json_body(json!({"flow": create_test_flow()}));
    }).await;
    
    let flow = create_test_updater(&server).get_flow("flow-1").await.unwrap();
    
    v1.assert_hits_async(1).await;
    assert_eq!(flow.name, "Lead intake");
    assert_eq!(flow.configurations.len(), 2);
    assert!(flow.extra.contains_key("nodes"));
}

#[tokio::test]
async fn test_get_flow_not_found() {
    let server = MockServer::start_async().await;
    let err = create_test_updater(&server).get_flow("missing").await.unwrap_err();
    
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(err.to_string().contains("manually"));
}

#[tokio::test]
async fn test_update_by_id_patches_configurations() {
    let server = MockServer::start_async().await;
    server.mock_async(|when, then| {
        when.method(GET).path("/flows/flow-1");
        then.status(200).json_body(create_test_flow());
    }).await;
    let patch = server.mock_async(|when, then| {
        when.method(Method::PATCH)
            .path("/flows/flow-1/configurations")
            .header("X-Api-Key", "PMAK-test")
            .json_body(json!({"configurations": [{"id": "var-key", "value": "pit-new-key", "type": "secret"}]}));
        then.status(200).json_body(json!({"ok": true}));
    }).await;
    
    let mut update = updates(&["GHL_API_KEY=pit-new-key:secret"]);
    update[0].id = Some("var-key".to_string());
    
    let report = create_test_updater(&server).update_by_id("flow-1", &update).await.unwrap();
    
    patch.assert_hits_async(1).await;
    assert_eq!(report.updater, "rest");
    assert_eq!(report.updated, vec!["GHL_API_KEY"]);
    assert!(report.endpoint.unwrap().ends_with("/flows/flow-1/configurations"));
}

#[tokio::test]
async fn test_all_404_falls_back_to_whole_flow() {
    let server = MockServer::start_async().await;
    server.mock_async(|when, then| {
        when.method(GET).path("/flows/flow-1");
        then.status(200).json_body(create_test_flow());
    }).await;
    // No configuration endpoints are mounted, so every PATCH there is a 404
    let whole = server.mock_async(|when, then| {
        when.method(Method::PATCH)
            .path("/flows/flow-1")
            .body_contains(r#"{"id":"var-loc","name":"GHL_LOCATION_ID","value":"loc_new","type":"string"}"#)
            .body_contains(r#""nodes":[{"id":"n1"}]"#);
        then.status(200);
    }).await;
    
    let report = create_test_updater(&server)
        .update_by_name("flow-1", &updates(&["GHL_LOCATION_ID=loc_new"]))
        .await
        .unwrap();
    
    whole.assert_hits_async(1).await;
    assert_eq!(report.endpoint.unwrap(), format!("{}/flows/flow-1", server.base_url()));
}

#[tokio::test]
async fn test_update_by_name_skips_unknown() {
    let server = MockServer::start_async().await;
    server.mock_async(|when, then| {
        when.method(GET).path("/flows/flow-1");
        then.status(200).json_body(create_test_flow());
    }).await;
    server.mock_async(|when, then| {
        when.method(Method::PATCH).path("/api/flows/flow-1/configurations");
        then.status(200);
    }).await;
    
    let updater = create_test_updater(&server);
    let report = updater
        .update_by_name("flow-1", &updates(&["GHL_LOCATION_ID=loc_new", "UNKNOWN_VAR=x"]))
        .await
        .unwrap();
    
    assert_eq!(report.updated, vec!["GHL_LOCATION_ID"]);
    assert_eq!(report.skipped, vec!["UNKNOWN_VAR"]);
    
    let err = updater.update_by_name("flow-1", &updates(&["UNKNOWN_VAR=x"])).await.unwrap_err();
    assert!(err.to_string().contains("No variables found to update"));
}

#[tokio::test]
async fn test_fallback_to_manual_updater() {
    let server = MockServer::start_async().await;
    let rest = create_test_updater(&server);
    let manual = ManualFlowUpdater::with_io(
        "https://flows.example.test",
        Box::new(Cursor::new(b"\n".to_vec())),
        Box::new(Vec::new()),
    );
    let updaters: Vec<Box<dyn FlowVariableUpdater>> = vec![Box::new(rest), Box::new(manual)];
    
    let report = update_with_fallbacks(&updaters, "flow-1", &updates(&["GHL_API_KEY=pit-new-key:secret"]))
        .await
        .unwrap();
    
    assert_eq!(report.updater, "manual");
    assert_eq!(report.endpoint.unwrap(), "https://flows.example.test/flows/flow-1");
}

#[tokio::test]
async fn test_no_updater_succeeds() {
    let manual = ManualFlowUpdater::with_io(
        "https://flows.example.test",
        Box::new(Cursor::new(b"no\n".to_vec())),
        Box::new(Vec::new()),
    );
    let updaters: Vec<Box<dyn FlowVariableUpdater>> = vec![Box::new(manual)];
    
    let result = update_with_fallbacks(&updaters, "flow-1", &updates(&["A=b"])).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}
