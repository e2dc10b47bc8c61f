//! `agencyops flow update`

use crate::config::Settings;
use crate::models::flow::VariableUpdate;
use crate::services::flow::{update_with_fallbacks, FlowVariableUpdater, ManualFlowUpdater, RestFlowUpdater};
use crate::utils::error::AppError;
use tracing::warn;

/// Parse `NAME=VALUE[:secret]` values and attach `NAME=ID` ids
pub fn parse_updates(vars: &[String], ids: &[String]) -> Result<Vec<VariableUpdate>, AppError> {
    let mut updates = vars
        .iter()
        .map(|raw| {
            VariableUpdate::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("Expected NAME=VALUE, got '{}'", raw.split('=').next().unwrap_or(""))))
        })
        .collect::<Result<Vec<_>, _>>()?;
    
    for raw in ids {
        let (name, id) = raw
            .split_once('=')
            .ok_or_else(|| AppError::Validation(format!("Expected NAME=ID, got '{}'", raw)))?;
        match updates.iter_mut().find(|u| u.name == name.trim()) {
            Some(update) => update.id = Some(id.trim().to_string()),
            None => warn!("Id given for unknown variable '{}'", name),
        }
    }
    Ok(updates)
}

pub async fn run_update(
    settings: &Settings,
    flow_id: &str,
    vars: &[String],
    ids: &[String],
    manual: bool,
) -> anyhow::Result<()> {
    let updates = parse_updates(vars, ids)?;
    
    let mut updaters: Vec<Box<dyn FlowVariableUpdater>> = Vec::new();
    if !manual {
        match RestFlowUpdater::new(&settings.flow) {
            Ok(rest) => updaters.push(Box::new(rest)),
            Err(e) => println!("[WARN] {} (set POSTMAN_API_KEY to use the API)", e),
        }
    }
    updaters.push(Box::new(ManualFlowUpdater::new(&settings.flow.web_url)));
    
    println!("Updating flow {}:", flow_id);
    for update in &updates {
        println!("  {} = {}", update.name, update.display_value());
    }
    
    let report = update_with_fallbacks(&updaters, flow_id, &updates).await?;
    println!("\n[OK] Updated via {}: {}", report.updater, report.updated.join(", "));
    if !report.skipped.is_empty() {
        println!("[WARN] Not found in flow: {}", report.skipped.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_parse_updates_attaches_ids() {
        let vars = vec!["A=1".to_string(), "B=2:secret".to_string()];
        let ids = vec!["B=var-b".to_string(), "C=var-c".to_string()];
        let updates = parse_updates(&vars, &ids).unwrap();
        
        assert_eq!(updates[0].id, None);
        assert_eq!(updates[1].id.as_deref(), Some("var-b"));
        assert!(updates[1].secret);
    }
    
    #[test]
    fn test_parse_updates_rejects_malformed() {
        assert!(parse_updates(&["novalue".to_string()], &[]).is_err());
        assert!(parse_updates(&["A=1".to_string()], &["A".to_string()]).is_err());
    }
}
