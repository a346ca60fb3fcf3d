use aquaguard_core::{
    AuditAction, AuditQuery, CommandId, CommandIntent, CommandService, CommandSource,
    CommandType, FixedEntropy, ManualClock, RiskLevel, ServiceConfig,
};
use chrono::{TimeZone, Utc};
use std::sync::Arc;

/// Fixed starting instant so expiry arithmetic in tests is exact
#[allow(dead_code)]
pub fn start_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
}

/// Service with a manual clock, zero latency and a pinned gateway outcome
///
/// `fail` forces every dispatch to be rejected; otherwise every dispatch
/// is applied.
#[allow(dead_code)]
pub fn test_service(fail: bool) -> (Arc<CommandService>, Arc<ManualClock>) {
    test_service_with(ServiceConfig::deterministic(), fail)
}

#[allow(dead_code)]
pub fn test_service_with(
    config: ServiceConfig,
    fail: bool,
) -> (Arc<CommandService>, Arc<ManualClock>) {
    let config = ServiceConfig {
        failure_probability: if fail { 1.0 } else { 0.0 },
        ..config
    };
    let clock = Arc::new(ManualClock::new(start_time()));
    let service = CommandService::builder(config)
        .clock(clock.clone())
        .entropy(Arc::new(FixedEntropy::new(0.5)))
        .build()
        .expect("test config should be valid");
    (Arc::new(service), clock)
}

/// Intent for a numeric setpoint change on the given plant and parameter
#[allow(dead_code)]
pub fn setpoint_intent(
    plant_id: &str,
    parameter: &str,
    current: f64,
    target: f64,
    risk_level: RiskLevel,
) -> CommandIntent {
    CommandIntent {
        command_type: CommandType::Setpoint,
        equipment_id: format!("{}-pump-101", plant_id),
        equipment_name: "Raw Water Pump 101".to_string(),
        plant_id: plant_id.to_string(),
        plant_name: format!("{} treatment works", plant_id),
        parameter: parameter.to_string(),
        current_value: current.into(),
        target_value: target.into(),
        unit: "RPM".to_string(),
        risk_level,
        reasoning: Some("energy optimisation".to_string()),
        source: CommandSource::Manual,
        requested_by: "operator-7".to_string(),
    }
}

/// Actions recorded for one command, oldest first
#[allow(dead_code)]
pub fn actions_for(service: &CommandService, id: &CommandId) -> Vec<AuditAction> {
    service
        .get_audit_log(&AuditQuery::new().page(0, usize::MAX))
        .into_iter()
        .filter(|e| &e.command_id == id)
        .map(|e| e.action)
        .rev()
        .collect()
}
