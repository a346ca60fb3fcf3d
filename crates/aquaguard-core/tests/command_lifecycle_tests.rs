#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use aquaguard_core::{
    AuditAction, AuditQuery, Clock, CommandConfirmation, CommandId, ExErrorKind, RiskLevel,
};
use chrono::Duration;
use common::{actions_for, setpoint_intent, test_service};

#[tokio::test]
async fn test_scenario_low_risk_speed_change_executes() {
    // GIVEN a low-risk 2850 -> 2650 RPM change
    let (service, clock) = test_service(false);
    let cmd = service
        .create_command(setpoint_intent(
            "plant-north",
            "Motor Speed",
            2850.0,
            2650.0,
            RiskLevel::Low,
        ))
        .expect("well-formed intent");
    assert!(cmd.expires_at > cmd.created_at);
    assert_eq!(service.get_pending_command(&cmd.id).unwrap().id, cmd.id);

    // WHEN confirmed without an override reason
    let result = service
        .execute_command(&cmd.id, CommandConfirmation::new("operator-7", clock.now()))
        .await;

    // THEN it executes and leaves the store
    assert!(result.success, "{:?}", result);
    let effect = result.estimated_effect_secs.unwrap();
    assert!((15..=45).contains(&effect));
    assert_eq!(result.executed_at, Some(clock.now()));
    assert!(service.get_pending_commands().is_empty());
    assert_eq!(
        actions_for(&service, &cmd.id),
        vec![AuditAction::Created, AuditAction::Confirmed, AuditAction::Executed]
    );
}

#[tokio::test]
async fn test_scenario_low_risk_speed_change_gateway_failure() {
    let (service, clock) = test_service(true);
    let cmd = service
        .create_command(setpoint_intent(
            "plant-north",
            "Motor Speed",
            2850.0,
            2650.0,
            RiskLevel::Low,
        ))
        .unwrap();

    let result = service
        .execute_command(&cmd.id, CommandConfirmation::new("operator-7", clock.now()))
        .await;

    assert!(!result.success);
    assert!(result.is_error(ExErrorKind::ExecutionFailed));
    assert!(result.errors[0].contains("Gateway timeout"));
    assert!(result.estimated_effect_secs.is_none());
    assert!(service.get_pending_command(&cmd.id).is_none());

    let failed = service.get_audit_log(&AuditQuery::new().action(AuditAction::Failed));
    assert_eq!(failed.len(), 1);
    assert!(failed[0].details.starts_with("Gateway timeout"));
}

#[tokio::test]
async fn test_scenario_ph_dosing_requires_override_reason() {
    // GIVEN a 25% increase on pH dosing, declared low
    let (service, clock) = test_service(false);
    let cmd = service
        .create_classified_command(setpoint_intent(
            "plant-north",
            "pH dosing",
            4.0,
            5.0,
            RiskLevel::Low,
        ))
        .unwrap();

    // THEN it is classified critical
    assert_eq!(cmd.risk_level, RiskLevel::Critical);

    // WHEN executed without a reason
    let denied = service
        .execute_command(&cmd.id, CommandConfirmation::new("operator-7", clock.now()))
        .await;

    // THEN it is refused and stays pending
    assert!(denied.is_error(ExErrorKind::MissingOverrideReason));
    assert_eq!(denied.warnings.len(), 1);
    assert!(service.get_pending_command(&cmd.id).is_some());
    assert_eq!(actions_for(&service, &cmd.id), vec![AuditAction::Created]);

    // AND a retry with a reason goes through
    let confirmation = CommandConfirmation::new("shift-lead", clock.now())
        .with_notes("lab confirmed low alkalinity")
        .with_override_reason("raw water pH excursion");
    let executed = service.execute_command(&cmd.id, confirmation).await;
    assert!(executed.success);

    let confirmed = service.get_audit_log(&AuditQuery::new().action(AuditAction::Confirmed));
    assert_eq!(confirmed[0].actor, "shift-lead");
    assert!(confirmed[0].details.contains("raw water pH excursion"));
    assert!(confirmed[0].details.contains("low alkalinity"));
}

#[tokio::test]
async fn test_dosing_started_from_zero_requires_override_reason() {
    // GIVEN chlorine dosing switched on from zero, declared low
    let (service, clock) = test_service(false);
    let cmd = service
        .create_classified_command(setpoint_intent(
            "plant-north",
            "Chlorine dosing",
            0.0,
            8.0,
            RiskLevel::Low,
        ))
        .unwrap();

    // THEN it is classified critical
    assert_eq!(cmd.risk_level, RiskLevel::Critical);

    // AND it cannot execute without a reason
    let denied = service
        .execute_command(&cmd.id, CommandConfirmation::new("operator-7", clock.now()))
        .await;
    assert!(denied.is_error(ExErrorKind::MissingOverrideReason));
    assert!(service.get_pending_command(&cmd.id).is_some());
    assert_eq!(service.get_audit_stats(None).executed, 0);
}

#[tokio::test]
async fn test_blank_override_reason_does_not_satisfy_high_risk() {
    let (service, clock) = test_service(false);
    let cmd = service
        .create_command(setpoint_intent(
            "plant-north",
            "Motor Speed",
            100.0,
            140.0,
            RiskLevel::High,
        ))
        .unwrap();

    let result = service
        .execute_command(
            &cmd.id,
            CommandConfirmation::new("operator-7", clock.now()).with_override_reason("   "),
        )
        .await;

    assert!(result.is_error(ExErrorKind::MissingOverrideReason));
    assert!(service.get_pending_command(&cmd.id).is_some());
}

#[test]
fn test_scenario_cancel_missing_command() {
    let (service, _clock) = test_service(false);
    let total_before = service.get_audit_stats(None).total;

    let result = service.cancel_command(&CommandId::from("cmd-does-not-exist"), "operator-7", None);

    assert!(!result.success);
    assert!(result.is_error(ExErrorKind::NotFound));
    assert!(result.message.contains("cmd-does-not-exist"));
    assert_eq!(service.get_audit_stats(None).total, total_before);
}

#[tokio::test]
async fn test_execute_after_expiry_is_terminal() {
    let (service, clock) = test_service(false);
    let cmd = service
        .create_command(setpoint_intent("plant-north", "Motor Speed", 100.0, 101.0, RiskLevel::Low))
        .unwrap();

    // Exactly at the boundary the command is still valid
    clock.set(cmd.expires_at);
    assert!(service.sweep_expired().is_empty());

    clock.advance(Duration::seconds(1));
    let result = service
        .execute_command(&cmd.id, CommandConfirmation::new("operator-7", clock.now()))
        .await;

    assert!(result.is_error(ExErrorKind::Expired));
    assert_eq!(result.warnings, vec!["Create a new command to apply this change"]);
    assert!(service.get_pending_command(&cmd.id).is_none());
    assert_eq!(
        actions_for(&service, &cmd.id),
        vec![AuditAction::Created, AuditAction::Expired]
    );

    // A second attempt finds nothing and appends nothing
    let again = service
        .execute_command(&cmd.id, CommandConfirmation::new("operator-7", clock.now()))
        .await;
    assert!(again.is_error(ExErrorKind::NotFound));
    assert_eq!(actions_for(&service, &cmd.id).len(), 2);
}

#[tokio::test]
async fn test_terminal_transitions_happen_once() {
    let (service, clock) = test_service(false);
    let cmd = service
        .create_command(setpoint_intent("plant-north", "Motor Speed", 100.0, 101.0, RiskLevel::Low))
        .unwrap();

    assert!(service.cancel_command(&cmd.id, "operator-7", Some("duplicate")).success);

    let result = service
        .execute_command(&cmd.id, CommandConfirmation::new("operator-7", clock.now()))
        .await;
    assert!(result.is_error(ExErrorKind::NotFound));

    let terminal = actions_for(&service, &cmd.id)
        .into_iter()
        .filter(|a| a.is_terminal())
        .count();
    assert_eq!(terminal, 1);
}

#[test]
fn test_pending_commands_listed_oldest_first() {
    let (service, clock) = test_service(false);
    let first = service
        .create_command(setpoint_intent("plant-north", "Motor Speed", 100.0, 101.0, RiskLevel::Low))
        .unwrap();
    clock.advance(Duration::seconds(10));
    let second = service
        .create_command(setpoint_intent("plant-south", "Motor Speed", 100.0, 101.0, RiskLevel::Low))
        .unwrap();

    let ids: Vec<_> = service.get_pending_commands().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
}

#[test]
fn test_command_ids_are_unique() {
    let (service, _clock) = test_service(false);
    let mut ids = std::collections::HashSet::new();
    for _ in 0..50 {
        let cmd = service
            .create_command(setpoint_intent(
                "plant-north",
                "Motor Speed",
                100.0,
                101.0,
                RiskLevel::Low,
            ))
            .unwrap();
        assert!(ids.insert(cmd.id));
    }
}
