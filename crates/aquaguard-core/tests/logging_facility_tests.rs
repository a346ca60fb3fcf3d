#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use aquaguard_core::core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_DURATION_MS, FIELD_EQUIPMENT_ID, FIELD_ERR_CODE,
    FIELD_ERR_KIND, FIELD_PLANT_ID, FIELD_REQUEST_ID, FIELD_RISK_LEVEL,
};
use aquaguard_core::errors::CommandError;
use aquaguard_core::logging_facility::{init_test_capture, CapturedEvent};
use aquaguard_core::{
    log_op_end, log_op_error, log_op_start, Clock, CommandConfirmation, CommandId, RiskLevel,
};
use common::{setpoint_intent, test_service};

#[test]
fn test_log_op_macros_emit_canonical_events() {
    let capture = init_test_capture();
    let op = "test_log_op_macros_unique_1";

    log_op_start!(op);
    log_op_end!(op, duration_ms = 7);

    let events = capture.events_for_op(op);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_START));
    assert_eq!(events[1].event.as_deref(), Some(EVENT_END));
    assert_eq!(events[1].field(FIELD_DURATION_MS), Some("7"));
}

#[test]
fn test_log_op_error_records_code() {
    let capture = init_test_capture();
    let op = "test_log_op_error_unique_2";

    log_op_error!(op, CommandError::ServiceClosed, duration_ms = 1);

    let events = capture.events_for_op(op);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_END_ERROR));
    assert_eq!(events[0].field(FIELD_ERR_CODE), Some("ERR_SERVICE_CLOSED"));
    assert_eq!(events[0].field(FIELD_ERR_KIND), Some("ServiceClosed"));
    assert_eq!(events[0].level, tracing::Level::ERROR);
}

#[test]
fn test_create_command_logs_start_and_end() {
    let capture = init_test_capture();
    let (service, _clock) = test_service(false);
    let plant = "plant-logging-create";

    let cmd = service
        .create_command(setpoint_intent(plant, "Motor Speed", 100.0, 101.0, RiskLevel::Low))
        .unwrap();

    let ours: Vec<CapturedEvent> = capture
        .events_for_op("create_command")
        .into_iter()
        .filter(|e| {
            e.field(FIELD_PLANT_ID) == Some(plant) || e.command_id() == Some(cmd.id.as_str())
        })
        .collect();
    assert_eq!(ours.len(), 2);
    assert_eq!(ours[0].event.as_deref(), Some(EVENT_START));
    assert_eq!(ours[1].event.as_deref(), Some(EVENT_END));
    assert_eq!(ours[0].field(FIELD_EQUIPMENT_ID), Some("plant-logging-create-pump-101"));
    assert_eq!(ours[1].field(FIELD_RISK_LEVEL), Some("low"));
    assert!(ours[0].field(FIELD_REQUEST_ID).is_some());
    assert_eq!(
        ours[0].field(FIELD_REQUEST_ID),
        ours[1].field(FIELD_REQUEST_ID),
        "start and end share a request id"
    );
}

#[tokio::test]
async fn test_failed_execute_logs_end_error() {
    let capture = init_test_capture();
    let (service, clock) = test_service(true);
    let cmd = service
        .create_command(setpoint_intent(
            "plant-logging-fail",
            "Motor Speed",
            100.0,
            101.0,
            RiskLevel::Low,
        ))
        .unwrap();

    service
        .execute_command(&cmd.id, CommandConfirmation::new("operator-7", clock.now()))
        .await;

    let errors = capture.count_events(|e| {
        e.op.as_deref() == Some("execute_command")
            && e.event.as_deref() == Some(EVENT_END_ERROR)
            && e.command_id() == Some(cmd.id.as_str())
    });
    assert_eq!(errors, 1);

    let warned = capture.count_events(|e| {
        e.level == tracing::Level::WARN && e.command_id() == Some(cmd.id.as_str())
    });
    assert_eq!(warned, 1);
}

#[test]
fn test_cancel_not_found_logs_error_code() {
    let capture = init_test_capture();
    let (service, _clock) = test_service(false);
    let id = CommandId::from("cmd-logging-missing");

    service.cancel_command(&id, "operator-7", None);

    capture.assert_event_exists("cancel_command", EVENT_END_ERROR);
    let codes: Vec<String> = capture
        .events_for_op("cancel_command")
        .into_iter()
        .filter(|e| {
            e.command_id() == Some(id.as_str()) && e.event.as_deref() == Some(EVENT_END_ERROR)
        })
        .filter_map(|e| e.field(FIELD_ERR_CODE).map(str::to_string))
        .collect();
    assert_eq!(codes, vec!["ERR_NOT_FOUND".to_string()]);
}
