use aquaguard_core::risk::{assess_intent, is_critical_parameter, percent_change};
use aquaguard_core::{classify_risk, risk_display, CommandService, CommandType, RiskLevel};
use proptest::prelude::*;

mod common;

fn any_command_type() -> impl Strategy<Value = CommandType> {
    prop_oneof![
        Just(CommandType::Setpoint),
        Just(CommandType::Start),
        Just(CommandType::Stop),
        Just(CommandType::Adjust),
        Just(CommandType::Apply),
        Just(CommandType::Acknowledge),
        Just(CommandType::Reset),
    ]
}

fn any_parameter() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Motor Speed".to_string()),
        Just("Inlet Pressure".to_string()),
        Just("Chemical Feed Rate".to_string()),
        Just("pH dosing".to_string()),
        Just("Free Chlorine".to_string()),
        Just("Phosphate".to_string()),
        "[A-Za-z ]{0,24}",
    ]
}

/// Tier from the rule table, written independently of the classifier
fn expected_tier(parameter: &str, pct: f64) -> RiskLevel {
    let m = pct.abs();
    let critical = is_critical_parameter(parameter);
    match () {
        _ if critical && m > 20.0 => RiskLevel::Critical,
        _ if critical && m > 10.0 => RiskLevel::High,
        _ if m > 25.0 => RiskLevel::High,
        _ if m > 15.0 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

proptest! {
    #[test]
    fn classification_is_deterministic(
        command_type in any_command_type(),
        parameter in any_parameter(),
        pct in -200.0f64..200.0,
    ) {
        let first = classify_risk(command_type, &parameter, pct);
        let second = CommandService::assess_command_risk(command_type, &parameter, pct);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn tiers_follow_rule_table(
        command_type in any_command_type(),
        parameter in any_parameter(),
        pct in -200.0f64..200.0,
    ) {
        prop_assert_eq!(
            classify_risk(command_type, &parameter, pct),
            expected_tier(&parameter, pct)
        );
    }

    #[test]
    fn sign_of_change_does_not_matter(
        parameter in any_parameter(),
        pct in 0.0f64..200.0,
    ) {
        prop_assert_eq!(
            classify_risk(CommandType::Adjust, &parameter, pct),
            classify_risk(CommandType::Adjust, &parameter, -pct)
        );
    }

    #[test]
    fn critical_class_never_ranks_below_general(pct in -200.0f64..200.0) {
        let general = classify_risk(CommandType::Setpoint, "Motor Speed", pct);
        let critical = classify_risk(CommandType::Setpoint, "Inlet Pressure", pct);
        prop_assert!(critical >= general);
    }
}

#[test]
fn test_assess_intent_keeps_more_severe_declared_tier() {
    let declared_high = common::setpoint_intent("p", "Motor Speed", 100.0, 101.0, RiskLevel::High);
    assert_eq!(assess_intent(&declared_high), RiskLevel::High);

    let computed_high = common::setpoint_intent("p", "Motor Speed", 100.0, 130.0, RiskLevel::Low);
    assert_eq!(assess_intent(&computed_high), RiskLevel::High);
}

#[test]
fn test_percent_change_from_zero_is_unbounded() {
    assert_eq!(percent_change(&0.0.into(), &0.0.into()), Some(0.0));
    assert_eq!(percent_change(&0.0.into(), &3.0.into()), None);

    let dose = common::setpoint_intent("p", "Chlorine Dose", 0.0, 3.0, RiskLevel::Medium);
    assert_eq!(assess_intent(&dose), RiskLevel::Critical);

    let speed = common::setpoint_intent("p", "Motor Speed", 0.0, -3.0, RiskLevel::Low);
    assert_eq!(assess_intent(&speed), RiskLevel::High);

    let declared = common::setpoint_intent("p", "Motor Speed", 0.0, 3.0, RiskLevel::Critical);
    assert_eq!(assess_intent(&declared), RiskLevel::Critical);
}

#[test]
fn test_every_tier_has_a_display() {
    for level in RiskLevel::ALL {
        let display = CommandService::get_risk_display(level);
        assert_eq!(display, risk_display(level));
        assert!(!display.label.is_empty());
        assert!(!display.description.is_empty());
        assert_eq!(display.requires_reason, level >= RiskLevel::High);
    }
}
