//! Risk classification of proposed parameter changes
//!
//! Pure functions only: the same inputs always yield the same tier, and
//! every input lands in exactly one tier.

use serde::Serialize;

use crate::model::{CommandIntent, CommandType, CommandValue, RiskLevel};

/// Substrings that put a parameter in the safety-critical class
const CRITICAL_TERMS: &[&str] = &["pressure", "chemical", "dosing", "chlorine"];

/// Whole words that put a parameter in the safety-critical class.
/// "ph" is matched as a word so that e.g. "phosphate" does not qualify.
const CRITICAL_WORDS: &[&str] = &["ph"];

const CRITICAL_CLASS_CRITICAL_PCT: f64 = 20.0;
const CRITICAL_CLASS_HIGH_PCT: f64 = 10.0;
const HIGH_PCT: f64 = 25.0;
const MEDIUM_PCT: f64 = 15.0;

/// Fixed presentation descriptor for a risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskDisplay {
    pub level: RiskLevel,
    pub label: &'static str,
    pub description: &'static str,
    pub requires_reason: bool,
}

/// Whether a parameter name belongs to the safety-critical class
/// (pressure, chemical dosing, pH, chlorine)
pub fn is_critical_parameter(parameter: &str) -> bool {
    let lower = parameter.to_lowercase();
    CRITICAL_TERMS.iter().any(|term| lower.contains(term))
        || lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| CRITICAL_WORDS.contains(&word))
}

/// Classify a proposed change
///
/// `percent_change` is signed; only its magnitude matters. A non-finite
/// magnitude is treated as the most severe case. The command type does not
/// currently influence the tier.
pub fn classify_risk(
    _command_type: CommandType,
    parameter: &str,
    percent_change: f64,
) -> RiskLevel {
    if !percent_change.is_finite() {
        return RiskLevel::Critical;
    }

    let magnitude = percent_change.abs();
    let critical = is_critical_parameter(parameter);

    if critical && magnitude > CRITICAL_CLASS_CRITICAL_PCT {
        RiskLevel::Critical
    } else if (critical && magnitude > CRITICAL_CLASS_HIGH_PCT) || magnitude > HIGH_PCT {
        RiskLevel::High
    } else if magnitude > MEDIUM_PCT {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Signed percent change from `current` to `target`
///
/// `None` for textual values, or when `current` is zero and the ratio is
/// undefined.
pub fn percent_change(current: &CommandValue, target: &CommandValue) -> Option<f64> {
    let (current, target) = (current.as_number()?, target.as_number()?);
    if current == 0.0 {
        return if target == 0.0 { Some(0.0) } else { None };
    }
    Some((target - current) / current.abs() * 100.0)
}

/// Tier for an intent: the more severe of the declared tier and the tier
/// computed from its numeric values
///
/// A numeric change away from zero has no finite ratio and is assessed as
/// the largest possible finite magnitude: critical-class parameters come
/// out `Critical`, everything else `High`.
pub fn assess_intent(intent: &CommandIntent) -> RiskLevel {
    let (current, target) = (&intent.current_value, &intent.target_value);
    let magnitude = percent_change(current, target)
        .or_else(|| starts_from_zero(current, target).then_some(f64::MAX));

    match magnitude {
        Some(pct) => classify_risk(intent.command_type, &intent.parameter, pct)
            .max(intent.risk_level),
        None => intent.risk_level,
    }
}

fn starts_from_zero(current: &CommandValue, target: &CommandValue) -> bool {
    matches!(
        (current.as_number(), target.as_number()),
        (Some(c), Some(t)) if c == 0.0 && t != 0.0
    )
}

pub fn risk_display(level: RiskLevel) -> RiskDisplay {
    let (label, description) = match level {
        RiskLevel::Low => (
            "Low Risk",
            "Routine adjustment within the normal operating range.",
        ),
        RiskLevel::Medium => (
            "Medium Risk",
            "Noticeable process change; monitor readings after execution.",
        ),
        RiskLevel::High => (
            "High Risk",
            "Significant process change; a documented override reason is required.",
        ),
        RiskLevel::Critical => (
            "Critical Risk",
            "Safety-critical change to pressure, dosing, pH or chlorine; \
             a documented override reason is required.",
        ),
    };

    RiskDisplay {
        level,
        label,
        description,
        requires_reason: level.requires_reason(),
    }
}
