//! Command domain model
//!
//! A command is a proposed change to a single equipment parameter. It is
//! created from a `CommandIntent`, held as a `CommandRequest` while pending,
//! approved through a `CommandConfirmation`, and reported back to the caller
//! as a `CommandResult`.

use aquaguard_core_types::CommandId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{CommandError, Result};

/// Kind of control action requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    Setpoint,
    Start,
    Stop,
    Adjust,
    Apply,
    Acknowledge,
    Reset,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Setpoint => "setpoint",
            CommandType::Start => "start",
            CommandType::Stop => "stop",
            CommandType::Adjust => "adjust",
            CommandType::Apply => "apply",
            CommandType::Acknowledge => "acknowledge",
            CommandType::Reset => "reset",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CommandType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "setpoint" => Ok(CommandType::Setpoint),
            "start" => Ok(CommandType::Start),
            "stop" => Ok(CommandType::Stop),
            "adjust" => Ok(CommandType::Adjust),
            "apply" => Ok(CommandType::Apply),
            "acknowledge" => Ok(CommandType::Acknowledge),
            "reset" => Ok(CommandType::Reset),
            other => Err(format!("unknown command type: {}", other)),
        }
    }
}

/// Who or what originated a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandSource {
    Manual,
    AiOptimization,
    VirtualTwin,
    AlarmResponse,
}

impl CommandSource {
    pub const ALL: [CommandSource; 4] = [
        CommandSource::Manual,
        CommandSource::AiOptimization,
        CommandSource::VirtualTwin,
        CommandSource::AlarmResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandSource::Manual => "manual",
            CommandSource::AiOptimization => "ai_optimization",
            CommandSource::VirtualTwin => "virtual_twin",
            CommandSource::AlarmResponse => "alarm_response",
        }
    }
}

impl fmt::Display for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk tier of a command, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// Whether execution needs a documented override reason
    pub fn requires_reason(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RiskLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| format!("unknown risk level: {}", s))
    }
}

/// A parameter value: numeric setpoints, or textual modes such as "auto"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandValue {
    Number(f64),
    Text(String),
}

impl CommandValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CommandValue::Number(n) => Some(*n),
            CommandValue::Text(_) => None,
        }
    }
}

impl fmt::Display for CommandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandValue::Number(n) => write!(f, "{}", n),
            CommandValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for CommandValue {
    fn from(n: f64) -> Self {
        CommandValue::Number(n)
    }
}

impl From<&str> for CommandValue {
    fn from(s: &str) -> Self {
        CommandValue::Text(s.to_string())
    }
}

/// Caller-supplied description of a command to create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandIntent {
    pub command_type: CommandType,
    pub equipment_id: String,
    pub equipment_name: String,
    pub plant_id: String,
    pub plant_name: String,
    pub parameter: String,
    pub current_value: CommandValue,
    pub target_value: CommandValue,
    pub unit: String,
    pub risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub source: CommandSource,
    pub requested_by: String,
}

impl CommandIntent {
    /// Check the intent is well-formed
    ///
    /// # Errors
    ///
    /// Returns `InvalidIntent` for blank identifiers or non-finite numbers.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("equipment_id", &self.equipment_id),
            ("plant_id", &self.plant_id),
            ("parameter", &self.parameter),
            ("requested_by", &self.requested_by),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CommandError::InvalidIntent {
                    reason: format!("{} must not be blank", field),
                });
            }
        }

        for (field, value) in [
            ("current_value", &self.current_value),
            ("target_value", &self.target_value),
        ] {
            if let CommandValue::Number(n) = value {
                if !n.is_finite() {
                    return Err(CommandError::InvalidIntent {
                        reason: format!("{} must be a finite number", field),
                    });
                }
            }
        }

        Ok(())
    }
}

/// A pending command awaiting confirmation and execution
///
/// Never edited in place; it only leaves the store through a lifecycle
/// transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub id: CommandId,
    pub command_type: CommandType,
    pub equipment_id: String,
    pub equipment_name: String,
    pub plant_id: String,
    pub plant_name: String,
    pub parameter: String,
    pub current_value: CommandValue,
    pub target_value: CommandValue,
    pub unit: String,
    pub risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub source: CommandSource,
    pub requested_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CommandRequest {
    /// Stamp an intent with its id and validity window
    ///
    /// `validity` must be positive so that `expires_at > created_at`.
    pub fn from_intent(
        id: CommandId,
        intent: CommandIntent,
        created_at: DateTime<Utc>,
        validity: Duration,
    ) -> Self {
        Self {
            id,
            command_type: intent.command_type,
            equipment_id: intent.equipment_id,
            equipment_name: intent.equipment_name,
            plant_id: intent.plant_id,
            plant_name: intent.plant_name,
            parameter: intent.parameter,
            current_value: intent.current_value,
            target_value: intent.target_value,
            unit: intent.unit,
            risk_level: intent.risk_level,
            reasoning: intent.reasoning,
            source: intent.source,
            requested_by: intent.requested_by,
            created_at,
            expires_at: created_at + validity,
        }
    }

    /// Expiry is exclusive: a command is still valid at exactly `expires_at`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn requires_override_reason(&self) -> bool {
        self.risk_level.requires_reason()
    }

    /// Short "parameter: current -> target unit" description
    pub fn change_summary(&self) -> String {
        format!(
            "{}: {} -> {} {}",
            self.parameter, self.current_value, self.target_value, self.unit
        )
        .trim_end()
        .to_string()
    }
}

/// Operator approval of a pending command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandConfirmation {
    pub confirmed_by: String,
    pub confirmed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<String>,
}

impl CommandConfirmation {
    pub fn new(confirmed_by: impl Into<String>, confirmed_at: DateTime<Utc>) -> Self {
        Self {
            confirmed_by: confirmed_by.into(),
            confirmed_at,
            notes: None,
            override_reason: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_override_reason(mut self, reason: impl Into<String>) -> Self {
        self.override_reason = Some(reason.into());
        self
    }

    /// A whitespace-only reason does not count as documented
    pub fn has_override_reason(&self) -> bool {
        self.override_reason
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty())
    }
}

/// Outcome of an execute or cancel attempt, shaped for direct display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub command_id: CommandId,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    /// Seconds until the change should be visible in process readings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_effect_secs: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Stable `ExErrorKind` code when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CommandResult {
    pub fn succeeded(command_id: CommandId, message: impl Into<String>) -> Self {
        Self {
            success: true,
            command_id,
            message: message.into(),
            executed_at: None,
            estimated_effect_secs: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            error_code: None,
        }
    }

    /// Render a domain failure; the message is also the first error string
    pub fn failed(command_id: CommandId, err: &CommandError) -> Self {
        let ex: crate::errors::ExError = err.clone().into();
        Self {
            success: false,
            command_id,
            message: err.to_string(),
            executed_at: None,
            estimated_effect_secs: None,
            errors: vec![err.to_string()],
            warnings: err.warnings(),
            error_code: Some(ex.code().to_string()),
        }
    }

    pub fn with_execution(mut self, executed_at: DateTime<Utc>, effect_secs: u32) -> Self {
        self.executed_at = Some(executed_at);
        self.estimated_effect_secs = Some(effect_secs);
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Whether this result failed with the given kind
    pub fn is_error(&self, kind: crate::errors::ExErrorKind) -> bool {
        self.error_code.as_deref() == Some(kind.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;

    fn intent() -> CommandIntent {
        CommandIntent {
            command_type: CommandType::Setpoint,
            equipment_id: "pump-101".to_string(),
            equipment_name: "Raw Water Pump 101".to_string(),
            plant_id: "plant-north".to_string(),
            plant_name: "North WTP".to_string(),
            parameter: "Motor Speed".to_string(),
            current_value: 2850.0.into(),
            target_value: 2650.0.into(),
            unit: "RPM".to_string(),
            risk_level: RiskLevel::Low,
            reasoning: None,
            source: CommandSource::Manual,
            requested_by: "operator-7".to_string(),
        }
    }

    #[test]
    fn test_from_intent_sets_expiry_after_creation() {
        let now = Utc::now();
        let request = CommandRequest::from_intent(
            CommandId::generate(),
            intent(),
            now,
            Duration::minutes(30),
        );

        assert!(request.expires_at > request.created_at);
        assert!(!request.is_expired_at(request.expires_at));
        assert!(request.is_expired_at(request.expires_at + Duration::milliseconds(1)));
    }

    #[test]
    fn test_validate_rejects_blank_plant() {
        let mut bad = intent();
        bad.plant_id = "  ".to_string();
        assert!(matches!(
            bad.validate(),
            Err(CommandError::InvalidIntent { reason }) if reason.contains("plant_id")
        ));
    }

    #[test]
    fn test_validate_rejects_nan_target() {
        let mut bad = intent();
        bad.target_value = CommandValue::Number(f64::NAN);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_textual_values_are_valid() {
        let mut mode = intent();
        mode.current_value = "manual".into();
        mode.target_value = "auto".into();
        assert!(mode.validate().is_ok());
    }

    #[test]
    fn test_blank_override_reason_does_not_count() {
        let c = CommandConfirmation::new("op", Utc::now()).with_override_reason("   ");
        assert!(!c.has_override_reason());
        assert!(c
            .with_override_reason("flow surge")
            .has_override_reason());
    }

    #[test]
    fn test_failed_result_carries_code_and_warning() {
        let id = CommandId::from("cmd-x");
        let result = CommandResult::failed(
            id.clone(),
            &CommandError::CommandNotFound { command_id: id },
        );
        assert!(!result.success);
        assert!(result.is_error(ExErrorKind::NotFound));
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&CommandSource::AiOptimization).unwrap(),
            "\"ai_optimization\""
        );
        assert_eq!("critical".parse::<RiskLevel>(), Ok(RiskLevel::Critical));
        assert_eq!("reset".parse::<CommandType>(), Ok(CommandType::Reset));
    }

    #[test]
    fn test_command_value_untagged() {
        let n: CommandValue = serde_json::from_str("7.2").unwrap();
        let t: CommandValue = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(n.as_number(), Some(7.2));
        assert_eq!(t.as_number(), None);
    }
}
