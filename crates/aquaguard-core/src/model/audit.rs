//! Audit trail model

use aquaguard_core_types::{AuditEntryId, CommandId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::command::{CommandRequest, CommandSource, CommandValue, RiskLevel};

/// Lifecycle event recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Confirmed,
    Executed,
    Failed,
    Cancelled,
    Expired,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::Confirmed => "confirmed",
            AuditAction::Executed => "executed",
            AuditAction::Failed => "failed",
            AuditAction::Cancelled => "cancelled",
            AuditAction::Expired => "expired",
        }
    }

    /// Terminal actions remove the command from the pending store
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuditAction::Executed
                | AuditAction::Failed
                | AuditAction::Cancelled
                | AuditAction::Expired
        )
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one lifecycle event
///
/// Command fields are copied in so the entry stays meaningful after the
/// command itself has left the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditEntryId,
    pub command_id: CommandId,
    pub action: AuditAction,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub details: String,
    pub plant_id: String,
    pub plant_name: String,
    pub equipment_id: String,
    pub equipment_name: String,
    pub parameter: String,
    pub previous_value: CommandValue,
    pub new_value: CommandValue,
    pub unit: String,
    pub risk_level: RiskLevel,
    pub source: CommandSource,
}

impl AuditLogEntry {
    pub fn for_command(
        command: &CommandRequest,
        action: AuditAction,
        actor: impl Into<String>,
        details: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditEntryId::generate(),
            command_id: command.id.clone(),
            action,
            actor: actor.into(),
            timestamp,
            details: details.into(),
            plant_id: command.plant_id.clone(),
            plant_name: command.plant_name.clone(),
            equipment_id: command.equipment_id.clone(),
            equipment_name: command.equipment_name.clone(),
            parameter: command.parameter.clone(),
            previous_value: command.current_value.clone(),
            new_value: command.target_value.clone(),
            unit: command.unit.clone(),
            risk_level: command.risk_level,
            source: command.source,
        }
    }
}
