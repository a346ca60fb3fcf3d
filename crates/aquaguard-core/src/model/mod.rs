//! Data model for control commands and their audit trail

pub mod audit;
pub mod command;

pub use audit::{AuditAction, AuditLogEntry};
pub use command::{
    CommandConfirmation, CommandIntent, CommandRequest, CommandResult, CommandSource, CommandType,
    CommandValue, RiskLevel,
};
