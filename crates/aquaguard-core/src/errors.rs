use aquaguard_core_types::{CommandId, RequestId};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::RiskLevel;

/// Result type alias using CommandError
pub type Result<T> = std::result::Result<T, CommandError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code. Codes are what the UI layer and
/// automation agents match on; they never change once released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Validation
    InvalidInput,
    InvalidConfig,

    // Lifecycle
    NotFound,
    Expired,
    MissingOverrideReason,
    InFlight,

    // Gateway
    ExecutionFailed,

    // Service
    ServiceClosed,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Expired => "ERR_EXPIRED",
            ExErrorKind::MissingOverrideReason => "ERR_MISSING_OVERRIDE_REASON",
            ExErrorKind::InFlight => "ERR_IN_FLIGHT",
            ExErrorKind::ExecutionFailed => "ERR_EXECUTION_FAILED",
            ExErrorKind::ServiceClosed => "ERR_SERVICE_CLOSED",
        }
    }
}

/// Canonical structured error type
///
/// Carries a stable kind plus optional context for the operation and command
/// it was raised for.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    command_id: Option<CommandId>,
    request_id: Option<RequestId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            command_id: None,
            request_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add command id context
    pub fn with_command_id(mut self, id: CommandId) -> Self {
        self.command_id = Some(id);
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn command_id(&self) -> Option<&CommandId> {
        self.command_id.as_ref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(command_id) = &self.command_id {
            write!(f, " (command_id: {})", command_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain failures of the command dispatch core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    /// Command id absent from the pending store (already terminal, or never issued)
    #[error("Command not found: {command_id}")]
    CommandNotFound { command_id: CommandId },

    /// Confirmation arrived after the validity window
    #[error("Command expired: {command_id} expired at {expired_at}")]
    CommandExpired {
        command_id: CommandId,
        expired_at: DateTime<Utc>,
    },

    /// High/critical command confirmed without a justification
    #[error("Override reason required for {risk_level} risk command {command_id}")]
    MissingOverrideReason {
        command_id: CommandId,
        risk_level: RiskLevel,
    },

    /// Gateway reported a failure while applying the command
    #[error("Execution failed for {command_id}: {diagnostic}")]
    ExecutionFailed {
        command_id: CommandId,
        diagnostic: String,
    },

    /// Another execute call is already dispatching this command
    #[error("Command {command_id} is already being dispatched")]
    CommandInFlight { command_id: CommandId },

    /// Malformed command intent
    #[error("Invalid command intent: {reason}")]
    InvalidIntent { reason: String },

    /// Configuration could not be loaded or failed validation
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Operation attempted after `CommandService::close`
    #[error("Command service is closed")]
    ServiceClosed,
}

impl CommandError {
    /// The command this error concerns, if any
    pub fn command_id(&self) -> Option<&CommandId> {
        match self {
            CommandError::CommandNotFound { command_id }
            | CommandError::CommandExpired { command_id, .. }
            | CommandError::MissingOverrideReason { command_id, .. }
            | CommandError::ExecutionFailed { command_id, .. }
            | CommandError::CommandInFlight { command_id } => Some(command_id),
            CommandError::InvalidIntent { .. }
            | CommandError::InvalidConfig { .. }
            | CommandError::ServiceClosed => None,
        }
    }

    /// Discrete, display-ready follow-up hints for the operator
    pub fn warnings(&self) -> Vec<String> {
        match self {
            CommandError::CommandExpired { .. } => {
                vec!["Create a new command to apply this change".to_string()]
            }
            CommandError::MissingOverrideReason { .. } => {
                vec!["Provide an override reason and confirm again".to_string()]
            }
            CommandError::ExecutionFailed { .. } => vec![
                "Verify gateway connectivity, then issue a new command to retry".to_string(),
            ],
            CommandError::CommandInFlight { .. } => {
                vec!["Wait for the current dispatch to finish".to_string()]
            }
            _ => Vec::new(),
        }
    }
}

impl From<CommandError> for ExError {
    fn from(err: CommandError) -> Self {
        let message = err.to_string();
        let kind = match &err {
            CommandError::CommandNotFound { .. } => ExErrorKind::NotFound,
            CommandError::CommandExpired { .. } => ExErrorKind::Expired,
            CommandError::MissingOverrideReason { .. } => ExErrorKind::MissingOverrideReason,
            CommandError::ExecutionFailed { .. } => ExErrorKind::ExecutionFailed,
            CommandError::CommandInFlight { .. } => ExErrorKind::InFlight,
            CommandError::InvalidIntent { .. } => ExErrorKind::InvalidInput,
            CommandError::InvalidConfig { .. } => ExErrorKind::InvalidConfig,
            CommandError::ServiceClosed => ExErrorKind::ServiceClosed,
        };

        let ex = ExError::new(kind).with_message(message);
        match err.command_id() {
            Some(id) => ex.with_command_id(id.clone()),
            None => ex,
        }
    }
}
