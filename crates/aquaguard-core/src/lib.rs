//! AquaGuard Core - command dispatch & audit for water-treatment equipment
//!
//! This crate provides the control-plane core that sits between operator or
//! AI-issued parameter changes and the field gateway:
//! - Risk classification of proposed parameter changes
//! - A pending-command store with soft expiry
//! - A bounded, queryable, most-recent-first audit log
//! - A simulated gateway executor with injectable randomness
//! - The `CommandService` façade that serialises every lifecycle transition
//!
//! Everything is in-memory; persistence and transport are left to callers.

pub mod audit_log;
pub mod clock;
pub mod config;
pub mod errors;
pub mod executor;
pub mod logging_facility;
pub mod model;
pub mod reaper;
pub mod risk;
pub mod service;
pub mod store;

#[doc(hidden)]
pub use aquaguard_core_types as core_types;

// Re-export commonly used types
pub use aquaguard_core_types::{AuditEntryId, CommandId, RequestId};
pub use audit_log::{AuditLog, AuditQuery, AuditStats};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ServiceConfig;
pub use errors::{CommandError, ExError, ExErrorKind, Result};
pub use executor::{
    EntropySource, FixedEntropy, Gateway, GatewayOutcome, SimulatedGateway, StdEntropy,
};
pub use model::{
    AuditAction, AuditLogEntry, CommandConfirmation, CommandIntent, CommandRequest, CommandResult,
    CommandSource, CommandType, CommandValue, RiskLevel,
};
pub use reaper::{spawn_expiry_reaper, spawn_expiry_reaper_with_period, ExpiryReaper};
pub use risk::{classify_risk, risk_display, RiskDisplay};
pub use service::{CommandService, CommandServiceBuilder};
pub use store::CommandStore;
