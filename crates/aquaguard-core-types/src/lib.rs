//! Core types shared across the AquaGuard command gateway
//!
//! This crate provides foundational types used by the error facility,
//! the logging facility and the command core:
//!
//! - **Identifiers**: CommandId, AuditEntryId, RequestId
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::{AuditEntryId, CommandId, RequestId};
