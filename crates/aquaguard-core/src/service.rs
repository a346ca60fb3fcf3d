//! Command service façade
//!
//! The single entry point for UI and automation callers. It composes the
//! risk classifier, command store, gateway and audit log.
//!
//! ## Consistency
//!
//! The store and the audit log live together in one `Ledger` behind a single
//! mutex. Every lifecycle transition (lookup, removal, audit append) happens
//! inside one critical section, so a command can reach a terminal state only
//! once and audit entries are appended in event order. The lock is never
//! held across the gateway await; instead the command is marked dispatching,
//! which makes concurrent execute/cancel/sweep of the same id back off.
//!
//! ## Logging Ownership
//!
//! Public operations log `start` / `end` / `end_error` through the
//! canonical macros. The store and audit log do not log.

use aquaguard_core_types::{CommandId, RequestId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::audit_log::{AuditLog, AuditQuery, AuditStats};
use crate::clock::{Clock, SystemClock};
use crate::config::ServiceConfig;
use crate::errors::{CommandError, ExError, ExErrorKind, Result};
use crate::executor::{EntropySource, Gateway, GatewayOutcome, SimulatedGateway, StdEntropy};
use crate::model::{
    AuditAction, AuditLogEntry, CommandConfirmation, CommandIntent, CommandRequest,
    CommandResult, CommandType, RiskLevel,
};
use crate::risk::{self, RiskDisplay};
use crate::store::CommandStore;
use crate::{log_op_end, log_op_error, log_op_start};

/// Actor recorded for transitions the service makes on its own
pub const SYSTEM_ACTOR: &str = "system";

struct Ledger {
    store: CommandStore,
    log: AuditLog,
}

impl Ledger {
    fn record(&mut self, entry: AuditLogEntry) {
        if let Some(evicted) = self.log.append(entry) {
            tracing::debug!(
                evicted_id = evicted.id.as_str(),
                capacity = self.log.capacity(),
                "audit log at capacity, evicted oldest entry"
            );
        }
    }

    fn expire(
        &mut self,
        id: &CommandId,
        actor: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<CommandRequest> {
        let command = self.store.remove(id)?;
        let details = format!("Command expired at {} before execution", command.expires_at);
        self.record(AuditLogEntry::for_command(
            &command,
            AuditAction::Expired,
            actor,
            details,
            now,
        ));
        Ok(command)
    }
}

/// Builder for a `CommandService` with injected collaborators
///
/// Anything not supplied falls back to the production default: the system
/// clock, OS-seeded entropy, and a `SimulatedGateway` driven by that entropy.
pub struct CommandServiceBuilder {
    config: ServiceConfig,
    clock: Option<Arc<dyn Clock>>,
    entropy: Option<Arc<dyn EntropySource>>,
    gateway: Option<Arc<dyn Gateway>>,
}

impl CommandServiceBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Entropy for the default simulated gateway; ignored when a gateway is
    /// supplied
    pub fn entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = Some(entropy);
        self
    }

    pub fn gateway(mut self, gateway: Arc<dyn Gateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// # Errors
    ///
    /// Returns an `InvalidConfig` error if the configuration fails validation.
    pub fn build(self) -> std::result::Result<CommandService, ExError> {
        self.config.validate().map_err(|e| {
            ExError::new(ExErrorKind::InvalidConfig)
                .with_op("build_command_service")
                .with_message("service configuration rejected")
                .with_source(e.into())
        })?;

        let gateway = match self.gateway {
            Some(gateway) => gateway,
            None => {
                let entropy = self
                    .entropy
                    .unwrap_or_else(|| Arc::new(StdEntropy::from_entropy()));
                Arc::new(SimulatedGateway::new(&self.config, entropy))
            }
        };

        Ok(CommandService {
            ledger: Mutex::new(Ledger {
                store: CommandStore::new(),
                log: AuditLog::with_capacity(self.config.audit_capacity),
            }),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            gateway,
            closed: AtomicBool::new(false),
            config: self.config,
        })
    }
}

pub struct CommandService {
    config: ServiceConfig,
    ledger: Mutex<Ledger>,
    clock: Arc<dyn Clock>,
    gateway: Arc<dyn Gateway>,
    closed: AtomicBool,
}

/// Clears the dispatching flag if an execute future is dropped mid-dispatch
struct DispatchGuard<'a> {
    service: &'a CommandService,
    id: &'a CommandId,
    armed: bool,
}

impl DispatchGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(
                command_id = self.id.as_str(),
                "dispatch abandoned before gateway outcome, command left pending"
            );
            self.service.lock().store.abandon_dispatch(self.id);
        }
    }
}

impl CommandService {
    /// Service with production collaborators
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfig` error if the configuration fails validation.
    pub fn new(config: ServiceConfig) -> std::result::Result<Self, ExError> {
        Self::builder(config).build()
    }

    pub fn builder(config: ServiceConfig) -> CommandServiceBuilder {
        CommandServiceBuilder {
            config,
            clock: None,
            entropy: None,
            gateway: None,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        // Critical sections never panic midway through a transition, so a
        // poisoned ledger is still consistent.
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(CommandError::ServiceClosed)
        } else {
            Ok(())
        }
    }

    /// Stop accepting mutating operations; the expiry reaper exits on its
    /// next tick
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::info!(pending = self.lock().store.len(), "command service closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // ---------- create ----------

    /// Store a new pending command and append its `created` entry
    ///
    /// The declared risk tier is kept as given; use
    /// [`CommandService::create_classified_command`] to derive it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a malformed intent and `ServiceClosed`
    /// after [`CommandService::close`].
    pub fn create_command(
        &self,
        intent: CommandIntent,
    ) -> std::result::Result<CommandRequest, ExError> {
        let request_id = RequestId::new();
        log_op_start!(
            "create_command",
            request_id = request_id.as_str(),
            plant_id = intent.plant_id.as_str(),
            equipment_id = intent.equipment_id.as_str()
        );
        let start = Instant::now();

        let command = self.create_command_impl(intent).map_err(|e| {
            log_op_error!(
                "create_command",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                request_id = request_id.as_str()
            );
            ExError::from(e)
                .with_op("create_command")
                .with_request_id(request_id.clone())
        })?;

        log_op_end!(
            "create_command",
            duration_ms = start.elapsed().as_millis() as u64,
            request_id = request_id.as_str(),
            command_id = command.id.as_str(),
            risk_level = command.risk_level.as_str()
        );
        Ok(command)
    }

    fn create_command_impl(&self, intent: CommandIntent) -> Result<CommandRequest> {
        self.ensure_open()?;
        intent.validate()?;

        let mut ledger = self.lock();
        let now = self.clock.now();
        let command = CommandRequest::from_intent(
            CommandId::generate(),
            intent,
            now,
            self.config.validity_window(),
        );

        let details = match &command.reasoning {
            Some(reasoning) => format!("Created: {} ({})", command.change_summary(), reasoning),
            None => format!("Created: {}", command.change_summary()),
        };
        ledger.store.insert(command.clone());
        ledger.record(AuditLogEntry::for_command(
            &command,
            AuditAction::Created,
            command.requested_by.clone(),
            details,
            now,
        ));
        Ok(command)
    }

    /// Raise the intent's risk tier to the classifier's verdict, then create
    ///
    /// # Errors
    ///
    /// Same as [`CommandService::create_command`].
    pub fn create_classified_command(
        &self,
        mut intent: CommandIntent,
    ) -> std::result::Result<CommandRequest, ExError> {
        intent.risk_level = risk::assess_intent(&intent);
        self.create_command(intent)
    }

    // ---------- execute ----------

    /// Confirm a pending command and dispatch it to the gateway
    ///
    /// Failures are rendered into the returned `CommandResult`:
    /// - not pending: `ERR_NOT_FOUND`, no audit entry
    /// - past expiry: `ERR_EXPIRED`, one `expired` entry, command removed
    /// - high/critical without override reason: `ERR_MISSING_OVERRIDE_REASON`,
    ///   command stays pending
    /// - already dispatching: `ERR_IN_FLIGHT`
    /// - gateway failure: `ERR_EXECUTION_FAILED`, one `failed` entry, command
    ///   removed
    pub async fn execute_command(
        &self,
        id: &CommandId,
        confirmation: CommandConfirmation,
    ) -> CommandResult {
        log_op_start!(
            "execute_command",
            command_id = id.as_str(),
            confirmed_by = confirmation.confirmed_by.as_str()
        );
        let start = Instant::now();

        match self.execute_command_impl(id, confirmation).await {
            Ok(result) => {
                log_op_end!(
                    "execute_command",
                    duration_ms = start.elapsed().as_millis() as u64,
                    command_id = id.as_str(),
                    estimated_effect_secs = result.estimated_effect_secs.unwrap_or_default()
                );
                result
            }
            Err(e) => {
                log_op_error!(
                    "execute_command",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    command_id = id.as_str()
                );
                CommandResult::failed(id.clone(), &e)
            }
        }
    }

    async fn execute_command_impl(
        &self,
        id: &CommandId,
        confirmation: CommandConfirmation,
    ) -> Result<CommandResult> {
        self.ensure_open()?;

        let command = {
            let mut ledger = self.lock();
            let now = self.clock.now();

            let command = ledger.store.get(id)?.clone();
            if ledger.store.is_dispatching(id) {
                return Err(CommandError::CommandInFlight {
                    command_id: id.clone(),
                });
            }

            if command.is_expired_at(now) {
                ledger.expire(id, &confirmation.confirmed_by, now)?;
                return Err(CommandError::CommandExpired {
                    command_id: id.clone(),
                    expired_at: command.expires_at,
                });
            }

            if command.requires_override_reason() && !confirmation.has_override_reason() {
                return Err(CommandError::MissingOverrideReason {
                    command_id: id.clone(),
                    risk_level: command.risk_level,
                });
            }

            ledger.record(AuditLogEntry::for_command(
                &command,
                AuditAction::Confirmed,
                confirmation.confirmed_by.clone(),
                confirmation_details(&confirmation),
                now,
            ));
            ledger.store.begin_dispatch(id)?;
            command
        };

        let guard = DispatchGuard {
            service: self,
            id,
            armed: true,
        };
        let outcome = self.gateway.dispatch(&command).await;
        guard.disarm();

        let mut ledger = self.lock();
        let now = self.clock.now();
        ledger.store.remove(id)?;

        match outcome {
            GatewayOutcome::Applied {
                estimated_effect_secs,
            } => {
                let details = format!(
                    "Executed: {}; effect visible in ~{}s",
                    command.change_summary(),
                    estimated_effect_secs
                );
                ledger.record(AuditLogEntry::for_command(
                    &command,
                    AuditAction::Executed,
                    confirmation.confirmed_by.clone(),
                    details,
                    now,
                ));

                let mut result = CommandResult::succeeded(
                    id.clone(),
                    format!("Command executed: {}", command.change_summary()),
                )
                .with_execution(now, estimated_effect_secs);
                if command.risk_level.requires_reason() {
                    result = result.with_warning(format!(
                        "{} change applied under override; monitor {} closely",
                        command.risk_level, command.equipment_name
                    ));
                }
                Ok(result)
            }
            GatewayOutcome::Rejected { diagnostic } => {
                ledger.record(AuditLogEntry::for_command(
                    &command,
                    AuditAction::Failed,
                    confirmation.confirmed_by.clone(),
                    diagnostic.clone(),
                    now,
                ));
                tracing::warn!(
                    command_id = id.as_str(),
                    equipment_id = command.equipment_id.as_str(),
                    diagnostic = diagnostic.as_str(),
                    "gateway rejected command"
                );
                Err(CommandError::ExecutionFailed {
                    command_id: id.clone(),
                    diagnostic,
                })
            }
        }
    }

    // ---------- cancel ----------

    /// Withdraw a pending command
    ///
    /// A missing id yields `ERR_NOT_FOUND` and appends nothing; a command
    /// that is mid-dispatch cannot be cancelled.
    pub fn cancel_command(
        &self,
        id: &CommandId,
        actor: &str,
        reason: Option<&str>,
    ) -> CommandResult {
        log_op_start!("cancel_command", command_id = id.as_str(), actor = actor);
        let start = Instant::now();

        match self.cancel_command_impl(id, actor, reason) {
            Ok(result) => {
                log_op_end!(
                    "cancel_command",
                    duration_ms = start.elapsed().as_millis() as u64,
                    command_id = id.as_str()
                );
                result
            }
            Err(e) => {
                log_op_error!(
                    "cancel_command",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    command_id = id.as_str()
                );
                CommandResult::failed(id.clone(), &e)
            }
        }
    }

    fn cancel_command_impl(
        &self,
        id: &CommandId,
        actor: &str,
        reason: Option<&str>,
    ) -> Result<CommandResult> {
        self.ensure_open()?;

        let mut ledger = self.lock();
        if ledger.store.is_dispatching(id) {
            return Err(CommandError::CommandInFlight {
                command_id: id.clone(),
            });
        }
        let command = ledger.store.remove(id)?;

        let details = match reason.map(str::trim).filter(|r| !r.is_empty()) {
            Some(reason) => format!("Cancelled: {}", reason),
            None => "Cancelled".to_string(),
        };
        let now = self.clock.now();
        ledger.record(AuditLogEntry::for_command(
            &command,
            AuditAction::Cancelled,
            actor,
            details,
            now,
        ));

        Ok(CommandResult::succeeded(
            id.clone(),
            format!("Command cancelled: {}", command.change_summary()),
        ))
    }

    // ---------- expiry ----------

    /// Transition every expired, non-dispatching command to `expired`
    ///
    /// Returns the ids that were expired, oldest first. Does nothing once the
    /// service is closed.
    pub fn sweep_expired(&self) -> Vec<CommandId> {
        if self.is_closed() {
            return Vec::new();
        }

        let mut ledger = self.lock();
        let now = self.clock.now();
        let expired: Vec<CommandId> = ledger
            .store
            .expired_ids(now)
            .into_iter()
            .filter(|id| ledger.expire(id, SYSTEM_ACTOR, now).is_ok())
            .collect();

        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expired stale pending commands");
        }
        expired
    }

    // ---------- queries ----------

    /// Pending commands, oldest first
    pub fn get_pending_commands(&self) -> Vec<CommandRequest> {
        self.lock().store.list().into_iter().cloned().collect()
    }

    pub fn get_pending_command(&self, id: &CommandId) -> Option<CommandRequest> {
        self.lock().store.get(id).ok().cloned()
    }

    /// Matching audit entries, most recent first
    pub fn get_audit_log(&self, query: &AuditQuery) -> Vec<AuditLogEntry> {
        self.lock().log.query(query, self.config.default_page_size)
    }

    pub fn get_audit_stats(&self, plant_id: Option<&str>) -> AuditStats {
        self.lock().log.stats(plant_id)
    }

    pub fn assess_command_risk(
        command_type: CommandType,
        parameter: &str,
        percent_change: f64,
    ) -> RiskLevel {
        risk::classify_risk(command_type, parameter, percent_change)
    }

    pub fn get_risk_display(level: RiskLevel) -> RiskDisplay {
        risk::risk_display(level)
    }
}

fn confirmation_details(confirmation: &CommandConfirmation) -> String {
    let mut details = format!("Confirmed by {}", confirmation.confirmed_by);
    if let Some(notes) = confirmation.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        details.push_str(&format!("; notes: {}", notes));
    }
    if confirmation.has_override_reason() {
        if let Some(reason) = &confirmation.override_reason {
            details.push_str(&format!("; override reason: {}", reason));
        }
    }
    details
}
