use std::collections::HashMap;

use aquaguard_core_types::CommandId;
use chrono::{DateTime, Utc};

use crate::errors::{CommandError, Result};
use crate::model::CommandRequest;

#[derive(Debug, Clone)]
struct PendingEntry {
    request: CommandRequest,
    /// Set while a gateway dispatch for this command is outstanding
    dispatching: bool,
}

/// In-memory registry of non-terminal commands
///
/// Not thread-safe on its own; `CommandService` keeps it behind the same
/// mutex as the audit log so that every check-then-remove sequence is atomic.
#[derive(Debug, Clone, Default)]
pub struct CommandStore {
    pending: HashMap<CommandId, PendingEntry>,
}

impl CommandStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a newly created command
    ///
    /// Command ids are generated fresh, so an existing entry under the same
    /// id is never overwritten.
    pub fn insert(&mut self, request: CommandRequest) {
        self.pending
            .entry(request.id.clone())
            .or_insert(PendingEntry {
                request,
                dispatching: false,
            });
    }

    /// # Errors
    ///
    /// Returns `CommandNotFound` if the id is not pending.
    pub fn get(&self, id: &CommandId) -> Result<&CommandRequest> {
        self.pending
            .get(id)
            .map(|e| &e.request)
            .ok_or_else(|| not_found(id))
    }

    /// Delete a command on a terminal transition
    ///
    /// # Errors
    ///
    /// Returns `CommandNotFound` if the id is not pending.
    pub fn remove(&mut self, id: &CommandId) -> Result<CommandRequest> {
        self.pending
            .remove(id)
            .map(|e| e.request)
            .ok_or_else(|| not_found(id))
    }

    pub fn is_dispatching(&self, id: &CommandId) -> bool {
        self.pending.get(id).is_some_and(|e| e.dispatching)
    }

    /// Mark a command as handed to the gateway
    ///
    /// # Errors
    ///
    /// Returns `CommandNotFound` if the id is not pending, or
    /// `CommandInFlight` if it is already dispatching.
    pub fn begin_dispatch(&mut self, id: &CommandId) -> Result<&CommandRequest> {
        let entry = self.pending.get_mut(id).ok_or_else(|| not_found(id))?;
        if entry.dispatching {
            return Err(CommandError::CommandInFlight {
                command_id: id.clone(),
            });
        }
        entry.dispatching = true;
        Ok(&entry.request)
    }

    /// Return a dispatching command to plain pending state
    pub fn abandon_dispatch(&mut self, id: &CommandId) {
        if let Some(entry) = self.pending.get_mut(id) {
            entry.dispatching = false;
        }
    }

    /// All pending commands, oldest first
    pub fn list(&self) -> Vec<&CommandRequest> {
        let mut commands: Vec<&CommandRequest> =
            self.pending.values().map(|e| &e.request).collect();
        commands.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        commands
    }

    /// Ids of commands past expiry that are not mid-dispatch, oldest first
    pub fn expired_ids(&self, now: DateTime<Utc>) -> Vec<CommandId> {
        self.list()
            .into_iter()
            .filter(|c| c.is_expired_at(now) && !self.is_dispatching(&c.id))
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn not_found(id: &CommandId) -> CommandError {
    CommandError::CommandNotFound {
        command_id: id.clone(),
    }
}
