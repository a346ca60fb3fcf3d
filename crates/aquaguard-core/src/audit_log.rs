//! Bounded, append-only audit trail
//!
//! Entries are kept most-recent-first. Once the configured capacity is
//! reached, each append evicts exactly the oldest entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::model::{AuditAction, AuditLogEntry, CommandSource, RiskLevel};

/// Conjunctive filters plus offset/limit pagination for audit queries
///
/// Every `Some` filter must match. `start` and `end` are inclusive. A `None`
/// limit falls back to the configured default page size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditQuery {
    pub plant_id: Option<String>,
    pub action: Option<AuditAction>,
    pub risk_level: Option<RiskLevel>,
    pub source: Option<CommandSource>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plant(mut self, plant_id: impl Into<String>) -> Self {
        self.plant_id = Some(plant_id.into());
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn risk_level(mut self, level: RiskLevel) -> Self {
        self.risk_level = Some(level);
        self
    }

    pub fn source(mut self, source: CommandSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.plant_id.as_deref().map_or(true, |p| entry.plant_id == p)
            && self.action.map_or(true, |a| entry.action == a)
            && self.risk_level.map_or(true, |r| entry.risk_level == r)
            && self.source.map_or(true, |s| entry.source == s)
            && self.start.map_or(true, |s| entry.timestamp >= s)
            && self.end.map_or(true, |e| entry.timestamp <= e)
    }
}

/// Aggregate counts over the (optionally plant-scoped) log
///
/// `by_risk_level` and `by_source` count `executed` entries only and list
/// every tier and source, zero included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStats {
    pub total: usize,
    pub executed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub expired: usize,
    pub confirmed: usize,
    pub by_risk_level: BTreeMap<RiskLevel, usize>,
    pub by_source: BTreeMap<CommandSource, usize>,
}

impl Default for AuditStats {
    fn default() -> Self {
        Self {
            total: 0,
            executed: 0,
            failed: 0,
            cancelled: 0,
            expired: 0,
            confirmed: 0,
            by_risk_level: RiskLevel::ALL.into_iter().map(|l| (l, 0)).collect(),
            by_source: CommandSource::ALL.into_iter().map(|s| (s, 0)).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    entries: VecDeque<AuditLogEntry>,
    capacity: usize,
}

impl AuditLog {
    /// A capacity of zero is raised to one
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Prepend an entry, returning the evicted oldest entry if the log was full
    pub fn append(&mut self, entry: AuditLogEntry) -> Option<AuditLogEntry> {
        self.entries.push_front(entry);
        if self.entries.len() > self.capacity {
            self.entries.pop_back()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// All retained entries, most recent first
    pub fn entries(&self) -> impl Iterator<Item = &AuditLogEntry> {
        self.entries.iter()
    }

    pub fn query(&self, query: &AuditQuery, default_limit: usize) -> Vec<AuditLogEntry> {
        let limit = query.limit.unwrap_or(default_limit);
        self.entries
            .iter()
            .filter(|e| query.matches(e))
            .skip(query.offset)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn stats(&self, plant_id: Option<&str>) -> AuditStats {
        let mut stats = AuditStats::default();

        for entry in self
            .entries
            .iter()
            .filter(|e| plant_id.map_or(true, |p| e.plant_id == p))
        {
            stats.total += 1;
            match entry.action {
                AuditAction::Executed => {
                    stats.executed += 1;
                    *stats.by_risk_level.entry(entry.risk_level).or_insert(0) += 1;
                    *stats.by_source.entry(entry.source).or_insert(0) += 1;
                }
                AuditAction::Failed => stats.failed += 1,
                AuditAction::Cancelled => stats.cancelled += 1,
                AuditAction::Expired => stats.expired += 1,
                AuditAction::Confirmed => stats.confirmed += 1,
                AuditAction::Created => {}
            }
        }

        stats
    }
}
