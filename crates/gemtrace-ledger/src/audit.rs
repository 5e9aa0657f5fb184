//! Audit trail queries
//!
//! One entry is appended per committed mutation, in the same batch as the
//! mutation itself. Entries are never edited or removed.

use gemtrace_core::{AuditEntry, DiamondHash, Operation, Principal, Timestamp};
use std::ops::Range;

use crate::ledger::Ledger;

/// Conjunctive filter over audit entries
///
/// Every field left as `None` matches everything. The time window is
/// inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub principal: Option<Principal>,
    pub target: Option<DiamondHash>,
    pub operation: Option<Operation>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub failures_only: bool,
}

impl AuditFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn principal(mut self, principal: impl Into<Principal>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub fn target(mut self, hash: DiamondHash) -> Self {
        self.target = Some(hash);
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn between(mut self, from: Timestamp, to: Timestamp) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn failures_only(mut self) -> Self {
        self.failures_only = true;
        self
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.principal.as_ref().map_or(true, |p| &entry.principal == p)
            && self
                .target
                .as_ref()
                .map_or(true, |hash| entry.target.as_ref() == Some(hash))
            && self.operation.map_or(true, |op| entry.operation == op)
            && self.from.map_or(true, |from| entry.timestamp >= from)
            && self.to.map_or(true, |to| entry.timestamp <= to)
            && (!self.failures_only || !entry.outcome.is_success())
    }
}

impl Ledger {
    /// Matching audit entries in append order
    pub fn query_logs(&self, filter: &AuditFilter) -> Vec<AuditEntry> {
        self.store.scan_audit(&|entry: &AuditEntry| filter.matches(entry))
    }

    /// Entries with sequence numbers in `range`, clamped to what exists
    pub fn audit_range(&self, range: Range<u64>) -> Vec<AuditEntry> {
        self.store.audit_range(range)
    }

    pub fn audit_len(&self) -> u64 {
        self.store.audit_len()
    }
}
