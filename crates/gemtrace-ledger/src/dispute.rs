//! Disputes
//!
//! The only path into and out of `Disputed`. Only an arbiter opens or
//! resolves a dispute; the owner may attach evidence to an open one.

use gemtrace_core::validation::validate_dispute_text;
use gemtrace_core::{
    check_transition, DiamondHash, DiamondRecord, DiamondStatus, DisputeAction, DisputeEntry,
    Field, Operation, Principal, Role, TransitionSource,
};

use crate::error::{LedgerError, Result, StateViolation};
use crate::ledger::{Ledger, Transaction};
use crate::storage::{LogKind, Mutation};

impl Ledger {
    fn require_owner_or_arbiter(&self, record: &DiamondRecord, caller: &Principal) -> Result<()> {
        if &record.owner == caller || self.has_role(caller, Role::Arbiter) {
            Ok(())
        } else {
            Err(LedgerError::missing_role(caller, &[Role::Arbiter]))
        }
    }

    fn stage_dispute_entry(
        &self,
        tx: &mut Transaction,
        caller: &Principal,
        hash: &DiamondHash,
        action: DisputeAction,
    ) -> DisputeEntry {
        let entry = DisputeEntry {
            seq: self.store.log_len(LogKind::Dispute, hash),
            actor: caller.clone(),
            timestamp: tx.at(),
            action,
        };
        tx.push(Mutation::AppendDispute(hash.clone(), entry.clone()));
        entry
    }

    /// Move a diamond into `Disputed`
    ///
    /// Transfers are blocked until the dispute is resolved.
    pub fn raise_dispute(
        &self,
        caller: &Principal,
        hash: &DiamondHash,
        reason: &str,
    ) -> Result<DisputeEntry> {
        self.execute(caller, Operation::RaiseDispute, Some(hash.clone()), |tx| {
            self.require_any_role(caller, &[Role::Arbiter])?;
            let mut record = self.load(hash)?;
            validate_dispute_text(reason, Field::Reason)?;
            check_transition(record.status, DiamondStatus::Disputed, TransitionSource::Dispute)?;

            let prior_status = record.status;
            record.status = DiamondStatus::Disputed;
            record.updated_at = tx.at();
            tx.push(Mutation::UpdateDiamond(record));

            Ok(self.stage_dispute_entry(
                tx,
                caller,
                hash,
                DisputeAction::Raised {
                    reason: reason.trim().to_string(),
                    prior_status,
                },
            ))
        })
    }

    pub fn add_dispute_evidence(
        &self,
        caller: &Principal,
        hash: &DiamondHash,
        detail: &str,
    ) -> Result<DisputeEntry> {
        self.execute(caller, Operation::AddDisputeEvidence, Some(hash.clone()), |tx| {
            let record = self.load(hash)?;
            self.require_owner_or_arbiter(&record, caller)?;
            validate_dispute_text(detail, Field::Evidence)?;
            if record.status != DiamondStatus::Disputed {
                return Err(StateViolation::NotDisputed(hash.clone()).into());
            }

            Ok(self.stage_dispute_entry(
                tx,
                caller,
                hash,
                DisputeAction::Evidence {
                    detail: detail.trim().to_string(),
                },
            ))
        })
    }

    /// Close a dispute, restoring the diamond to `outcome`
    ///
    /// `outcome` is `Registered` when certification must start over and
    /// `Certified` when the dispute is dismissed.
    pub fn resolve_dispute(
        &self,
        caller: &Principal,
        hash: &DiamondHash,
        outcome: DiamondStatus,
    ) -> Result<DisputeEntry> {
        self.execute(caller, Operation::ResolveDispute, Some(hash.clone()), |tx| {
            self.require_any_role(caller, &[Role::Arbiter])?;
            let mut record = self.load(hash)?;
            if record.status != DiamondStatus::Disputed {
                return Err(StateViolation::NotDisputed(hash.clone()).into());
            }
            check_transition(record.status, outcome, TransitionSource::Dispute)?;

            record.status = outcome;
            record.updated_at = tx.at();
            tx.push(Mutation::UpdateDiamond(record));

            Ok(self.stage_dispute_entry(tx, caller, hash, DisputeAction::Resolved { outcome }))
        })
    }

    /// Dispute entries in append order; empty for unknown hashes
    pub fn disputes(&self, hash: &DiamondHash) -> Vec<DisputeEntry> {
        self.store.disputes(hash)
    }
}
