//! Verification service: read-only answers for buyers and auditors

use gemtrace_core::log::verify_sequence;
use gemtrace_core::{
    AppendError, CertificationEntry, CertificationStage, DiamondHash, DiamondRecord,
    DiamondStatus, DisputeAction, DisputeEntry, OwnershipEvent, Principal, Sequenced,
    SupplyChainEvent,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::StagePolicy;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::ownership::{replay_owner, ChainBreak};

/// Complete history of one diamond
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub record: DiamondRecord,
    pub certifications: Vec<CertificationEntry>,
    pub ownership_history: Vec<OwnershipEvent>,
    pub supply_chain_events: Vec<SupplyChainEvent>,
    pub disputes: Vec<DisputeEntry>,
}

impl Provenance {
    /// Pretty-printed JSON export
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Why a diamond is or is not conflict-free
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictFreeReport {
    pub hash: DiamondHash,
    pub status: DiamondStatus,
    pub required_stages: Vec<CertificationStage>,
    /// Required stages with no positive certification
    pub missing_stages: Vec<CertificationStage>,
    /// Sequence numbers of certifications asserting not conflict-free
    pub negative_entries: Vec<u64>,
    pub disputed: bool,
    pub conflict_free: bool,
}

/// Evaluate the conflict-free rule for one record
///
/// Conflict-free iff the record is not disputed, no certification asserts
/// `false`, and every stage the policy requires for the current status has
/// at least one positive certification.
pub fn assess(
    record: &DiamondRecord,
    certifications: &[CertificationEntry],
    policy: &StagePolicy,
) -> ConflictFreeReport {
    let required_stages = policy.required_for(record.status);
    let missing_stages: Vec<_> = required_stages
        .iter()
        .copied()
        .filter(|stage| {
            !certifications
                .iter()
                .any(|entry| entry.stage == *stage && entry.conflict_free)
        })
        .collect();
    let negative_entries: Vec<_> = certifications
        .iter()
        .filter(|entry| !entry.conflict_free)
        .map(|entry| entry.seq)
        .collect();
    let disputed = record.status == DiamondStatus::Disputed;

    ConflictFreeReport {
        hash: record.hash.clone(),
        status: record.status,
        conflict_free: !disputed && missing_stages.is_empty() && negative_entries.is_empty(),
        required_stages,
        missing_stages,
        negative_entries,
        disputed,
    }
}

/// Cross-store inconsistency found by [`Ledger::check_consistency`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("diamond {0} is not registered")]
    NotFound(DiamondHash),

    #[error("{log} log of {hash} is malformed: {source}")]
    Sequence {
        hash: DiamondHash,
        log: &'static str,
        #[source]
        source: AppendError,
    },

    #[error("{log} log of {hash} has entry {seq} older than the registration")]
    BeforeRegistration {
        hash: DiamondHash,
        log: &'static str,
        seq: u64,
    },

    #[error("ownership chain of {hash} is broken: {source}")]
    BrokenChain {
        hash: DiamondHash,
        #[source]
        source: ChainBreak,
    },

    #[error("replayed owner of {hash} is '{replayed}' but the record names '{recorded}'")]
    OwnerMismatch {
        hash: DiamondHash,
        replayed: Principal,
        recorded: Principal,
    },

    #[error("ownership event {seq} of {hash} refers to missing supply-chain event {reference}")]
    DanglingReference {
        hash: DiamondHash,
        seq: u64,
        reference: u64,
    },

    #[error("status of {hash} is {status} but its dispute log is {log_state}")]
    DisputeMismatch {
        hash: DiamondHash,
        status: DiamondStatus,
        log_state: &'static str,
    },
}

fn check_log<T: Sequenced>(
    hash: &DiamondHash,
    log: &'static str,
    entries: &[T],
    registered_at: gemtrace_core::Timestamp,
) -> std::result::Result<(), IntegrityError> {
    verify_sequence(entries).map_err(|source| IntegrityError::Sequence {
        hash: hash.clone(),
        log,
        source,
    })?;
    if let Some(early) = entries.iter().find(|e| e.timestamp() < registered_at) {
        return Err(IntegrityError::BeforeRegistration {
            hash: hash.clone(),
            log,
            seq: early.seq(),
        });
    }
    Ok(())
}

/// Whether the dispute log ends with an unresolved dispute
fn dispute_open(disputes: &[DisputeEntry]) -> bool {
    disputes
        .last()
        .map_or(false, |entry| !matches!(entry.action, DisputeAction::Resolved { .. }))
}

impl Ledger {
    pub fn provenance(&self, hash: &DiamondHash) -> Result<Provenance> {
        let record = self.load(hash)?;
        debug!(hash = %hash, "Assembling provenance");

        Ok(Provenance {
            record,
            certifications: self.store.certifications(hash),
            ownership_history: self.store.ownership_history(hash),
            supply_chain_events: self.store.supply_chain_events(hash),
            disputes: self.store.disputes(hash),
        })
    }

    pub fn assess_conflict_free(&self, hash: &DiamondHash) -> Result<ConflictFreeReport> {
        let record = self.load(hash)?;
        let report = assess(
            &record,
            &self.store.certifications(hash),
            &self.config.stage_policy,
        );
        debug!(
            hash = %hash,
            conflict_free = report.conflict_free,
            missing = report.missing_stages.len(),
            negative = report.negative_entries.len(),
            "Assessed conflict-free status"
        );
        Ok(report)
    }

    pub fn verify_conflict_free(&self, hash: &DiamondHash) -> Result<bool> {
        self.assess_conflict_free(hash).map(|report| report.conflict_free)
    }

    /// Replay the ownership log and compare it with the stored owner
    pub fn verify_ownership_chain(
        &self,
        hash: &DiamondHash,
    ) -> std::result::Result<Principal, IntegrityError> {
        let record = self
            .store
            .diamond(hash)
            .ok_or_else(|| IntegrityError::NotFound(hash.clone()))?;
        let events = self.store.ownership_history(hash);

        let replayed = replay_owner(&record.miner, &events).map_err(|source| {
            IntegrityError::BrokenChain {
                hash: hash.clone(),
                source,
            }
        })?;
        if replayed != record.owner {
            return Err(IntegrityError::OwnerMismatch {
                hash: hash.clone(),
                replayed,
                recorded: record.owner,
            });
        }
        Ok(replayed)
    }

    /// Check every invariant that spans the stores of one diamond
    pub fn check_consistency(&self, hash: &DiamondHash) -> std::result::Result<(), IntegrityError> {
        let record = self
            .store
            .diamond(hash)
            .ok_or_else(|| IntegrityError::NotFound(hash.clone()))?;
        let at = record.registered_at;

        let certifications = self.store.certifications(hash);
        let ownership = self.store.ownership_history(hash);
        let supply_chain = self.store.supply_chain_events(hash);
        let disputes = self.store.disputes(hash);

        check_log(hash, "certification", &certifications, at)?;
        check_log(hash, "ownership", &ownership, at)?;
        check_log(hash, "supply-chain", &supply_chain, at)?;
        check_log(hash, "dispute", &disputes, at)?;

        let supply_chain_len = supply_chain.len() as u64;
        for event in &ownership {
            if let Some(reference) = event.supply_chain_ref {
                if reference >= supply_chain_len {
                    return Err(IntegrityError::DanglingReference {
                        hash: hash.clone(),
                        seq: event.seq,
                        reference,
                    });
                }
            }
        }

        self.verify_ownership_chain(hash)?;

        let open = dispute_open(&disputes);
        let disputed = record.status == DiamondStatus::Disputed;
        if open != disputed {
            return Err(IntegrityError::DisputeMismatch {
                hash: hash.clone(),
                status: record.status,
                log_state: if open { "open" } else { "closed" },
            });
        }

        debug!(hash = %hash, "Consistency check passed");
        Ok(())
    }
}
