//! Ownership chain
//!
//! Every transfer appends one event whose `previous_owner` is the owner at
//! that moment, so replaying the log from the miner reproduces the current
//! owner exactly.

use gemtrace_core::validation::validate_principal;
use gemtrace_core::{
    DiamondHash, DiamondStatus, Field, Operation, OwnershipEvent, Principal, ValidationError,
};
use thiserror::Error;

use crate::error::{Result, StateViolation};
use crate::ledger::Ledger;
use crate::observer::TransferNotice;
use crate::storage::{LogKind, Mutation};

/// Point where an ownership log stops linking up
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("event {seq} names '{found}' as previous owner, expected '{expected}'")]
pub struct ChainBreak {
    pub seq: u64,
    pub expected: Principal,
    pub found: Principal,
}

/// Replay an ownership log starting from the registering miner
///
/// Returns the owner after the last event.
pub fn replay_owner(miner: &Principal, events: &[OwnershipEvent]) -> std::result::Result<Principal, ChainBreak> {
    let mut owner = miner.clone();
    for event in events {
        if event.previous_owner != owner {
            return Err(ChainBreak {
                seq: event.seq,
                expected: owner,
                found: event.previous_owner.clone(),
            });
        }
        owner = event.new_owner.clone();
    }
    Ok(owner)
}

impl Ledger {
    /// Transfer a diamond to `new_owner`
    ///
    /// `supply_chain_ref` optionally points at the supply-chain event (for
    /// instance a sale) that the transfer settles.
    pub fn transfer_ownership(
        &self,
        caller: &Principal,
        hash: &DiamondHash,
        new_owner: &Principal,
        supply_chain_ref: Option<u64>,
    ) -> Result<OwnershipEvent> {
        self.execute(caller, Operation::TransferOwnership, Some(hash.clone()), |tx| {
            let mut record = self.load(hash)?;
            self.require_owner(&record, caller)?;

            validate_principal(new_owner, Field::NewOwner)?;
            if new_owner == caller {
                return Err(ValidationError::new(Field::NewOwner, "already owns this diamond").into());
            }
            if let Some(index) = supply_chain_ref {
                if index >= self.store.log_len(LogKind::SupplyChain, hash) {
                    return Err(ValidationError::new(
                        Field::SupplyChainRef,
                        format!("no supply-chain event {}", index),
                    )
                    .into());
                }
            }

            if record.locked {
                return Err(StateViolation::Locked(hash.clone()).into());
            }
            if record.status == DiamondStatus::Disputed {
                return Err(StateViolation::Disputed(hash.clone()).into());
            }

            let event = OwnershipEvent {
                seq: self.store.log_len(LogKind::Ownership, hash),
                previous_owner: caller.clone(),
                new_owner: new_owner.clone(),
                timestamp: tx.at(),
                supply_chain_ref,
            };

            record.owner = new_owner.clone();
            record.updated_at = tx.at();

            tx.notify_transfer(TransferNotice {
                hash: hash.clone(),
                previous_owner: caller.clone(),
                new_owner: new_owner.clone(),
                timestamp: tx.at(),
                ownership_seq: event.seq,
            });
            tx.push(Mutation::UpdateDiamond(record));
            tx.push(Mutation::AppendOwnership(hash.clone(), event.clone()));
            Ok(event)
        })
    }

    /// Ownership events in append order; empty for unknown hashes
    pub fn ownership_history(&self, hash: &DiamondHash) -> Vec<OwnershipEvent> {
        self.store.ownership_history(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemtrace_core::Timestamp;

    fn event(seq: u64, from: &str, to: &str) -> OwnershipEvent {
        OwnershipEvent {
            seq,
            previous_owner: from.into(),
            new_owner: to.into(),
            timestamp: Timestamp(seq + 1),
            supply_chain_ref: None,
        }
    }

    #[test]
    fn test_replay_empty_log_is_miner() {
        assert_eq!(replay_owner(&"miner".into(), &[]).unwrap(), Principal::new("miner"));
    }

    #[test]
    fn test_replay_follows_chain() {
        let events = [event(0, "miner", "cutter"), event(1, "cutter", "retailer")];
        assert_eq!(
            replay_owner(&"miner".into(), &events).unwrap(),
            Principal::new("retailer")
        );
    }

    #[test]
    fn test_replay_reports_break() {
        let events = [event(0, "miner", "cutter"), event(1, "thief", "fence")];
        let err = replay_owner(&"miner".into(), &events).unwrap_err();
        assert_eq!(err.seq, 1);
        assert_eq!(err.expected, Principal::new("cutter"));
        assert_eq!(err.found, Principal::new("thief"));
    }
}
