//! Supply-chain log
//!
//! Custody events (export, cut, polish, inspection, import, sale) reported
//! by the actor who performed them. The event kind decides which role may
//! log it.

use gemtrace_core::validation::validate_detail;
use gemtrace_core::{
    DiamondHash, Operation, Principal, Role, SupplyChainEvent, SupplyChainEventKind, SUPPLY_CHAIN_ROLES,
};

use crate::error::Result;
use crate::ledger::Ledger;
use crate::storage::{LogKind, Mutation};

impl Ledger {
    pub fn log_event(
        &self,
        caller: &Principal,
        hash: &DiamondHash,
        event_type: &str,
        detail: &str,
    ) -> Result<SupplyChainEvent> {
        self.execute(caller, Operation::LogSupplyChainEvent, Some(hash.clone()), |tx| {
            let kind = event_type.parse::<SupplyChainEventKind>();

            // Unknown kinds are checked against every supply-chain role
            let allowed: &[Role] = match &kind {
                Ok(kind) => kind.allowed_roles(),
                Err(_) => &SUPPLY_CHAIN_ROLES,
            };
            self.require_any_role(caller, allowed)?;
            self.load(hash)?;

            let kind = kind?;
            validate_detail(detail)?;

            let event = SupplyChainEvent {
                seq: self.store.log_len(LogKind::SupplyChain, hash),
                kind,
                actor: caller.clone(),
                timestamp: tx.at(),
                detail: detail.to_string(),
            };
            tx.push(Mutation::AppendSupplyChain(hash.clone(), event.clone()));
            Ok(event)
        })
    }

    /// Supply-chain events in append order; empty for unknown hashes
    pub fn supply_chain_events(&self, hash: &DiamondHash) -> Vec<SupplyChainEvent> {
        self.store.supply_chain_events(hash)
    }
}
