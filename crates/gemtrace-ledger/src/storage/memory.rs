//! In-memory storage backend
//!
//! Default storage implementation using in-memory hashmaps behind a single
//! lock. Data is lost on restart.

use gemtrace_core::log::check_continuation;
use gemtrace_core::{
    AppendLog, AuditEntry, AuthorityRecord, CertificationEntry, DiamondHash, DiamondRecord,
    DisputeEntry, OwnershipEvent, Principal, Sequenced, SupplyChainEvent,
};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use super::{Controls, LedgerStore, LogKind, Mutation, StorageError, WriteBatch};

#[derive(Debug, Default)]
struct State {
    paused: bool,
    admin: Option<Principal>,
    authorities: HashMap<Principal, AuthorityRecord>,
    diamonds: HashMap<DiamondHash, DiamondRecord>,
    certifications: HashMap<DiamondHash, AppendLog<CertificationEntry>>,
    ownership: HashMap<DiamondHash, AppendLog<OwnershipEvent>>,
    supply_chain: HashMap<DiamondHash, AppendLog<SupplyChainEvent>>,
    disputes: HashMap<DiamondHash, AppendLog<DisputeEntry>>,
    audit: AppendLog<AuditEntry>,
}

/// Writes of one batch, held apart from live state
///
/// Log appends are kept as the new entries only, already checked against the
/// live log they extend. Nothing here is visible to readers until
/// [`Staged::merge_into`].
#[derive(Default)]
struct Staged {
    paused: Option<bool>,
    admin: Option<Principal>,
    authorities: HashMap<Principal, AuthorityRecord>,
    diamonds: HashMap<DiamondHash, DiamondRecord>,
    certifications: HashMap<DiamondHash, Vec<CertificationEntry>>,
    ownership: HashMap<DiamondHash, Vec<OwnershipEvent>>,
    supply_chain: HashMap<DiamondHash, Vec<SupplyChainEvent>>,
    disputes: HashMap<DiamondHash, Vec<DisputeEntry>>,
}

fn stage_append<T: Sequenced>(
    staged: &mut HashMap<DiamondHash, Vec<T>>,
    live: &HashMap<DiamondHash, AppendLog<T>>,
    hash: DiamondHash,
    entry: T,
) -> Result<(), StorageError> {
    let current = live.get(&hash);
    let pending = staged.entry(hash).or_default();

    let next_seq = current.map_or(0, |log| log.len()) + pending.len() as u64;
    let last = pending
        .last()
        .or_else(|| current.and_then(|log| log.last()))
        .map(Sequenced::timestamp);
    check_continuation(next_seq, last, &entry)?;

    pending.push(entry);
    Ok(())
}

fn merge_appends<T: Sequenced>(
    staged: HashMap<DiamondHash, Vec<T>>,
    live: &mut HashMap<DiamondHash, AppendLog<T>>,
) -> Result<(), StorageError> {
    for (hash, entries) in staged {
        live.entry(hash).or_default().append_all(entries)?;
    }
    Ok(())
}

impl Staged {
    fn has_diamond(&self, state: &State, hash: &DiamondHash) -> bool {
        self.diamonds.contains_key(hash) || state.diamonds.contains_key(hash)
    }

    fn require_diamond(&self, state: &State, hash: &DiamondHash) -> Result<(), StorageError> {
        if self.has_diamond(state, hash) {
            Ok(())
        } else {
            Err(StorageError::NotFound(format!("diamond {}", hash)))
        }
    }

    fn stage(&mut self, state: &State, mutation: Mutation) -> Result<(), StorageError> {
        match mutation {
            Mutation::SetAdmin(admin) => self.admin = Some(admin),
            Mutation::SetPaused(paused) => self.paused = Some(paused),
            Mutation::PutAuthority(record) => {
                self.authorities.insert(record.principal.clone(), record);
            }
            Mutation::InsertDiamond(record) => {
                if self.has_diamond(state, &record.hash) {
                    return Err(StorageError::AlreadyExists(format!("diamond {}", record.hash)));
                }
                self.diamonds.insert(record.hash.clone(), record);
            }
            Mutation::UpdateDiamond(record) => {
                self.require_diamond(state, &record.hash)?;
                self.diamonds.insert(record.hash.clone(), record);
            }
            Mutation::AppendCertification(hash, entry) => {
                self.require_diamond(state, &hash)?;
                stage_append(&mut self.certifications, &state.certifications, hash, entry)?;
            }
            Mutation::AppendOwnership(hash, event) => {
                self.require_diamond(state, &hash)?;
                stage_append(&mut self.ownership, &state.ownership, hash, event)?;
            }
            Mutation::AppendSupplyChain(hash, event) => {
                self.require_diamond(state, &hash)?;
                stage_append(&mut self.supply_chain, &state.supply_chain, hash, event)?;
            }
            Mutation::AppendDispute(hash, entry) => {
                self.require_diamond(state, &hash)?;
                stage_append(&mut self.disputes, &state.disputes, hash, entry)?;
            }
        }
        Ok(())
    }

    /// Apply the batch to live state
    ///
    /// Appends were checked against the live logs while staging under the
    /// same write lock, so they cannot fail here.
    fn merge_into(self, state: &mut State) -> Result<(), StorageError> {
        if let Some(paused) = self.paused {
            state.paused = paused;
        }
        if let Some(admin) = self.admin {
            state.admin = Some(admin);
        }
        state.authorities.extend(self.authorities);
        state.diamonds.extend(self.diamonds);
        merge_appends(self.certifications, &mut state.certifications)?;
        merge_appends(self.ownership, &mut state.ownership)?;
        merge_appends(self.supply_chain, &mut state.supply_chain)?;
        merge_appends(self.disputes, &mut state.disputes)
    }
}

/// In-memory ledger store implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Create a new, uninitialized in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    // A panic cannot leave `State` half-written: commits stage and check
    // everything before merging, so a poisoned lock is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn entries_of<T: Sequenced + Clone>(
    logs: &HashMap<DiamondHash, AppendLog<T>>,
    hash: &DiamondHash,
) -> Vec<T> {
    logs.get(hash)
        .map(|log| log.as_slice().to_vec())
        .unwrap_or_default()
}

fn len_of<T: Sequenced>(logs: &HashMap<DiamondHash, AppendLog<T>>, hash: &DiamondHash) -> u64 {
    logs.get(hash).map(AppendLog::len).unwrap_or(0)
}

impl LedgerStore for MemoryStore {
    fn controls(&self) -> Controls {
        let state = self.read();
        Controls {
            paused: state.paused,
            admin: state.admin.clone(),
        }
    }

    fn authority(&self, principal: &Principal) -> Option<AuthorityRecord> {
        self.read().authorities.get(principal).cloned()
    }

    fn authorities(&self) -> Vec<AuthorityRecord> {
        let mut records: Vec<_> = self.read().authorities.values().cloned().collect();
        records.sort_by(|a, b| a.principal.cmp(&b.principal));
        records
    }

    fn diamond(&self, hash: &DiamondHash) -> Option<DiamondRecord> {
        self.read().diamonds.get(hash).cloned()
    }

    fn diamond_count(&self) -> usize {
        self.read().diamonds.len()
    }

    fn certifications(&self, hash: &DiamondHash) -> Vec<CertificationEntry> {
        entries_of(&self.read().certifications, hash)
    }

    fn ownership_history(&self, hash: &DiamondHash) -> Vec<OwnershipEvent> {
        entries_of(&self.read().ownership, hash)
    }

    fn supply_chain_events(&self, hash: &DiamondHash) -> Vec<SupplyChainEvent> {
        entries_of(&self.read().supply_chain, hash)
    }

    fn disputes(&self, hash: &DiamondHash) -> Vec<DisputeEntry> {
        entries_of(&self.read().disputes, hash)
    }

    fn log_len(&self, kind: LogKind, hash: &DiamondHash) -> u64 {
        let state = self.read();
        match kind {
            LogKind::Certification => len_of(&state.certifications, hash),
            LogKind::Ownership => len_of(&state.ownership, hash),
            LogKind::SupplyChain => len_of(&state.supply_chain, hash),
            LogKind::Dispute => len_of(&state.disputes, hash),
        }
    }

    fn audit_len(&self) -> u64 {
        self.read().audit.len()
    }

    fn audit_range(&self, range: Range<u64>) -> Vec<AuditEntry> {
        self.read().audit.range(range).to_vec()
    }

    fn scan_audit(&self, keep: &dyn Fn(&AuditEntry) -> bool) -> Vec<AuditEntry> {
        self.read()
            .audit
            .iter()
            .filter(|entry| keep(entry))
            .cloned()
            .collect()
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut state = self.write();

        let mut staged = Staged::default();
        for mutation in batch.mutations {
            staged.stage(&state, mutation)?;
        }

        // The audit entry is checked before anything staged becomes visible
        state.audit.check_append(&batch.audit)?;
        staged.merge_into(&mut state)?;
        let seq = state.audit.append(batch.audit)?;

        debug!(audit_seq = seq, "Committed write batch");
        Ok(())
    }
}
