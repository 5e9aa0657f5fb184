//! Storage abstraction for the ledger
//!
//! The logical layout is five keyed stores (diamond records; certification,
//! ownership and supply-chain sequences keyed by hash; the global audit
//! trail), the dispute sequences, the authority table, and two scalars
//! (`paused`, `admin`).
//!
//! All writes of one operation travel in a single [`WriteBatch`]. A backend
//! must check every mutation in the batch before applying any of them, so a
//! rejected batch leaves no trace.

pub mod memory;

pub use memory::MemoryStore;

use gemtrace_core::{
    AppendError, AuditEntry, AuthorityRecord, CertificationEntry, DiamondHash, DiamondRecord,
    DisputeEntry, OwnershipEvent, Principal, SupplyChainEvent,
};
use std::fmt::Debug;
use std::ops::Range;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Append rejected: {0}")]
    Append(#[from] AppendError),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Process-wide scalars gating every mutation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Controls {
    pub paused: bool,
    /// `None` until the ledger is initialized
    pub admin: Option<Principal>,
}

/// Per-diamond append-only sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    Certification,
    Ownership,
    SupplyChain,
    Dispute,
}

/// A single staged write
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    SetAdmin(Principal),
    SetPaused(bool),
    PutAuthority(AuthorityRecord),
    /// Fails if the hash already exists
    InsertDiamond(DiamondRecord),
    /// Fails if the hash does not exist
    UpdateDiamond(DiamondRecord),
    AppendCertification(DiamondHash, CertificationEntry),
    AppendOwnership(DiamondHash, OwnershipEvent),
    AppendSupplyChain(DiamondHash, SupplyChainEvent),
    AppendDispute(DiamondHash, DisputeEntry),
}

/// Every write of one operation plus its audit entry
#[derive(Debug, Clone, PartialEq)]
pub struct WriteBatch {
    pub mutations: Vec<Mutation>,
    pub audit: AuditEntry,
}

/// Storage backend trait for ledger state
///
/// Reads never fail: an absent key is an empty result. Implementations must
/// be thread-safe and `commit` must be all-or-nothing.
pub trait LedgerStore: Send + Sync + Debug {
    // =========================================================================
    // Scalars and authorities
    // =========================================================================

    fn controls(&self) -> Controls;

    fn authority(&self, principal: &Principal) -> Option<AuthorityRecord>;

    fn authorities(&self) -> Vec<AuthorityRecord>;

    // =========================================================================
    // Diamond records and per-diamond logs
    // =========================================================================

    fn diamond(&self, hash: &DiamondHash) -> Option<DiamondRecord>;

    fn diamond_count(&self) -> usize;

    fn certifications(&self, hash: &DiamondHash) -> Vec<CertificationEntry>;

    fn ownership_history(&self, hash: &DiamondHash) -> Vec<OwnershipEvent>;

    fn supply_chain_events(&self, hash: &DiamondHash) -> Vec<SupplyChainEvent>;

    fn disputes(&self, hash: &DiamondHash) -> Vec<DisputeEntry>;

    /// Number of entries in one per-diamond log
    fn log_len(&self, kind: LogKind, hash: &DiamondHash) -> u64;

    // =========================================================================
    // Audit trail
    // =========================================================================

    fn audit_len(&self) -> u64;

    /// Audit entries whose index falls in `range`
    fn audit_range(&self, range: Range<u64>) -> Vec<AuditEntry>;

    /// Audit entries accepted by `keep`, in append order
    fn scan_audit(&self, keep: &dyn Fn(&AuditEntry) -> bool) -> Vec<AuditEntry>;

    // =========================================================================
    // Writes
    // =========================================================================

    /// Apply every mutation in the batch and append its audit entry, or
    /// apply nothing
    fn commit(&self, batch: WriteBatch) -> Result<(), StorageError>;
}
