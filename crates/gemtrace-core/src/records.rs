//! Records held by the ledger stores

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ErrorCode;
use crate::grading::{Clarity, Color, Cut};
use crate::log::Sequenced;
use crate::stage::{CertificationStage, SupplyChainEventKind};
use crate::status::DiamondStatus;
use crate::types::{Carat, DiamondHash, Principal, Role, Timestamp};

/// The canonical record of one diamond
///
/// Created once, never deleted. `owner` changes only through an ownership
/// transfer; `miner` never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiamondRecord {
    pub hash: DiamondHash,
    /// Current owner
    pub owner: Principal,
    /// Principal that registered the diamond
    pub miner: Principal,
    pub registered_at: Timestamp,
    pub updated_at: Timestamp,
    pub origin: String,
    pub geolocation: String,
    pub metadata: String,
    pub carat: Carat,
    pub color: Color,
    pub clarity: Clarity,
    pub cut: Cut,
    pub status: DiamondStatus,
    /// Blocks metadata, origin and geolocation edits and transfers
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationEntry {
    pub seq: u64,
    pub certifier: Principal,
    pub stage: CertificationStage,
    pub conflict_free: bool,
    /// Signature or external proof reference
    pub proof_ref: String,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipEvent {
    pub seq: u64,
    pub previous_owner: Principal,
    pub new_owner: Principal,
    pub timestamp: Timestamp,
    /// Supply-chain event (by index) that motivated the transfer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supply_chain_ref: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyChainEvent {
    pub seq: u64,
    pub kind: SupplyChainEventKind,
    pub actor: Principal,
    pub timestamp: Timestamp,
    pub detail: String,
}

/// What happened in a dispute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DisputeAction {
    Raised {
        reason: String,
        /// Status the diamond held when the dispute opened
        prior_status: DiamondStatus,
    },
    Evidence {
        detail: String,
    },
    Resolved {
        outcome: DiamondStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeEntry {
    pub seq: u64,
    pub actor: Principal,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub action: DisputeAction,
}

/// State-changing operations recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Initialize,
    RegisterAuthority,
    RevokeAuthority,
    Pause,
    Unpause,
    SetAdmin,
    RegisterDiamond,
    UpdateMetadata,
    SetStatus,
    TransferOwnership,
    AddCertification,
    LogSupplyChainEvent,
    RaiseDispute,
    AddDisputeEvidence,
    ResolveDispute,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Initialize => "initialize",
            Operation::RegisterAuthority => "register_authority",
            Operation::RevokeAuthority => "revoke_authority",
            Operation::Pause => "pause",
            Operation::Unpause => "unpause",
            Operation::SetAdmin => "set_admin",
            Operation::RegisterDiamond => "register_diamond",
            Operation::UpdateMetadata => "update_metadata",
            Operation::SetStatus => "set_status",
            Operation::TransferOwnership => "transfer_ownership",
            Operation::AddCertification => "add_certification",
            Operation::LogSupplyChainEvent => "log_supply_chain_event",
            Operation::RaiseDispute => "raise_dispute",
            Operation::AddDisputeEvidence => "add_dispute_evidence",
            Operation::ResolveDispute => "resolve_dispute",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "code", rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure(ErrorCode),
}

impl AuditOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AuditOutcome::Success)
    }
}

/// One row of the global audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub seq: u64,
    pub principal: Principal,
    pub operation: Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<DiamondHash>,
    pub timestamp: Timestamp,
    pub outcome: AuditOutcome,
}

/// A principal's capability grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityRecord {
    pub principal: Principal,
    pub role: Role,
    pub active: bool,
    pub registered_by: Principal,
    pub registered_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<Timestamp>,
}

impl AuthorityRecord {
    pub fn grants(&self, role: Role) -> bool {
        self.active && self.role == role
    }
}

impl Sequenced for CertificationEntry {
    fn seq(&self) -> u64 {
        self.seq
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl Sequenced for OwnershipEvent {
    fn seq(&self) -> u64 {
        self.seq
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl Sequenced for SupplyChainEvent {
    fn seq(&self) -> u64 {
        self.seq
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl Sequenced for DisputeEntry {
    fn seq(&self) -> u64 {
        self.seq
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl Sequenced for AuditEntry {
    fn seq(&self) -> u64 {
        self.seq
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}
