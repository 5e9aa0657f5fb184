//! Error taxonomy of the consistency engine

use gemtrace_core::{DiamondHash, ErrorCode, Principal, Role, TransitionError, ValidationError};
use thiserror::Error;

use crate::storage::StorageError;

/// Result type alias using LedgerError
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors returned by every mutating ledger operation
///
/// Operations check, in order: paused, authorization, existence or
/// duplicate, field validation, state and lock. The first violation wins and
/// nothing is written.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Mutations are blocked system-wide
    #[error("ledger is paused")]
    Paused,

    #[error("unauthorized: {0}")]
    Unauthorized(Unauthorized),

    /// Duplicate primary key
    #[error("already registered: {0}")]
    AlreadyRegistered(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    #[error("invalid state transition: {0}")]
    InvalidStateTransition(StateViolation),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Why a caller was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Unauthorized {
    #[error("'{principal}' holds none of the roles {required:?}")]
    MissingRole {
        principal: Principal,
        required: Vec<Role>,
    },

    #[error("'{principal}' does not own {hash}")]
    NotOwner {
        principal: Principal,
        hash: DiamondHash,
    },

    #[error("'{principal}' is not the ledger admin")]
    NotAdmin { principal: Principal },
}

/// A mutation the record's current state does not permit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateViolation {
    #[error("{0} is locked")]
    Locked(DiamondHash),

    #[error("{0} is under dispute")]
    Disputed(DiamondHash),

    #[error("{0} is not under dispute")]
    NotDisputed(DiamondHash),

    #[error("ledger is not paused")]
    NotPaused,

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl LedgerError {
    pub(crate) fn missing_role(principal: &Principal, required: &[Role]) -> Self {
        LedgerError::Unauthorized(Unauthorized::MissingRole {
            principal: principal.clone(),
            required: required.to_vec(),
        })
    }

    pub(crate) fn not_owner(principal: &Principal, hash: &DiamondHash) -> Self {
        LedgerError::Unauthorized(Unauthorized::NotOwner {
            principal: principal.clone(),
            hash: hash.clone(),
        })
    }

    pub(crate) fn not_admin(principal: &Principal) -> Self {
        LedgerError::Unauthorized(Unauthorized::NotAdmin {
            principal: principal.clone(),
        })
    }

    pub(crate) fn diamond_not_found(hash: &DiamondHash) -> Self {
        LedgerError::NotFound(format!("diamond {}", hash))
    }

    /// Stable code for audit outcomes and callers that branch on kind
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::Paused => ErrorCode::Paused,
            LedgerError::Unauthorized(Unauthorized::MissingRole { .. }) => ErrorCode::Unauthorized,
            LedgerError::Unauthorized(Unauthorized::NotOwner { .. }) => ErrorCode::NotOwner,
            LedgerError::Unauthorized(Unauthorized::NotAdmin { .. }) => ErrorCode::NotAdmin,
            LedgerError::AlreadyRegistered(_) => ErrorCode::AlreadyRegistered,
            LedgerError::NotFound(_) => ErrorCode::NotFound,
            LedgerError::ValidationFailed(_) => ErrorCode::ValidationFailed,
            LedgerError::InvalidStateTransition(StateViolation::Locked(_)) => {
                ErrorCode::RecordLocked
            }
            LedgerError::InvalidStateTransition(_) => ErrorCode::InvalidStateTransition,
            LedgerError::Storage(_) => ErrorCode::StorageFailure,
        }
    }

    /// The validation failure, if this is one
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            LedgerError::ValidationFailed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StateViolation> for LedgerError {
    fn from(violation: StateViolation) -> Self {
        LedgerError::InvalidStateTransition(violation)
    }
}

impl From<TransitionError> for LedgerError {
    fn from(err: TransitionError) -> Self {
        LedgerError::InvalidStateTransition(StateViolation::Transition(err))
    }
}

impl From<Unauthorized> for LedgerError {
    fn from(err: Unauthorized) -> Self {
        LedgerError::Unauthorized(err)
    }
}
