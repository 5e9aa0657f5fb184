//! Error types shared by every GemTrace store

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::types::Timestamp;

/// Result type alias for field validation
pub type Result<T> = std::result::Result<T, ValidationError>;

/// The input field a validation failure refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Hash,
    Principal,
    NewOwner,
    Origin,
    Geolocation,
    MetadataLength,
    Carat,
    Color,
    Clarity,
    Cut,
    Status,
    Stage,
    ProofRef,
    EventType,
    Detail,
    SupplyChainRef,
    Reason,
    Evidence,
    Role,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Hash => "hash",
            Field::Principal => "principal",
            Field::NewOwner => "new_owner",
            Field::Origin => "origin",
            Field::Geolocation => "geolocation",
            Field::MetadataLength => "metadata_length",
            Field::Carat => "carat",
            Field::Color => "color",
            Field::Clarity => "clarity",
            Field::Cut => "cut",
            Field::Status => "status",
            Field::Stage => "stage",
            Field::ProofRef => "proof_ref",
            Field::EventType => "event_type",
            Field::Detail => "detail",
            Field::SupplyChainRef => "supply_chain_ref",
            Field::Reason => "reason",
            Field::Evidence => "evidence",
            Field::Role => "role",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field that is out of its allowed range or enumeration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    /// Which field failed
    pub field: Field,
    /// Human-readable reason
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: Field, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Rejected append on an [`AppendLog`](crate::log::AppendLog)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppendError {
    /// The entry's index does not continue the sequence
    #[error("sequence gap: expected index {expected}, got {actual}")]
    SequenceGap { expected: u64, actual: u64 },

    /// The entry is older than the last entry in the sequence
    #[error("timestamp regression: last entry at {last}, new entry at {actual}")]
    TimestampRegression { last: Timestamp, actual: Timestamp },
}

/// Stable, serializable failure code recorded in audit outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Paused,
    Unauthorized,
    NotOwner,
    NotAdmin,
    AlreadyRegistered,
    NotFound,
    ValidationFailed,
    InvalidStateTransition,
    RecordLocked,
    StorageFailure,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Paused => "PAUSED",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::NotOwner => "NOT_OWNER",
            ErrorCode::NotAdmin => "NOT_ADMIN",
            ErrorCode::AlreadyRegistered => "ALREADY_REGISTERED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::RecordLocked => "RECORD_LOCKED",
            ErrorCode::StorageFailure => "STORAGE_FAILURE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
