//! # GemTrace Core
//!
//! Domain types for the GemTrace diamond provenance ledger.
//!
//! ## Key Concepts
//!
//! - **DiamondHash**: content identifier derived from a diamond's immutable
//!   physical attributes; primary key of every store
//! - **DiamondRecord**: the canonical record, created once and never deleted
//! - **AppendLog**: gap-free, time-ordered sequence with no removal path
//! - **Status machine**: `Registered -> Pending -> Certified` in-band, with an
//!   out-of-band `Disputed` state owned by dispute resolution
//!
//! This crate performs no I/O. The consistency engine that enforces rules
//! across stores lives in `gemtrace-ledger`.

pub mod error;
pub mod grading;
pub mod log;
pub mod records;
pub mod stage;
pub mod status;
pub mod types;
pub mod validation;

pub use error::{AppendError, ErrorCode, Field, Result, ValidationError};
pub use grading::{Clarity, Color, Cut};
pub use log::{AppendLog, Sequenced};
pub use records::{
    AuditEntry, AuditOutcome, AuthorityRecord, CertificationEntry, DiamondRecord, DisputeAction,
    DisputeEntry, Operation, OwnershipEvent, SupplyChainEvent,
};
pub use stage::{CertificationStage, SupplyChainEventKind, SUPPLY_CHAIN_ROLES};
pub use status::{check_transition, DiamondStatus, TransitionError, TransitionSource};
pub use types::{Carat, DiamondHash, Principal, Role, Timestamp};
pub use validation::{MetadataUpdate, NewDiamond, ValidatedDiamond};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the library version
pub fn version() -> &'static str {
    VERSION
}
