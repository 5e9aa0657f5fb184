//! GemTrace Ledger
//!
//! The consistency engine behind the GemTrace diamond provenance ledger. It
//! decides how the diamond registry, certification log, ownership chain,
//! supply-chain log, dispute log and audit trail are created, mutated and
//! queried so that every diamond's history stays tamper-evident, role-gated
//! and internally consistent.
//!
//! ## Guarantees
//!
//! 1. **Atomicity**: an operation's writes and its audit entry commit
//!    together or not at all
//! 2. **Append-only**: records are never deleted; logs only grow, with
//!    gap-free indices and non-decreasing timestamps
//! 3. **Replayable ownership**: replaying the ownership log from the miner
//!    yields the current owner
//! 4. **Pause**: while paused, every mutation except `unpause` fails
//!    before any other check
//!
//! ## Example
//!
//! ```
//! use gemtrace_ledger::{Ledger, LedgerConfig};
//! use gemtrace_core::{NewDiamond, Principal, Role};
//!
//! let ledger = Ledger::in_memory(LedgerConfig::new("admin")).unwrap();
//! let admin = Principal::new("admin");
//! let miner = Principal::new("catoca-mine");
//! ledger.register_authority(&admin, &miner, Role::Miner).unwrap();
//!
//! let hash = ledger
//!     .register(
//!         &miner,
//!         NewDiamond {
//!             hash: "H1".into(),
//!             origin: "Catoca, Angola".into(),
//!             geolocation: "-9.40,20.30".into(),
//!             metadata: String::new(),
//!             carat: 150,
//!             color: "D".into(),
//!             clarity: "VVS1".into(),
//!             cut: "Excellent".into(),
//!         },
//!     )
//!     .unwrap();
//! assert!(!ledger.verify_conflict_free(&hash).unwrap());
//! ```

pub mod audit;
pub mod authority;
pub mod certification;
pub mod clock;
pub mod config;
pub mod dispute;
pub mod error;
pub mod ledger;
pub mod observer;
pub mod ownership;
pub mod storage;
pub mod supply_chain;
pub mod verification;

pub use audit::AuditFilter;
pub use authority::{AuthorityDirectory, RoleCheck};
pub use clock::{Clock, LogicalClock, ManualClock};
pub use config::{ConfigError, LedgerConfig, StagePolicy};
pub use error::{LedgerError, Result, StateViolation, Unauthorized};
pub use ledger::{Ledger, LedgerBuilder};
pub use observer::{LedgerObserver, TransferFeed, TransferNotice};
pub use ownership::{replay_owner, ChainBreak};
pub use storage::{LedgerStore, MemoryStore, StorageError};
pub use verification::{ConflictFreeReport, IntegrityError, Provenance};
