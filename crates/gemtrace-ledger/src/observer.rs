//! Post-commit notifications
//!
//! External indexes (a token registry mirroring ownership, for instance)
//! subscribe here instead of polling. Observers run after a write is
//! committed and cannot veto it.

use gemtrace_core::{AuditEntry, DiamondHash, Principal, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Everything an ownership index needs to stay in sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferNotice {
    pub hash: DiamondHash,
    pub previous_owner: Principal,
    pub new_owner: Principal,
    pub timestamp: Timestamp,
    /// Index of the ownership event that records the transfer
    pub ownership_seq: u64,
}

pub trait LedgerObserver: Send + Sync {
    fn on_transfer(&self, _notice: &TransferNotice) {}

    fn on_commit(&self, _entry: &AuditEntry) {}
}

/// Observer that buffers transfer notices until drained
#[derive(Debug, Default)]
pub struct TransferFeed {
    pending: Mutex<Vec<TransferNotice>>,
}

impl TransferFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every buffered notice, oldest first
    pub fn drain(&self) -> Vec<TransferNotice> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl LedgerObserver for TransferFeed {
    fn on_transfer(&self, notice: &TransferNotice) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice.clone());
    }
}
