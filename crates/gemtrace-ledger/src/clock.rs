//! Logical time supplied by the execution environment

use gemtrace_core::Timestamp;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of the monotonic timestamp stamped on every write
///
/// The ledger trusts the value it is given. A clock that goes backwards is
/// caught by the store, which refuses to append an entry older than the
/// newest audit entry.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Timestamp;
}

/// Clock that advances by one on every reading
#[derive(Debug, Default)]
pub struct LogicalClock {
    ticks: AtomicU64,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a known height
    pub fn starting_at(height: u64) -> Self {
        Self {
            ticks: AtomicU64::new(height),
        }
    }
}

impl Clock for LogicalClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.ticks.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Clock set explicitly by the host, e.g. to the current block height
#[derive(Debug, Default)]
pub struct ManualClock {
    height: AtomicU64,
}

impl ManualClock {
    pub fn new(height: u64) -> Self {
        Self {
            height: AtomicU64::new(height),
        }
    }

    pub fn set(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }

    pub fn advance(&self, by: u64) -> Timestamp {
        Timestamp(self.height.fetch_add(by, Ordering::SeqCst) + by)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.height.load(Ordering::SeqCst))
    }
}
