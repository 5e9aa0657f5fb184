//! Append-only sequences
//!
//! Every log in the ledger is an [`AppendLog`]: entries carry their own
//! zero-based index, indices are gap-free, and timestamps never decrease.
//! There is no removal or in-place update.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::AppendError;
use crate::types::Timestamp;

/// An entry that knows its position and time in a sequence
pub trait Sequenced {
    fn seq(&self) -> u64;
    fn timestamp(&self) -> Timestamp;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppendLog<T> {
    entries: Vec<T>,
}

impl<T> Default for AppendLog<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Sequenced> AppendLog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index the next entry must carry
    pub fn next_seq(&self) -> u64 {
        self.len()
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.last()
    }

    /// Check whether `entry` may be appended, without appending it
    pub fn check_append(&self, entry: &T) -> Result<(), AppendError> {
        check_continuation(self.next_seq(), self.last().map(Sequenced::timestamp), entry)
    }

    pub fn append(&mut self, entry: T) -> Result<u64, AppendError> {
        self.check_append(&entry)?;
        let seq = entry.seq();
        self.entries.push(entry);
        Ok(seq)
    }

    /// Append `entries` in order; nothing is appended unless all of them fit
    pub fn append_all(&mut self, entries: Vec<T>) -> Result<(), AppendError> {
        let mut next = self.next_seq();
        let mut last = self.last().map(Sequenced::timestamp);
        for entry in &entries {
            check_continuation(next, last, entry)?;
            next += 1;
            last = Some(entry.timestamp());
        }
        self.entries.extend(entries);
        Ok(())
    }

    pub fn as_slice(&self) -> &[T] {
        &self.entries
    }

    /// Entries whose index falls in `range`, clamped to the log length
    pub fn range(&self, range: Range<u64>) -> &[T] {
        let len = self.len();
        let start = range.start.min(len) as usize;
        let end = range.end.min(len).max(range.start.min(len)) as usize;
        &self.entries[start..end]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }
}

/// Check that `entry` continues a sequence whose next index is `next_seq`
/// and whose newest entry is at `last`
pub fn check_continuation<T: Sequenced>(
    next_seq: u64,
    last: Option<Timestamp>,
    entry: &T,
) -> Result<(), AppendError> {
    if entry.seq() != next_seq {
        return Err(AppendError::SequenceGap {
            expected: next_seq,
            actual: entry.seq(),
        });
    }
    if let Some(last) = last {
        if entry.timestamp() < last {
            return Err(AppendError::TimestampRegression {
                last,
                actual: entry.timestamp(),
            });
        }
    }
    Ok(())
}

/// Verify that a slice read back from a store is a well-formed sequence
pub fn verify_sequence<T: Sequenced>(entries: &[T]) -> Result<(), AppendError> {
    let mut last = None;
    for (index, entry) in entries.iter().enumerate() {
        check_continuation(index as u64, last, entry)?;
        last = Some(entry.timestamp());
    }
    Ok(())
}

impl<'a, T> IntoIterator for &'a AppendLog<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
