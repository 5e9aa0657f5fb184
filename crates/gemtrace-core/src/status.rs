//! Diamond status state machine
//!
//! In-band transitions are driven by the owner through `set_status`:
//!
//! ```text
//! Registered -> Pending -> Certified
//! ```
//!
//! `Disputed` is out-of-band. It is entered from any other state by the
//! dispute-resolution entry point and left only by a resolution that returns
//! the diamond to `Registered` or `Certified`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::{Field, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiamondStatus {
    Registered,
    Pending,
    Certified,
    Disputed,
}

impl DiamondStatus {
    pub const ALL: [DiamondStatus; 4] = [
        DiamondStatus::Registered,
        DiamondStatus::Pending,
        DiamondStatus::Certified,
        DiamondStatus::Disputed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiamondStatus::Registered => "Registered",
            DiamondStatus::Pending => "Pending",
            DiamondStatus::Certified => "Certified",
            DiamondStatus::Disputed => "Disputed",
        }
    }

    /// Whether the owner may set this value directly
    pub fn is_in_band(&self) -> bool {
        !matches!(self, DiamondStatus::Disputed)
    }
}

impl fmt::Display for DiamondStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiamondStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiamondStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::new(Field::Status, format!("unknown status '{}'", s)))
    }
}

/// Who is asking for a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionSource {
    /// The owner, through `set_status`
    Owner,
    /// The dispute-resolution entry point
    Dispute,
}

/// A status change that the transition table does not allow
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("illegal status transition {from} -> {to} via {via:?}")]
pub struct TransitionError {
    pub from: DiamondStatus,
    pub to: DiamondStatus,
    pub via: TransitionSource,
}

/// Check a status change against the transition table
///
/// Owner changes may keep the current status (to toggle the lock) or step
/// forward one stage. Dispute changes only enter or leave `Disputed`.
pub fn check_transition(
    from: DiamondStatus,
    to: DiamondStatus,
    source: TransitionSource,
) -> Result<(), TransitionError> {
    use DiamondStatus::*;

    let allowed = match source {
        TransitionSource::Owner => matches!(
            (from, to),
            (Registered, Registered)
                | (Pending, Pending)
                | (Certified, Certified)
                | (Registered, Pending)
                | (Pending, Certified)
        ),
        TransitionSource::Dispute => matches!(
            (from, to),
            (Registered, Disputed)
                | (Pending, Disputed)
                | (Certified, Disputed)
                | (Disputed, Registered)
                | (Disputed, Certified)
        ),
    };

    if allowed {
        Ok(())
    } else {
        Err(TransitionError { from, to, via: source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DiamondStatus::*;

    #[test]
    fn test_owner_forward_path() {
        assert!(check_transition(Registered, Pending, TransitionSource::Owner).is_ok());
        assert!(check_transition(Pending, Certified, TransitionSource::Owner).is_ok());
        assert!(check_transition(Certified, Certified, TransitionSource::Owner).is_ok());
    }

    #[test]
    fn test_owner_cannot_skip_or_go_back() {
        assert!(check_transition(Registered, Certified, TransitionSource::Owner).is_err());
        assert!(check_transition(Certified, Registered, TransitionSource::Owner).is_err());
        assert!(check_transition(Pending, Registered, TransitionSource::Owner).is_err());
    }

    #[test]
    fn test_owner_cannot_touch_disputed() {
        for status in DiamondStatus::ALL {
            assert!(check_transition(status, Disputed, TransitionSource::Owner).is_err());
            assert!(check_transition(Disputed, status, TransitionSource::Owner).is_err());
        }
    }

    #[test]
    fn test_dispute_paths() {
        for status in [Registered, Pending, Certified] {
            assert!(check_transition(status, Disputed, TransitionSource::Dispute).is_ok());
        }
        assert!(check_transition(Disputed, Registered, TransitionSource::Dispute).is_ok());
        assert!(check_transition(Disputed, Certified, TransitionSource::Dispute).is_ok());
        assert!(check_transition(Disputed, Pending, TransitionSource::Dispute).is_err());
        assert!(check_transition(Disputed, Disputed, TransitionSource::Dispute).is_err());
        assert!(check_transition(Registered, Pending, TransitionSource::Dispute).is_err());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("registered".parse::<DiamondStatus>().unwrap(), Registered);
        assert_eq!("Bogus".parse::<DiamondStatus>().unwrap_err().field, Field::Status);
    }
}
