//! Certification stages and supply-chain event kinds

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Field, ValidationError};
use crate::types::Role;

/// A point in the supply chain at which a certifier attests to a diamond
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CertificationStage {
    RoughExport,
    Cutting,
    Polishing,
    Grading,
    Import,
}

impl CertificationStage {
    pub const ALL: [CertificationStage; 5] = [
        CertificationStage::RoughExport,
        CertificationStage::Cutting,
        CertificationStage::Polishing,
        CertificationStage::Grading,
        CertificationStage::Import,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CertificationStage::RoughExport => "rough-export",
            CertificationStage::Cutting => "cutting",
            CertificationStage::Polishing => "polishing",
            CertificationStage::Grading => "grading",
            CertificationStage::Import => "import",
        }
    }
}

impl fmt::Display for CertificationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertificationStage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        CertificationStage::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == wanted)
            .ok_or_else(|| {
                ValidationError::new(Field::Stage, format!("unknown certification stage '{}'", s))
            })
    }
}

/// Lifecycle events recorded in the supply-chain log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplyChainEventKind {
    Export,
    Cut,
    Polish,
    Import,
    Sale,
    Inspection,
}

/// Every role that may log at least one kind of supply-chain event
pub const SUPPLY_CHAIN_ROLES: [Role; 4] =
    [Role::Miner, Role::Cutter, Role::Retailer, Role::Certifier];

impl SupplyChainEventKind {
    pub const ALL: [SupplyChainEventKind; 6] = [
        SupplyChainEventKind::Export,
        SupplyChainEventKind::Cut,
        SupplyChainEventKind::Polish,
        SupplyChainEventKind::Import,
        SupplyChainEventKind::Sale,
        SupplyChainEventKind::Inspection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SupplyChainEventKind::Export => "export",
            SupplyChainEventKind::Cut => "cut",
            SupplyChainEventKind::Polish => "polish",
            SupplyChainEventKind::Import => "import",
            SupplyChainEventKind::Sale => "sale",
            SupplyChainEventKind::Inspection => "inspection",
        }
    }

    /// Roles allowed to record this kind of event
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            SupplyChainEventKind::Export => &[Role::Miner],
            SupplyChainEventKind::Cut | SupplyChainEventKind::Polish => &[Role::Cutter],
            SupplyChainEventKind::Import | SupplyChainEventKind::Sale => &[Role::Retailer],
            SupplyChainEventKind::Inspection => &[Role::Certifier],
        }
    }
}

impl fmt::Display for SupplyChainEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupplyChainEventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SupplyChainEventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                ValidationError::new(Field::EventType, format!("unknown event type '{}'", s))
            })
    }
}
