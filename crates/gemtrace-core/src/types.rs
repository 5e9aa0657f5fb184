//! Identifiers and scalar types used across the GemTrace stores

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{Field, Result, ValidationError};

/// Maximum length of a diamond hash, in characters
pub const MAX_HASH_LEN: usize = 128;

/// Domain separator mixed into derived content hashes
const HASH_DOMAIN: &[u8] = b"gemtrace:diamond:v1";

/// Content identifier of one physical diamond
///
/// Primary key of every store. Never empty, never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiamondHash(String);

impl DiamondHash {
    /// Parse a caller-supplied hash
    pub fn parse(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(ValidationError::new(Field::Hash, "must not be empty"));
        }
        if value.chars().count() > MAX_HASH_LEN {
            return Err(ValidationError::new(
                Field::Hash,
                format!("longer than {} characters", MAX_HASH_LEN),
            ));
        }
        if value.chars().any(char::is_whitespace) {
            return Err(ValidationError::new(Field::Hash, "must not contain whitespace"));
        }
        Ok(Self(value.to_string()))
    }

    /// Derive a fixed-length hash from immutable physical attributes
    ///
    /// The laser inscription and attribute pairs are length-prefixed so that
    /// no two distinct inputs share an encoding. Attribute order does not
    /// matter.
    pub fn derive(inscription: &str, attributes: &[(&str, &str)]) -> Self {
        let mut sorted: Vec<_> = attributes.to_vec();
        sorted.sort();

        let mut hasher = Sha256::new();
        hasher.update(HASH_DOMAIN);
        update_prefixed(&mut hasher, inscription.as_bytes());
        for (key, value) in sorted {
            update_prefixed(&mut hasher, key.as_bytes());
            update_prefixed(&mut hasher, value.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn update_prefixed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

impl fmt::Display for DiamondHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DiamondHash {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// An acting identity, as supplied by the execution environment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Principal {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Monotonic logical time (e.g. block height)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Diamond weight in points (hundredths of a carat)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Carat(u32);

impl Carat {
    /// Build a weight from points; zero is rejected
    pub fn from_points(points: u32) -> Result<Self> {
        if points == 0 {
            return Err(ValidationError::new(Field::Carat, "must be greater than zero"));
        }
        Ok(Self(points))
    }

    pub fn points(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Carat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}ct", self.0 / 100, self.0 % 100)
    }
}

/// Capability grants held by principals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Miner,
    Certifier,
    Cutter,
    Retailer,
    Auditor,
    /// Dispute-resolution collaborator
    Arbiter,
    Admin,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Miner,
        Role::Certifier,
        Role::Cutter,
        Role::Retailer,
        Role::Auditor,
        Role::Arbiter,
        Role::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Miner => "miner",
            Role::Certifier => "certifier",
            Role::Cutter => "cutter",
            Role::Retailer => "retailer",
            Role::Auditor => "auditor",
            Role::Arbiter => "arbiter",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::new(Field::Role, format!("unknown role '{}'", s)))
    }
}
