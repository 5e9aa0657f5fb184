//! Field validation for caller-supplied input
//!
//! Each check maps a violation to its own [`Field`] so callers can tell a bad
//! origin from a bad geolocation. Lengths are counted in characters.

use serde::{Deserialize, Serialize};

use crate::error::{Field, Result, ValidationError};
use crate::grading::{Clarity, Color, Cut};
use crate::types::{Carat, DiamondHash, Principal};

pub const ORIGIN_MAX: usize = 100;
pub const GEOLOCATION_MAX: usize = 50;
pub const METADATA_MAX: usize = 500;
pub const DETAIL_MAX: usize = 500;
pub const PROOF_REF_MAX: usize = 256;
pub const DISPUTE_TEXT_MAX: usize = 500;

/// Registration request for a new diamond, as received from a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDiamond {
    pub hash: String,
    pub origin: String,
    pub geolocation: String,
    pub metadata: String,
    /// Weight in points (hundredths of a carat)
    pub carat: u32,
    pub color: String,
    pub clarity: String,
    pub cut: String,
}

/// A registration request whose every field passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDiamond {
    pub hash: DiamondHash,
    pub origin: String,
    pub geolocation: String,
    pub metadata: String,
    pub carat: Carat,
    pub color: Color,
    pub clarity: Clarity,
    pub cut: Cut,
}

/// The mutable descriptive fields of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataUpdate {
    pub metadata: String,
    pub origin: String,
    pub geolocation: String,
}

fn check_bounded(value: &str, field: Field, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::new(
            field,
            format!("must be at least {} characters", min),
        ));
    }
    if len > max {
        return Err(ValidationError::new(
            field,
            format!("{} characters exceeds the limit of {}", len, max),
        ));
    }
    Ok(())
}

pub fn validate_origin(origin: &str) -> Result<()> {
    check_bounded(origin, Field::Origin, 1, ORIGIN_MAX)
}

pub fn validate_geolocation(geolocation: &str) -> Result<()> {
    check_bounded(geolocation, Field::Geolocation, 1, GEOLOCATION_MAX)
}

pub fn validate_metadata(metadata: &str) -> Result<()> {
    check_bounded(metadata, Field::MetadataLength, 0, METADATA_MAX)
}

pub fn validate_detail(detail: &str) -> Result<()> {
    check_bounded(detail, Field::Detail, 0, DETAIL_MAX)
}

pub fn validate_proof_ref(proof_ref: &str) -> Result<()> {
    check_bounded(proof_ref.trim(), Field::ProofRef, 1, PROOF_REF_MAX)
}

pub fn validate_dispute_text(text: &str, field: Field) -> Result<()> {
    check_bounded(text.trim(), field, 1, DISPUTE_TEXT_MAX)
}

pub fn validate_principal(principal: &Principal, field: Field) -> Result<()> {
    if principal.is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}

impl MetadataUpdate {
    /// Validate in a fixed order: metadata, origin, geolocation
    pub fn validate(&self) -> Result<()> {
        validate_metadata(&self.metadata)?;
        validate_origin(&self.origin)?;
        validate_geolocation(&self.geolocation)
    }
}

impl NewDiamond {
    /// Parse only the hash, for the duplicate check that precedes field
    /// validation
    pub fn parse_hash(&self) -> Result<DiamondHash> {
        DiamondHash::parse(&self.hash)
    }

    /// Validate the descriptive fields, returning the first violation
    ///
    /// Order: origin, geolocation, metadata, carat, color, clarity, cut.
    pub fn validate(&self) -> Result<ValidatedDiamond> {
        let hash = self.parse_hash()?;
        validate_origin(&self.origin)?;
        validate_geolocation(&self.geolocation)?;
        validate_metadata(&self.metadata)?;
        let carat = Carat::from_points(self.carat)?;
        let color = self.color.parse::<Color>()?;
        let clarity = self.clarity.parse::<Clarity>()?;
        let cut = self.cut.parse::<Cut>()?;

        Ok(ValidatedDiamond {
            hash,
            origin: self.origin.clone(),
            geolocation: self.geolocation.clone(),
            metadata: self.metadata.clone(),
            carat,
            color,
            clarity,
            cut,
        })
    }
}
