//! Certification log
//!
//! Certifiers attest stages of a diamond's path, each with a conflict-free
//! verdict and a reference to the supporting proof. Entries are appended,
//! never edited. A later positive entry does not cancel an earlier negative
//! one.

use gemtrace_core::validation::validate_proof_ref;
use gemtrace_core::{
    CertificationEntry, CertificationStage, DiamondHash, Operation, Principal, Role,
};

use crate::error::Result;
use crate::ledger::Ledger;
use crate::storage::{LogKind, Mutation};

impl Ledger {
    /// Append a certification for one stage
    ///
    /// Allowed on locked and disputed records.
    pub fn add_certification(
        &self,
        caller: &Principal,
        hash: &DiamondHash,
        stage: &str,
        conflict_free: bool,
        proof_ref: &str,
    ) -> Result<CertificationEntry> {
        self.execute(caller, Operation::AddCertification, Some(hash.clone()), |tx| {
            self.require_any_role(caller, &[Role::Certifier])?;
            self.load(hash)?;

            let stage: CertificationStage = stage.parse()?;
            validate_proof_ref(proof_ref)?;

            let entry = CertificationEntry {
                seq: self.store.log_len(LogKind::Certification, hash),
                certifier: caller.clone(),
                stage,
                conflict_free,
                proof_ref: proof_ref.trim().to_string(),
                timestamp: tx.at(),
            };
            tx.push(Mutation::AppendCertification(hash.clone(), entry.clone()));
            Ok(entry)
        })
    }

    /// Certifications in append order; empty for unknown hashes
    pub fn certifications(&self, hash: &DiamondHash) -> Vec<CertificationEntry> {
        self.store.certifications(hash)
    }
}
