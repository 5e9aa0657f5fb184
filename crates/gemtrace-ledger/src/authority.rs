//! Authority directory: who may act in which role
//!
//! The ledger asks a [`RoleCheck`] before every role-gated operation. The
//! default implementation, [`AuthorityDirectory`], answers from the grants
//! stored alongside the diamond records; hosts with an external identity
//! system plug in their own through [`LedgerBuilder::role_check`].
//!
//! [`LedgerBuilder::role_check`]: crate::LedgerBuilder::role_check

use gemtrace_core::validation::validate_principal;
use gemtrace_core::{AuthorityRecord, Field, Operation, Principal, Role};
use std::sync::Arc;

use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;
use crate::storage::{LedgerStore, Mutation};

/// Capability predicate consulted by every role-gated operation
pub trait RoleCheck: Send + Sync {
    fn has_role(&self, principal: &Principal, role: Role) -> bool;
}

/// Role lookups backed by the ledger's own authority table
#[derive(Debug, Clone)]
pub struct AuthorityDirectory {
    store: Arc<dyn LedgerStore>,
}

impl AuthorityDirectory {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }
}

impl RoleCheck for AuthorityDirectory {
    fn has_role(&self, principal: &Principal, role: Role) -> bool {
        // The admin scalar always carries the Admin role
        if role == Role::Admin && self.store.controls().admin.as_ref() == Some(principal) {
            return true;
        }

        self.store
            .authority(principal)
            .map_or(false, |record| record.grants(role))
    }
}

impl Ledger {
    /// The admin scalar, or any principal granted the Admin role
    fn require_admin_role(&self, caller: &Principal) -> Result<()> {
        if self.store.controls().admin.as_ref() == Some(caller) || self.has_role(caller, Role::Admin) {
            Ok(())
        } else {
            Err(LedgerError::not_admin(caller))
        }
    }

    /// Grant `role` to `principal`
    ///
    /// A principal holds one role at a time. Registering a revoked principal
    /// again replaces the old grant.
    pub fn register_authority(
        &self,
        caller: &Principal,
        principal: &Principal,
        role: Role,
    ) -> Result<AuthorityRecord> {
        self.execute(caller, Operation::RegisterAuthority, None, |tx| {
            self.require_admin_role(caller)?;

            if let Some(existing) = self.store.authority(principal) {
                if existing.active {
                    return Err(LedgerError::AlreadyRegistered(format!(
                        "authority '{}' as {}",
                        principal, existing.role
                    )));
                }
            }

            validate_principal(principal, Field::Principal)?;

            let record = AuthorityRecord {
                principal: principal.clone(),
                role,
                active: true,
                registered_by: caller.clone(),
                registered_at: tx.at(),
                revoked_at: None,
            };
            tx.push(Mutation::PutAuthority(record.clone()));
            Ok(record)
        })
    }

    /// Deactivate a grant; the record stays for history
    pub fn revoke_authority(&self, caller: &Principal, principal: &Principal) -> Result<AuthorityRecord> {
        self.execute(caller, Operation::RevokeAuthority, None, |tx| {
            self.require_admin_role(caller)?;

            let mut record = self
                .store
                .authority(principal)
                .filter(|record| record.active)
                .ok_or_else(|| LedgerError::NotFound(format!("active authority '{}'", principal)))?;

            record.active = false;
            record.revoked_at = Some(tx.at());
            tx.push(Mutation::PutAuthority(record.clone()));
            Ok(record)
        })
    }

    /// Stored grant for `principal`, active or revoked
    pub fn authority(&self, principal: &Principal) -> Option<AuthorityRecord> {
        self.store.authority(principal)
    }

    pub fn authorities(&self) -> Vec<AuthorityRecord> {
        self.store.authorities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use gemtrace_core::ErrorCode;
    use std::collections::HashSet;

    fn ledger() -> Ledger {
        Ledger::in_memory(LedgerConfig::new("admin")).unwrap()
    }

    #[test]
    fn test_admin_scalar_holds_admin_role() {
        let ledger = ledger();
        assert!(ledger.has_role(&"admin".into(), Role::Admin));
        assert!(!ledger.has_role(&"admin".into(), Role::Miner));
    }

    #[test]
    fn test_register_and_revoke() {
        let ledger = ledger();
        let admin = Principal::new("admin");
        let certifier = Principal::new("gia-lab");

        let record = ledger
            .register_authority(&admin, &certifier, Role::Certifier)
            .unwrap();
        assert!(record.active);
        assert!(ledger.has_role(&certifier, Role::Certifier));
        assert!(!ledger.has_role(&certifier, Role::Miner));

        let err = ledger
            .register_authority(&admin, &certifier, Role::Miner)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyRegistered);

        let revoked = ledger.revoke_authority(&admin, &certifier).unwrap();
        assert!(!revoked.active);
        assert!(revoked.revoked_at.is_some());
        assert!(!ledger.has_role(&certifier, Role::Certifier));

        // Revoking twice finds nothing active
        let err = ledger.revoke_authority(&admin, &certifier).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        // A revoked principal may be registered again, in a new role
        ledger
            .register_authority(&admin, &certifier, Role::Auditor)
            .unwrap();
        assert!(ledger.has_role(&certifier, Role::Auditor));
    }

    #[test]
    fn test_only_admin_manages_authorities() {
        let ledger = ledger();
        let err = ledger
            .register_authority(&"mallory".into(), &"mallory".into(), Role::Admin)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotAdmin);
        assert!(ledger.authority(&"mallory".into()).is_none());
    }

    #[test]
    fn test_granted_admin_manages_authorities() {
        let ledger = ledger();
        ledger
            .register_authority(&"admin".into(), &"deputy".into(), Role::Admin)
            .unwrap();
        ledger
            .register_authority(&"deputy".into(), &"quarry".into(), Role::Miner)
            .unwrap();
        assert!(ledger.has_role(&"quarry".into(), Role::Miner));

        // Ledger-wide controls stay with the admin scalar
        assert_eq!(
            ledger.pause(&"deputy".into()).unwrap_err().code(),
            ErrorCode::NotAdmin
        );
    }

    #[test]
    fn test_empty_principal_rejected() {
        let ledger = ledger();
        let err = ledger
            .register_authority(&"admin".into(), &" ".into(), Role::Miner)
            .unwrap_err();
        assert_eq!(err.validation().map(|v| v.field), Some(Field::Principal));
    }

    struct Allowlist(HashSet<(String, Role)>);

    impl RoleCheck for Allowlist {
        fn has_role(&self, principal: &Principal, role: Role) -> bool {
            self.0.contains(&(principal.as_str().to_string(), role))
        }
    }

    #[test]
    fn test_external_role_check_is_consulted() {
        let allow = Allowlist(HashSet::from([("quarry".to_string(), Role::Miner)]));
        let ledger = Ledger::builder(LedgerConfig::new("admin"))
            .role_check(Arc::new(allow))
            .open()
            .unwrap();

        assert!(ledger.has_role(&"quarry".into(), Role::Miner));
        // The stored table is ignored once an external directory is plugged in
        ledger
            .register_authority(&"admin".into(), &"other".into(), Role::Miner)
            .unwrap();
        assert!(!ledger.has_role(&"other".into(), Role::Miner));
    }
}
