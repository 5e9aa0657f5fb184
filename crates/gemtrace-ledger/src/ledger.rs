//! The diamond ledger and the transaction boundary shared by every store
//!
//! Each public mutating operation runs through [`Ledger::execute`]:
//!
//! 1. the paused flag is checked before anything else,
//! 2. the operation body checks authorization, existence, fields and state,
//!    staging its writes in a [`Transaction`] without touching the store,
//! 3. the staged writes and one audit entry are committed as a single
//!    [`WriteBatch`], or nothing is written at all.

use gemtrace_core::{
    check_transition, AuditEntry, AuditOutcome, DiamondHash, DiamondRecord, DiamondStatus, Field,
    MetadataUpdate, NewDiamond, Operation, Principal, Role, Timestamp, TransitionSource,
};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{error, info, warn};

use crate::authority::{AuthorityDirectory, RoleCheck};
use crate::clock::{Clock, LogicalClock};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result, StateViolation};
use crate::observer::{LedgerObserver, TransferNotice};
use crate::storage::{LedgerStore, MemoryStore, Mutation, WriteBatch};

/// Writes staged by one operation
pub(crate) struct Transaction {
    at: Timestamp,
    mutations: Vec<Mutation>,
    transfers: Vec<TransferNotice>,
}

impl Transaction {
    fn new(at: Timestamp) -> Self {
        Self {
            at,
            mutations: Vec::new(),
            transfers: Vec::new(),
        }
    }

    /// Timestamp stamped on every write of this operation
    pub(crate) fn at(&self) -> Timestamp {
        self.at
    }

    pub(crate) fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub(crate) fn notify_transfer(&mut self, notice: TransferNotice) {
        self.transfers.push(notice);
    }
}

/// The only operation accepted while the ledger is paused
fn allowed_while_paused(operation: Operation) -> bool {
    matches!(operation, Operation::Unpause)
}

/// Builder for [`Ledger`]
pub struct LedgerBuilder {
    config: LedgerConfig,
    store: Option<Arc<dyn LedgerStore>>,
    clock: Option<Arc<dyn Clock>>,
    roles: Option<Arc<dyn RoleCheck>>,
}

impl LedgerBuilder {
    /// Use a specific storage backend (default: [`MemoryStore`])
    pub fn store(mut self, store: Arc<dyn LedgerStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a specific time source (default: [`LogicalClock`])
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Delegate capability checks to an external directory
    ///
    /// By default roles are answered from the ledger's own authority table.
    pub fn role_check(mut self, roles: Arc<dyn RoleCheck>) -> Self {
        self.roles = Some(roles);
        self
    }

    /// Open the ledger, installing the configured admin if the store has
    /// never been initialized
    pub fn open(self) -> Result<Ledger> {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn LedgerStore>);
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(LogicalClock::new()) as Arc<dyn Clock>);
        let roles = self
            .roles
            .unwrap_or_else(|| Arc::new(AuthorityDirectory::new(store.clone())) as Arc<dyn RoleCheck>);

        let ledger = Ledger {
            store,
            clock,
            roles,
            config: self.config,
            observers: RwLock::new(Vec::new()),
        };

        if ledger.store.controls().admin.is_none() {
            ledger.initialize()?;
        }

        Ok(ledger)
    }
}

/// The cross-store consistency engine
pub struct Ledger {
    pub(crate) store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    roles: Arc<dyn RoleCheck>,
    pub(crate) config: LedgerConfig,
    observers: RwLock<Vec<Arc<dyn LedgerObserver>>>,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("store", &self.store)
            .field("clock", &self.clock)
            .field("config", &self.config)
            .finish()
    }
}

impl Ledger {
    pub fn builder(config: LedgerConfig) -> LedgerBuilder {
        LedgerBuilder {
            config,
            store: None,
            clock: None,
            roles: None,
        }
    }

    /// Open a fresh in-memory ledger
    pub fn in_memory(config: LedgerConfig) -> Result<Self> {
        Self::builder(config).open()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Register an observer for post-commit notifications
    pub fn subscribe(&self, observer: Arc<dyn LedgerObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    fn initialize(&self) -> Result<()> {
        let admin = self.config.admin.clone();
        gemtrace_core::validation::validate_principal(&admin, Field::Principal)?;

        let mut tx = Transaction::new(self.clock.now());
        tx.push(Mutation::SetAdmin(admin.clone()));
        self.commit(&admin, Operation::Initialize, None, tx)?;

        info!(admin = %admin, "Ledger initialized");
        Ok(())
    }

    // =========================================================================
    // Transaction boundary
    // =========================================================================

    /// Run one mutating operation as an all-or-nothing unit
    pub(crate) fn execute<T>(
        &self,
        caller: &Principal,
        operation: Operation,
        target: Option<DiamondHash>,
        body: impl FnOnce(&mut Transaction) -> Result<T>,
    ) -> Result<T> {
        if self.store.controls().paused && !allowed_while_paused(operation) {
            warn!(principal = %caller, operation = %operation, "Rejected: ledger is paused");
            return Err(LedgerError::Paused);
        }

        let mut tx = Transaction::new(self.clock.now());
        match body(&mut tx) {
            Ok(value) => {
                self.commit(caller, operation, target, tx)?;
                Ok(value)
            }
            Err(err) => {
                self.reject(caller, operation, target, tx.at, &err);
                Err(err)
            }
        }
    }

    fn commit(
        &self,
        caller: &Principal,
        operation: Operation,
        target: Option<DiamondHash>,
        tx: Transaction,
    ) -> Result<()> {
        let audit = AuditEntry {
            seq: self.store.audit_len(),
            principal: caller.clone(),
            operation,
            target,
            timestamp: tx.at,
            outcome: AuditOutcome::Success,
        };

        self.store
            .commit(WriteBatch {
                mutations: tx.mutations,
                audit: audit.clone(),
            })
            .map_err(|err| {
                error!(
                    principal = %caller,
                    operation = %operation,
                    error = %err,
                    "Commit failed; nothing written"
                );
                LedgerError::Storage(err)
            })?;

        info!(
            audit_seq = audit.seq,
            principal = %caller,
            operation = %operation,
            target = ?audit.target.as_ref().map(DiamondHash::as_str),
            at = %audit.timestamp,
            "Committed"
        );

        self.notify(&audit, &tx.transfers);
        Ok(())
    }

    fn reject(
        &self,
        caller: &Principal,
        operation: Operation,
        target: Option<DiamondHash>,
        at: Timestamp,
        err: &LedgerError,
    ) {
        warn!(
            principal = %caller,
            operation = %operation,
            code = %err.code(),
            error = %err,
            "Rejected"
        );

        // Paused rejections are never recorded
        if !self.config.audit_rejections || matches!(err, LedgerError::Paused) {
            return;
        }

        let audit = AuditEntry {
            seq: self.store.audit_len(),
            principal: caller.clone(),
            operation,
            target,
            timestamp: at,
            outcome: AuditOutcome::Failure(err.code()),
        };
        if let Err(storage_err) = self.store.commit(WriteBatch {
            mutations: Vec::new(),
            audit,
        }) {
            error!(error = %storage_err, "Failed to record rejection in audit trail");
        }
    }

    fn notify(&self, audit: &AuditEntry, transfers: &[TransferNotice]) {
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            for notice in transfers {
                observer.on_transfer(notice);
            }
            observer.on_commit(audit);
        }
    }

    // =========================================================================
    // Shared checks
    // =========================================================================

    /// Capability check against the configured directory
    pub fn has_role(&self, principal: &Principal, role: Role) -> bool {
        self.roles.has_role(principal, role)
    }

    pub(crate) fn require_any_role(&self, caller: &Principal, roles: &[Role]) -> Result<()> {
        if roles.iter().any(|role| self.has_role(caller, *role)) {
            Ok(())
        } else {
            Err(LedgerError::missing_role(caller, roles))
        }
    }

    pub(crate) fn require_admin(&self, caller: &Principal) -> Result<()> {
        if self.store.controls().admin.as_ref() == Some(caller) {
            Ok(())
        } else {
            Err(LedgerError::not_admin(caller))
        }
    }

    pub(crate) fn load(&self, hash: &DiamondHash) -> Result<DiamondRecord> {
        self.store
            .diamond(hash)
            .ok_or_else(|| LedgerError::diamond_not_found(hash))
    }

    pub(crate) fn require_owner(&self, record: &DiamondRecord, caller: &Principal) -> Result<()> {
        if &record.owner == caller {
            Ok(())
        } else {
            Err(LedgerError::not_owner(caller, &record.hash))
        }
    }

    // =========================================================================
    // Administration
    // =========================================================================

    /// Block every mutation until `unpause`
    pub fn pause(&self, caller: &Principal) -> Result<()> {
        self.execute(caller, Operation::Pause, None, |tx| {
            self.require_admin(caller)?;
            tx.push(Mutation::SetPaused(true));
            Ok(())
        })
    }

    pub fn unpause(&self, caller: &Principal) -> Result<()> {
        self.execute(caller, Operation::Unpause, None, |tx| {
            self.require_admin(caller)?;
            if !self.store.controls().paused {
                return Err(StateViolation::NotPaused.into());
            }
            tx.push(Mutation::SetPaused(false));
            Ok(())
        })
    }

    /// Hand the admin scalar to another principal
    pub fn set_admin(&self, caller: &Principal, new_admin: &Principal) -> Result<()> {
        self.execute(caller, Operation::SetAdmin, None, |tx| {
            self.require_admin(caller)?;
            gemtrace_core::validation::validate_principal(new_admin, Field::Principal)?;
            tx.push(Mutation::SetAdmin(new_admin.clone()));
            Ok(())
        })
    }

    pub fn is_paused(&self) -> bool {
        self.store.controls().paused
    }

    pub fn admin(&self) -> Option<Principal> {
        self.store.controls().admin
    }

    // =========================================================================
    // Diamond records
    // =========================================================================

    /// Register a newly mined diamond; the caller becomes its owner
    pub fn register(&self, caller: &Principal, input: NewDiamond) -> Result<DiamondHash> {
        let target = input.parse_hash().ok();
        self.execute(caller, Operation::RegisterDiamond, target, |tx| {
            self.require_any_role(caller, &[Role::Miner])?;

            let hash = input.parse_hash()?;
            if self.store.diamond(&hash).is_some() {
                return Err(LedgerError::AlreadyRegistered(format!("diamond {}", hash)));
            }

            let valid = input.validate()?;
            let record = DiamondRecord {
                hash: valid.hash.clone(),
                owner: caller.clone(),
                miner: caller.clone(),
                registered_at: tx.at(),
                updated_at: tx.at(),
                origin: valid.origin,
                geolocation: valid.geolocation,
                metadata: valid.metadata,
                carat: valid.carat,
                color: valid.color,
                clarity: valid.clarity,
                cut: valid.cut,
                status: DiamondStatus::Registered,
                locked: false,
            };
            tx.push(Mutation::InsertDiamond(record));
            Ok(valid.hash)
        })
    }

    /// Replace metadata, origin and geolocation of an unlocked record
    pub fn update_metadata(
        &self,
        caller: &Principal,
        hash: &DiamondHash,
        update: MetadataUpdate,
    ) -> Result<DiamondRecord> {
        self.execute(caller, Operation::UpdateMetadata, Some(hash.clone()), |tx| {
            let mut record = self.load(hash)?;
            self.require_owner(&record, caller)?;
            update.validate()?;
            if record.locked {
                return Err(StateViolation::Locked(hash.clone()).into());
            }

            record.metadata = update.metadata;
            record.origin = update.origin;
            record.geolocation = update.geolocation;
            record.updated_at = tx.at();
            tx.push(Mutation::UpdateDiamond(record.clone()));
            Ok(record)
        })
    }

    /// Owner-driven status change; `Disputed` is never accepted here
    pub fn set_status(
        &self,
        caller: &Principal,
        hash: &DiamondHash,
        status: DiamondStatus,
        locked: bool,
    ) -> Result<DiamondRecord> {
        self.execute(caller, Operation::SetStatus, Some(hash.clone()), |tx| {
            let mut record = self.load(hash)?;
            self.require_owner(&record, caller)?;
            check_transition(record.status, status, TransitionSource::Owner)?;

            record.status = status;
            record.locked = locked;
            record.updated_at = tx.at();
            tx.push(Mutation::UpdateDiamond(record.clone()));
            Ok(record)
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn record(&self, hash: &DiamondHash) -> Option<DiamondRecord> {
        self.store.diamond(hash)
    }

    pub fn is_registered(&self, hash: &DiamondHash) -> bool {
        self.store.diamond(hash).is_some()
    }

    pub fn diamond_count(&self) -> usize {
        self.store.diamond_count()
    }
}
