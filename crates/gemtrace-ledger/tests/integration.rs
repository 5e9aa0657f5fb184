//! Integration Tests
//!
//! End-to-end flows across the ledger's stores: registration, metadata,
//! status, certification, supply chain, ownership, disputes, audit and
//! verification.

use gemtrace_core::{
    AuditOutcome, CertificationStage, DiamondHash, DiamondStatus, DisputeAction, ErrorCode, Field,
    MetadataUpdate, NewDiamond, Operation, Principal, Role, SupplyChainEventKind,
};
use gemtrace_ledger::{
    AuditFilter, Ledger, LedgerConfig, LedgerError, Provenance, StagePolicy, StateViolation,
    TransferFeed, Unauthorized,
};
use std::sync::Arc;

// =============================================================================
// Test Helpers
// =============================================================================

struct Fixture {
    ledger: Ledger,
    admin: Principal,
    miner: Principal,
    certifier: Principal,
    cutter: Principal,
    retailer: Principal,
    arbiter: Principal,
}

fn setup_with(config: LedgerConfig) -> Fixture {
    let ledger = Ledger::in_memory(config).unwrap();
    let admin = Principal::new("admin");
    let fixture = Fixture {
        miner: Principal::new("miner"),
        certifier: Principal::new("certifier"),
        cutter: Principal::new("cutter"),
        retailer: Principal::new("retailer"),
        arbiter: Principal::new("arbiter"),
        admin,
        ledger,
    };

    for (principal, role) in [
        (&fixture.miner, Role::Miner),
        (&fixture.certifier, Role::Certifier),
        (&fixture.cutter, Role::Cutter),
        (&fixture.retailer, Role::Retailer),
        (&fixture.arbiter, Role::Arbiter),
    ] {
        fixture
            .ledger
            .register_authority(&fixture.admin, principal, role)
            .unwrap();
    }
    fixture
}

fn setup() -> Fixture {
    setup_with(LedgerConfig::new("admin"))
}

fn gem(hash: &str) -> NewDiamond {
    NewDiamond {
        hash: hash.into(),
        origin: "Jwaneng, Botswana".into(),
        geolocation: "-24.53,24.70".into(),
        metadata: "rough, 3.1ct before cutting".into(),
        carat: 150,
        color: "D".into(),
        clarity: "VVS1".into(),
        cut: "Excellent".into(),
    }
}

fn update(metadata: &str) -> MetadataUpdate {
    MetadataUpdate {
        metadata: metadata.into(),
        origin: "Jwaneng, Botswana".into(),
        geolocation: "-24.53,24.70".into(),
    }
}

fn hash(value: &str) -> DiamondHash {
    DiamondHash::parse(value).unwrap()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_register_update_transfer_scenario() {
    let f = setup();
    let buyer = Principal::new("buyer");
    let stranger = Principal::new("stranger");

    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    assert_eq!(f.ledger.record(&h1).unwrap().status, DiamondStatus::Registered);

    let err = f
        .ledger
        .update_metadata(&stranger, &h1, update("tampered"))
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Unauthorized(Unauthorized::NotOwner { .. })
    ));

    f.ledger
        .transfer_ownership(&f.miner, &h1, &buyer, None)
        .unwrap();

    let history = f.ledger.ownership_history(&h1);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].previous_owner, f.miner);
    assert_eq!(history[0].new_owner, buyer);
    assert_eq!(f.ledger.record(&h1).unwrap().owner, buyer);
}

#[test]
fn test_field_validation_scenario() {
    let f = setup();
    let field_of = |diamond: NewDiamond| {
        f.ledger
            .register(&f.miner, diamond)
            .unwrap_err()
            .validation()
            .map(|err| err.field)
    };

    let mut zero_carat = gem("H2");
    zero_carat.carat = 0;
    assert_eq!(field_of(zero_carat), Some(Field::Carat));

    let mut bad_color = gem("H2");
    bad_color.color = "Z".into();
    assert_eq!(field_of(bad_color), Some(Field::Color));

    let mut long_metadata = gem("H2");
    long_metadata.metadata = "x".repeat(501);
    assert_eq!(field_of(long_metadata), Some(Field::MetadataLength));

    assert!(!f.ledger.is_registered(&hash("H2")));
}

#[test]
fn test_negative_certification_scenario() {
    let f = setup();
    let second_certifier = Principal::new("second-certifier");
    f.ledger
        .register_authority(&f.admin, &second_certifier, Role::Certifier)
        .unwrap();

    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    f.ledger
        .add_certification(&f.certifier, &h1, "rough-export", true, "kp-cert-001")
        .unwrap();
    assert!(f.ledger.verify_conflict_free(&h1).unwrap());

    f.ledger
        .add_certification(&second_certifier, &h1, "cutting", false, "kp-cert-002")
        .unwrap();
    assert!(!f.ledger.verify_conflict_free(&h1).unwrap());
}

// =============================================================================
// Registry
// =============================================================================

#[test]
fn test_registration_is_permanent() {
    let f = setup();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    assert!(f.ledger.is_registered(&h1));

    // Every later mutation leaves the record in place
    f.ledger
        .set_status(&f.miner, &h1, DiamondStatus::Pending, true)
        .unwrap();
    f.ledger
        .transfer_ownership(&f.miner, &h1, &f.retailer, None)
        .unwrap_err();
    f.ledger
        .raise_dispute(&f.arbiter, &h1, "origin doubt")
        .unwrap();
    f.ledger
        .resolve_dispute(&f.arbiter, &h1, DiamondStatus::Registered)
        .unwrap();

    assert!(f.ledger.is_registered(&h1));
    assert_eq!(f.ledger.diamond_count(), 1);
}

#[test]
fn test_duplicate_registration_regardless_of_caller() {
    let f = setup();
    let other_miner = Principal::new("other-miner");
    f.ledger
        .register_authority(&f.admin, &other_miner, Role::Miner)
        .unwrap();

    f.ledger.register(&f.miner, gem("H1")).unwrap();
    for caller in [&f.miner, &other_miner] {
        let err = f.ledger.register(caller, gem("H1")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyRegistered);
    }
    assert_eq!(f.ledger.record(&hash("H1")).unwrap().owner, f.miner);
}

#[test]
fn test_malformed_hash_rejected() {
    let f = setup();
    let too_long = "x".repeat(129);
    for bad in ["", "has space", too_long.as_str()] {
        let err = f.ledger.register(&f.miner, gem(bad)).unwrap_err();
        assert_eq!(err.validation().map(|v| v.field), Some(Field::Hash));
    }

    let derived = DiamondHash::derive("GIA-2141438167", &[("girdle", "medium")]);
    let registered = f.ledger.register(&f.miner, gem(derived.as_str())).unwrap();
    assert_eq!(registered, derived);
}

#[test]
fn test_locked_record_rejects_metadata_update() {
    let f = setup();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    f.ledger
        .set_status(&f.miner, &h1, DiamondStatus::Registered, true)
        .unwrap();

    let err = f
        .ledger
        .update_metadata(&f.miner, &h1, update("recut"))
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InvalidStateTransition(StateViolation::Locked(_))
    ));
    assert_eq!(err.code(), ErrorCode::RecordLocked);

    // Unlocking restores editing
    f.ledger
        .set_status(&f.miner, &h1, DiamondStatus::Registered, false)
        .unwrap();
    let record = f
        .ledger
        .update_metadata(&f.miner, &h1, update("recut"))
        .unwrap();
    assert_eq!(record.metadata, "recut");
    assert!(record.updated_at > record.registered_at);
}

#[test]
fn test_metadata_update_validates_before_lock() {
    let f = setup();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    f.ledger
        .set_status(&f.miner, &h1, DiamondStatus::Registered, true)
        .unwrap();

    let mut bad = update("fine");
    bad.origin = String::new();
    let err = f.ledger.update_metadata(&f.miner, &h1, bad).unwrap_err();
    assert_eq!(err.validation().map(|v| v.field), Some(Field::Origin));
}

// =============================================================================
// Pause
// =============================================================================

#[test]
fn test_pause_blocks_every_mutation_but_not_reads() {
    let f = setup();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    f.ledger
        .add_certification(&f.certifier, &h1, "rough-export", true, "kp-1")
        .unwrap();
    f.ledger.pause(&f.admin).unwrap();
    let audit_before = f.ledger.audit_len();

    let l = &f.ledger;
    let results: Vec<(&str, Result<(), LedgerError>)> = vec![
        ("register_authority", l.register_authority(&f.admin, &"new".into(), Role::Auditor).map(drop)),
        ("revoke_authority", l.revoke_authority(&f.admin, &f.cutter).map(drop)),
        ("register", l.register(&f.miner, gem("H2")).map(drop)),
        ("update_metadata", l.update_metadata(&f.miner, &h1, update("m")).map(drop)),
        ("set_status", l.set_status(&f.miner, &h1, DiamondStatus::Pending, false).map(drop)),
        ("transfer", l.transfer_ownership(&f.miner, &h1, &f.retailer, None).map(drop)),
        ("certify", l.add_certification(&f.certifier, &h1, "cutting", true, "kp-2").map(drop)),
        ("log_event", l.log_event(&f.miner, &h1, "export", "Gaborone").map(drop)),
        ("raise_dispute", l.raise_dispute(&f.arbiter, &h1, "doubt").map(drop)),
        ("add_evidence", l.add_dispute_evidence(&f.arbiter, &h1, "photo").map(drop)),
        ("resolve_dispute", l.resolve_dispute(&f.arbiter, &h1, DiamondStatus::Certified).map(drop)),
        ("pause", l.pause(&f.admin)),
        ("set_admin", l.set_admin(&f.admin, &"successor".into())),
    ];
    for (name, result) in results {
        assert!(
            matches!(result, Err(LedgerError::Paused)),
            "{} must fail with Paused while paused",
            name
        );
    }

    // Reads keep working
    assert!(l.is_paused());
    assert_eq!(l.admin(), Some(f.admin.clone()));
    assert!(l.is_registered(&h1));
    assert!(l.record(&h1).is_some());
    assert_eq!(l.certifications(&h1).len(), 1);
    assert!(l.ownership_history(&h1).is_empty());
    assert!(l.supply_chain_events(&h1).is_empty());
    assert!(l.provenance(&h1).is_ok());
    assert!(l.verify_conflict_free(&h1).unwrap());
    assert!(l.has_role(&f.miner, Role::Miner));
    assert!(!l.query_logs(&AuditFilter::new()).is_empty());

    // Rejected calls left no trace
    assert_eq!(l.audit_len(), audit_before);
    assert!(!l.is_registered(&hash("H2")));

    l.unpause(&f.admin).unwrap();
    l.register(&f.miner, gem("H2")).unwrap();
}

#[test]
fn test_paused_check_precedes_authorization() {
    let f = setup();
    f.ledger.pause(&f.admin).unwrap();

    let err = f
        .ledger
        .register(&"nobody".into(), gem(""))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Paused));
}

#[test]
fn test_set_admin_rejected_while_paused() {
    let f = setup();
    let successor = Principal::new("successor");
    f.ledger.pause(&f.admin).unwrap();

    let err = f.ledger.set_admin(&f.admin, &successor).unwrap_err();
    assert!(matches!(err, LedgerError::Paused));
    assert_eq!(f.ledger.admin(), Some(f.admin.clone()));

    // Only the current admin can lift the pause
    let err = f.ledger.unpause(&successor).unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized(_)));
    f.ledger.unpause(&f.admin).unwrap();
    f.ledger.set_admin(&f.admin, &successor).unwrap();
    assert_eq!(f.ledger.admin(), Some(successor));
}

// =============================================================================
// Ownership
// =============================================================================

#[test]
fn test_ownership_replay_reconstructs_owner() {
    let f = setup();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    let chain = [f.cutter.clone(), f.retailer.clone(), Principal::new("collector")];

    let mut owner = f.miner.clone();
    for next in &chain {
        f.ledger.transfer_ownership(&owner, &h1, next, None).unwrap();
        owner = next.clone();
    }

    let history = f.ledger.ownership_history(&h1);
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].previous_owner, f.miner);
    assert!(history.iter().enumerate().all(|(i, e)| e.seq == i as u64));

    let replayed = f.ledger.verify_ownership_chain(&h1).unwrap();
    assert_eq!(replayed, f.ledger.record(&h1).unwrap().owner);
    assert_eq!(replayed, Principal::new("collector"));
    f.ledger.check_consistency(&h1).unwrap();
}

#[test]
fn test_transfer_rules() {
    let f = setup();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();

    // Only the owner transfers
    let err = f
        .ledger
        .transfer_ownership(&f.retailer, &h1, &f.retailer, None)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotOwner);

    // Not to oneself, not to nobody
    let err = f
        .ledger
        .transfer_ownership(&f.miner, &h1, &f.miner, None)
        .unwrap_err();
    assert_eq!(err.validation().map(|v| v.field), Some(Field::NewOwner));
    let err = f
        .ledger
        .transfer_ownership(&f.miner, &h1, &"".into(), None)
        .unwrap_err();
    assert_eq!(err.validation().map(|v| v.field), Some(Field::NewOwner));

    // Reference to a supply-chain event that does not exist
    let err = f
        .ledger
        .transfer_ownership(&f.miner, &h1, &f.retailer, Some(0))
        .unwrap_err();
    assert_eq!(err.validation().map(|v| v.field), Some(Field::SupplyChainRef));

    // Unknown diamond
    let err = f
        .ledger
        .transfer_ownership(&f.miner, &hash("missing"), &f.retailer, None)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    assert!(f.ledger.ownership_history(&h1).is_empty());
}

#[test]
fn test_locked_record_cannot_transfer() {
    let f = setup();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    f.ledger
        .set_status(&f.miner, &h1, DiamondStatus::Registered, true)
        .unwrap();

    let err = f
        .ledger
        .transfer_ownership(&f.miner, &h1, &f.retailer, None)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::RecordLocked);
    assert_eq!(f.ledger.record(&h1).unwrap().owner, f.miner);
}

#[test]
fn test_transfer_settles_supply_chain_sale() {
    let f = setup();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    f.ledger
        .transfer_ownership(&f.miner, &h1, &f.retailer, None)
        .unwrap();
    let sale = f
        .ledger
        .log_event(&f.retailer, &h1, "sale", "Antwerp showroom, invoice 8812")
        .unwrap();

    let event = f
        .ledger
        .transfer_ownership(&f.retailer, &h1, &"collector".into(), Some(sale.seq))
        .unwrap();
    assert_eq!(event.supply_chain_ref, Some(0));
    f.ledger.check_consistency(&h1).unwrap();
}

#[test]
fn test_transfer_notifies_observers() {
    let f = setup();
    let feed = Arc::new(TransferFeed::new());
    f.ledger.subscribe(feed.clone());

    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    assert!(feed.drain().is_empty());

    f.ledger
        .transfer_ownership(&f.miner, &h1, &f.cutter, None)
        .unwrap();
    f.ledger
        .transfer_ownership(&f.miner, &h1, &f.retailer, None)
        .unwrap_err();

    let notices = feed.drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].hash, h1);
    assert_eq!(notices[0].previous_owner, f.miner);
    assert_eq!(notices[0].new_owner, f.cutter);
    assert_eq!(notices[0].ownership_seq, 0);
}

// =============================================================================
// Certification
// =============================================================================

#[test]
fn test_certification_rules() {
    let f = setup();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();

    let err = f
        .ledger
        .add_certification(&f.miner, &h1, "rough-export", true, "kp-1")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);

    let err = f
        .ledger
        .add_certification(&f.certifier, &hash("missing"), "rough-export", true, "kp-1")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err = f
        .ledger
        .add_certification(&f.certifier, &h1, "setting", true, "kp-1")
        .unwrap_err();
    assert_eq!(err.validation().map(|v| v.field), Some(Field::Stage));

    let err = f
        .ledger
        .add_certification(&f.certifier, &h1, "grading", true, "  ")
        .unwrap_err();
    assert_eq!(err.validation().map(|v| v.field), Some(Field::ProofRef));

    // Lock does not block certification
    f.ledger
        .set_status(&f.miner, &h1, DiamondStatus::Registered, true)
        .unwrap();
    let entry = f
        .ledger
        .add_certification(&f.certifier, &h1, "rough_export", true, "kp-1")
        .unwrap();
    assert_eq!(entry.stage, CertificationStage::RoughExport);
    assert_eq!(entry.seq, 0);
    assert_eq!(f.ledger.certifications(&h1).len(), 1);
}

#[test]
fn test_conflict_free_follows_required_stages() {
    let f = setup();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    assert!(!f.ledger.verify_conflict_free(&h1).unwrap());

    f.ledger
        .add_certification(&f.certifier, &h1, "rough-export", true, "kp-1")
        .unwrap();
    assert!(f.ledger.verify_conflict_free(&h1).unwrap());

    f.ledger
        .set_status(&f.miner, &h1, DiamondStatus::Pending, false)
        .unwrap();
    f.ledger
        .set_status(&f.miner, &h1, DiamondStatus::Certified, false)
        .unwrap();

    let report = f.ledger.assess_conflict_free(&h1).unwrap();
    assert!(!report.conflict_free);
    assert_eq!(
        report.missing_stages,
        vec![CertificationStage::Cutting, CertificationStage::Polishing]
    );

    for stage in ["cutting", "polishing"] {
        f.ledger
            .add_certification(&f.certifier, &h1, stage, true, "kp-2")
            .unwrap();
    }
    assert!(f.ledger.verify_conflict_free(&h1).unwrap());
}

#[test]
fn test_custom_stage_policy() {
    let policy = StagePolicy::default().with_required(
        DiamondStatus::Registered,
        [CertificationStage::RoughExport, CertificationStage::Grading],
    );
    let f = setup_with(LedgerConfig::new("admin").with_stage_policy(policy));
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    f.ledger
        .add_certification(&f.certifier, &h1, "rough-export", true, "kp-1")
        .unwrap();

    let report = f.ledger.assess_conflict_free(&h1).unwrap();
    assert_eq!(report.missing_stages, vec![CertificationStage::Grading]);
}

#[test]
fn test_verification_of_unknown_hash() {
    let f = setup();
    let missing = hash("missing");
    assert_eq!(
        f.ledger.verify_conflict_free(&missing).unwrap_err().code(),
        ErrorCode::NotFound
    );
    assert_eq!(
        f.ledger.provenance(&missing).unwrap_err().code(),
        ErrorCode::NotFound
    );
    assert!(f.ledger.record(&missing).is_none());
    assert!(f.ledger.certifications(&missing).is_empty());
}

// =============================================================================
// Supply Chain
// =============================================================================

#[test]
fn test_supply_chain_roles_per_event() {
    let f = setup();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();

    let allowed = [
        (&f.miner, "export"),
        (&f.cutter, "cut"),
        (&f.cutter, "polish"),
        (&f.certifier, "inspection"),
        (&f.retailer, "import"),
        (&f.retailer, "sale"),
    ];
    for (caller, kind) in allowed {
        f.ledger.log_event(caller, &h1, kind, "").unwrap();
    }

    let err = f.ledger.log_event(&f.retailer, &h1, "cut", "").unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    let err = f.ledger.log_event(&f.miner, &h1, "sale", "").unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);

    let events = f.ledger.supply_chain_events(&h1);
    assert_eq!(events.len(), 6);
    assert_eq!(events[1].kind, SupplyChainEventKind::Cut);
    assert_eq!(events[1].actor, f.cutter);
    assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[test]
fn test_unknown_event_type_checks_role_first() {
    let f = setup();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();

    // Outsider: authorization fails before the type is looked at
    let err = f
        .ledger
        .log_event(&f.arbiter, &h1, "teleport", "")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);

    // Supply-chain actor on a missing diamond: existence next
    let err = f
        .ledger
        .log_event(&f.cutter, &hash("missing"), "teleport", "")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err = f
        .ledger
        .log_event(&f.cutter, &h1, "teleport", "")
        .unwrap_err();
    assert_eq!(err.validation().map(|v| v.field), Some(Field::EventType));
}

#[test]
fn test_event_detail_limit() {
    let f = setup();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    f.ledger
        .log_event(&f.miner, &h1, "export", &"é".repeat(500))
        .unwrap();
    let err = f
        .ledger
        .log_event(&f.miner, &h1, "export", &"é".repeat(501))
        .unwrap_err();
    assert_eq!(err.validation().map(|v| v.field), Some(Field::Detail));
}

// =============================================================================
// Disputes
// =============================================================================

#[test]
fn test_dispute_lifecycle() {
    let f = setup();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    f.ledger
        .add_certification(&f.certifier, &h1, "rough-export", true, "kp-1")
        .unwrap();
    f.ledger
        .set_status(&f.miner, &h1, DiamondStatus::Pending, false)
        .unwrap();

    f.ledger
        .raise_dispute(&f.arbiter, &h1, "Kimberley certificate mismatch")
        .unwrap();
    assert_eq!(f.ledger.record(&h1).unwrap().status, DiamondStatus::Disputed);
    assert!(!f.ledger.verify_conflict_free(&h1).unwrap());

    // Frozen for transfers and owner status changes
    let err = f
        .ledger
        .transfer_ownership(&f.miner, &h1, &f.retailer, None)
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InvalidStateTransition(StateViolation::Disputed(_))
    ));
    let err = f
        .ledger
        .set_status(&f.miner, &h1, DiamondStatus::Certified, false)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidStateTransition);

    // A second dispute cannot be stacked
    let err = f.ledger.raise_dispute(&f.arbiter, &h1, "again").unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidStateTransition);

    f.ledger
        .add_dispute_evidence(&f.arbiter, &h1, "lab report 44-B")
        .unwrap();
    f.ledger
        .add_dispute_evidence(&f.miner, &h1, "export permit KP-2231")
        .unwrap();

    // Owners cannot resolve their own dispute
    let err = f
        .ledger
        .resolve_dispute(&f.miner, &h1, DiamondStatus::Certified)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);

    let err = f
        .ledger
        .resolve_dispute(&f.arbiter, &h1, DiamondStatus::Pending)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidStateTransition);

    f.ledger
        .resolve_dispute(&f.arbiter, &h1, DiamondStatus::Registered)
        .unwrap();
    assert_eq!(f.ledger.record(&h1).unwrap().status, DiamondStatus::Registered);

    let disputes = f.ledger.disputes(&h1);
    assert_eq!(disputes.len(), 4);
    assert!(matches!(
        disputes[0].action,
        DisputeAction::Raised {
            prior_status: DiamondStatus::Pending,
            ..
        }
    ));
    assert!(matches!(
        disputes[3].action,
        DisputeAction::Resolved {
            outcome: DiamondStatus::Registered
        }
    ));

    // Evidence and resolution need an open dispute
    let err = f
        .ledger
        .add_dispute_evidence(&f.miner, &h1, "late")
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InvalidStateTransition(StateViolation::NotDisputed(_))
    ));

    f.ledger
        .transfer_ownership(&f.miner, &h1, &f.retailer, None)
        .unwrap();
    f.ledger.check_consistency(&h1).unwrap();
}

#[test]
fn test_outsider_cannot_raise_dispute() {
    let f = setup();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    let err = f
        .ledger
        .raise_dispute(&f.retailer, &h1, "competitor")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    assert_eq!(f.ledger.record(&h1).unwrap().status, DiamondStatus::Registered);
    assert!(f.ledger.disputes(&h1).is_empty());
}

#[test]
fn test_owner_cannot_raise_dispute() {
    let f = setup();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    let audit_before = f.ledger.audit_len();

    let err = f
        .ledger
        .raise_dispute(&f.miner, &h1, "freeze my own stone")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    assert_eq!(f.ledger.record(&h1).unwrap().status, DiamondStatus::Registered);
    assert!(f.ledger.disputes(&h1).is_empty());
    assert_eq!(f.ledger.audit_len(), audit_before);

    // Without an open dispute the owner has nothing to attach evidence to
    let err = f
        .ledger
        .add_dispute_evidence(&f.miner, &h1, "photo")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
}

// =============================================================================
// Audit Trail
// =============================================================================

#[test]
fn test_every_commit_is_audited() {
    let f = setup();
    let start = f.ledger.audit_len();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    f.ledger
        .add_certification(&f.certifier, &h1, "rough-export", true, "kp-1")
        .unwrap();
    f.ledger
        .transfer_ownership(&f.miner, &h1, &f.cutter, None)
        .unwrap();

    let entries = f.ledger.audit_range(start..f.ledger.audit_len());
    let operations: Vec<_> = entries.iter().map(|e| e.operation).collect();
    assert_eq!(
        operations,
        vec![
            Operation::RegisterDiamond,
            Operation::AddCertification,
            Operation::TransferOwnership
        ]
    );
    assert!(entries.iter().all(|e| e.target.as_ref() == Some(&h1)));
    assert!(entries.iter().all(|e| e.outcome.is_success()));

    let all = f.ledger.query_logs(&AuditFilter::new());
    assert!(all.iter().enumerate().all(|(i, e)| e.seq == i as u64));
    assert!(all.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert_eq!(all[0].operation, Operation::Initialize);
}

#[test]
fn test_query_logs_filters() {
    let f = setup();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    let h2 = f.ledger.register(&f.miner, gem("H2")).unwrap();
    f.ledger
        .transfer_ownership(&f.miner, &h2, &f.cutter, None)
        .unwrap();

    let by_miner = f.ledger.query_logs(&AuditFilter::new().principal("miner"));
    assert_eq!(by_miner.len(), 3);

    let on_h2 = f.ledger.query_logs(&AuditFilter::new().target(h2.clone()));
    assert_eq!(on_h2.len(), 2);

    let transfers = f.ledger.query_logs(
        &AuditFilter::new()
            .target(h2)
            .operation(Operation::TransferOwnership),
    );
    assert_eq!(transfers.len(), 1);

    let first = f.ledger.query_logs(&AuditFilter::new().target(h1))[0].timestamp;
    let window = f
        .ledger
        .query_logs(&AuditFilter::new().between(first, first));
    assert_eq!(window.len(), 1);
}

#[test]
fn test_rejections_not_audited_by_default() {
    let f = setup();
    let before = f.ledger.audit_len();
    f.ledger.register(&"nobody".into(), gem("H1")).unwrap_err();
    f.ledger.unpause(&f.admin).unwrap_err();
    assert_eq!(f.ledger.audit_len(), before);
}

#[test]
fn test_rejections_audited_when_enabled() {
    let f = setup_with(LedgerConfig::new("admin").with_audit_rejections(true));
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    let before = f.ledger.audit_len();

    f.ledger
        .update_metadata(&"stranger".into(), &h1, update("tampered"))
        .unwrap_err();

    let failures = f.ledger.query_logs(&AuditFilter::new().failures_only());
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].seq, before);
    assert_eq!(failures[0].operation, Operation::UpdateMetadata);
    assert_eq!(failures[0].target.as_ref(), Some(&h1));
    assert_eq!(failures[0].outcome, AuditOutcome::Failure(ErrorCode::NotOwner));
    assert_ne!(f.ledger.record(&h1).unwrap().metadata, "tampered");

    // Paused rejections are never recorded
    f.ledger.pause(&f.admin).unwrap();
    let paused_at = f.ledger.audit_len();
    f.ledger.register(&f.miner, gem("H2")).unwrap_err();
    assert_eq!(f.ledger.audit_len(), paused_at);
}

// =============================================================================
// Provenance
// =============================================================================

#[test]
fn test_provenance_export() {
    let f = setup();
    let h1 = f.ledger.register(&f.miner, gem("H1")).unwrap();
    f.ledger
        .log_event(&f.miner, &h1, "export", "Gaborone, KP cert BW-0091")
        .unwrap();
    f.ledger
        .add_certification(&f.certifier, &h1, "rough-export", true, "kp-BW-0091")
        .unwrap();
    f.ledger
        .transfer_ownership(&f.miner, &h1, &f.cutter, Some(0))
        .unwrap();

    let provenance = f.ledger.provenance(&h1).unwrap();
    assert_eq!(provenance.record.owner, f.cutter);
    assert_eq!(provenance.certifications.len(), 1);
    assert_eq!(provenance.ownership_history.len(), 1);
    assert_eq!(provenance.supply_chain_events.len(), 1);
    assert!(provenance.disputes.is_empty());

    let json = provenance.to_json().unwrap();
    assert!(json.contains("\"rough-export\""));
    assert!(json.contains("\"VVS1\""));
    let parsed: Provenance = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, provenance);
}
