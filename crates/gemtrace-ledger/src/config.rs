//! Ledger configuration
//!
//! Defaults are usable as-is; `from_env` reads overrides from `GEMTRACE_*`
//! variables:
//!
//! - `GEMTRACE_ADMIN` (required): principal installed as admin on first open
//! - `GEMTRACE_AUDIT_REJECTIONS`: `true`/`false`, default `false`
//! - `GEMTRACE_LOG_LEVEL`: `trace`..`error`, default `info`
//! - `GEMTRACE_REQUIRED_STAGES_REGISTERED`, `_PENDING`, `_CERTIFIED`:
//!   comma-separated certification stages required for that status

use gemtrace_core::{CertificationStage, DiamondStatus, Principal};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Certification stages a diamond needs, per status, to count as
/// conflict-free
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePolicy {
    required: HashMap<DiamondStatus, BTreeSet<CertificationStage>>,
}

impl Default for StagePolicy {
    fn default() -> Self {
        use CertificationStage::*;

        let mut required = HashMap::new();
        required.insert(DiamondStatus::Registered, BTreeSet::from([RoughExport]));
        required.insert(DiamondStatus::Pending, BTreeSet::from([RoughExport]));
        required.insert(
            DiamondStatus::Certified,
            BTreeSet::from([RoughExport, Cutting, Polishing]),
        );
        Self { required }
    }
}

impl StagePolicy {
    /// Replace the stages required for one status
    pub fn with_required(
        mut self,
        status: DiamondStatus,
        stages: impl IntoIterator<Item = CertificationStage>,
    ) -> Self {
        self.required.insert(status, stages.into_iter().collect());
        self
    }

    /// Stages required for `status`, in stage order
    ///
    /// `Disputed` has no entry: a disputed diamond is never conflict-free,
    /// whatever its certifications say.
    pub fn required_for(&self, status: DiamondStatus) -> Vec<CertificationStage> {
        self.required
            .get(&status)
            .map(|stages| stages.iter().copied().collect())
            .unwrap_or_default()
    }
}

/// Ledger configuration
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Admin installed when the store is first initialized
    pub admin: Principal,
    /// Record rejected operations (except `Paused`) in the audit trail
    pub audit_rejections: bool,
    pub stage_policy: StagePolicy,
    pub log_level: Level,
}

impl LedgerConfig {
    pub fn new(admin: impl Into<Principal>) -> Self {
        Self {
            admin: admin.into(),
            audit_rejections: false,
            stage_policy: StagePolicy::default(),
            log_level: Level::INFO,
        }
    }

    pub fn with_audit_rejections(mut self, enabled: bool) -> Self {
        self.audit_rejections = enabled;
        self
    }

    pub fn with_stage_policy(mut self, policy: StagePolicy) -> Self {
        self.stage_policy = policy;
        self
    }

    /// Load configuration from `GEMTRACE_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let admin = lookup("GEMTRACE_ADMIN")
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing("GEMTRACE_ADMIN"))?;
        let mut config = Self::new(admin.trim());

        if let Some(value) = lookup("GEMTRACE_AUDIT_REJECTIONS") {
            config.audit_rejections = parse_bool("GEMTRACE_AUDIT_REJECTIONS", &value)?;
        }

        if let Some(value) = lookup("GEMTRACE_LOG_LEVEL") {
            config.log_level = value.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "GEMTRACE_LOG_LEVEL".into(),
                value: value.clone(),
                reason: "expected one of trace, debug, info, warn, error".into(),
            })?;
        }

        for status in [
            DiamondStatus::Registered,
            DiamondStatus::Pending,
            DiamondStatus::Certified,
        ] {
            let key = format!(
                "GEMTRACE_REQUIRED_STAGES_{}",
                status.as_str().to_ascii_uppercase()
            );
            if let Some(value) = lookup(&key) {
                let stages = parse_stages(&key, &value)?;
                config.stage_policy = config.stage_policy.with_required(status, stages);
            }
        }

        Ok(config)
    }

    /// Install a global fmt subscriber at the configured level
    ///
    /// Returns `false` if a global subscriber was already installed.
    pub fn init_tracing(&self) -> bool {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(self.log_level)
            .with_target(true)
            .finish();

        tracing::subscriber::set_global_default(subscriber).is_ok()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected true or false".into(),
        }),
    }
}

fn parse_stages(key: &str, value: &str) -> Result<Vec<CertificationStage>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<CertificationStage>()
                .map_err(|err| ConfigError::Invalid {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: err.to_string(),
                })
        })
        .collect()
}
