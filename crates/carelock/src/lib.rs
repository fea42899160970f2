//! # Carelock
//!
//! Access-control-and-compliance pipeline for clinical data.
//!
//! Four subsystems cooperate on every protected operation:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Carelock                              │
//! │  ┌──────────┐   ┌────────┐   ┌────────────┐   ┌───────────┐  │
//! │  │ Sessions │ → │  RBAC  │ → │ Compliance │ → │   Audit   │  │
//! │  │(validate)│   │(grant) │   │  (gate)    │   │ (masked)  │  │
//! │  └──────────┘   └────────┘   └────────────┘   └───────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! 1. The caller resolves a session (identity is authenticated upstream)
//! 2. RBAC grants or denies the action on the resource
//! 3. The compliance engine can still block on critical safeguard failures
//! 4. The audit trail records the outcome, masking all PHI first
//!
//! # Quick Start
//!
//! ```
//! use carelock::{AccessRequest, Authorization, Carelock, CarelockConfig, SessionMeta, User};
//! use carelock_types::{Action, UserId};
//!
//! let carelock = Carelock::new(CarelockConfig::default()).unwrap();
//!
//! // Provision identity
//! carelock
//!     .rbac()
//!     .set_user(User::new("n-1", "nurse.okafor").with_role("nurse"))
//!     .unwrap();
//!
//! // Issue a session (normally done by the identity layer)
//! let session = carelock.sessions().create_session(
//!     UserId::new("n-1"),
//!     "nurse",
//!     vec!["Patient:read".into()],
//!     SessionMeta::default(),
//! );
//!
//! // Authorize a protected operation
//! let outcome = carelock.authorize(
//!     &session.session_id,
//!     None,
//!     AccessRequest::new("Patient", Action::Read).with_resource_id("p-100"),
//! );
//! assert!(matches!(outcome, Authorization::Granted(_)));
//! ```

mod carelock;
mod pipeline;

pub use crate::carelock::Carelock;
pub use pipeline::{AccessDenial, AccessRequest, Authorization, GrantedAccess};

// Re-export core types
pub use carelock_types::{
    AccessContext, Action, Actor, Clock, Environment, ManualClock, RoleId, SessionId, SessionRef,
    SystemClock, UserId,
};

// Re-export component surfaces
pub use carelock_audit::{
    AuditConfig, AuditDraft, AuditEvent, AuditEventType, AuditFilter, AuditOutcome, AuditTrail,
    HipaaLevel,
};
pub use carelock_compliance::{
    ComplianceEngine, ComplianceReport, NoPhiFields, PhiFieldLookup, QuickValidation,
    RiskAssessment, RiskLevel, RuleOutcome, SafeguardCategory, Severity, ValidationRule,
};
pub use carelock_config::{CarelockConfig, ConfigError, ConfigLoader};
pub use carelock_masking::{FieldMasker, MaskingConfig, MaskingKind, MaskingRule};
pub use carelock_rbac::{
    AccessDecision, AccessEvaluator, AllowAll, CareAssignments, Condition, ConditionOperator,
    DenyAll, Permission, RbacError, Restriction, RestrictionKind, Role, RoleUpdate,
    StaticAssignments, User, default_roles,
};
pub use carelock_session::{
    SessionConfig, SessionData, SessionInfo, SessionManager, SessionMeta, TerminationReason,
};
