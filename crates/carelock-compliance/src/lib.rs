//! # carelock-compliance: Compliance rule engine
//!
//! Validates operations against administrative, physical, and technical
//! safeguards and produces weighted compliance reports.
//!
//! # Architecture
//!
//! ```text
//! AccessContext → ComplianceEngine → run rules (registration order):
//!   1. Each rule's check function returns pass/fail + recommendations
//!   2. A check error becomes a failed result; the batch always completes
//!   3. Report: compliance %, critical failures, deduped recommendations
//! ```
//!
//! Three evaluation modes trade latency against depth:
//! - [`ComplianceEngine::quick_validation`] — only critical+required
//!   rules, in parallel, for gating before the full report
//! - [`ComplianceEngine::validate_compliance`] — every rule, sequential
//! - [`ComplianceEngine::advanced_validation`] — full report plus a
//!   severity-weighted 0–100 risk score
//!
//! # Example
//!
//! ```
//! use carelock_compliance::{ComplianceEngine, RuleOutcome, Severity, SafeguardCategory, ValidationRule};
//! use carelock_types::{AccessContext, Action, Actor};
//!
//! let engine = ComplianceEngine::new();
//! engine.add_rule(ValidationRule::new(
//!     "tech_099",
//!     "MFA Required",
//!     SafeguardCategory::Technical,
//!     Severity::Critical,
//!     |ctx| {
//!         if ctx.environment.mfa_verified {
//!             Ok(RuleOutcome::pass("MFA verified"))
//!         } else {
//!             Ok(RuleOutcome::fail("MFA missing")
//!                 .with_recommendation("Enable multi-factor authentication"))
//!         }
//!     },
//! ));
//!
//! let ctx = AccessContext::new(Actor::new("u-1", "nurse"), "Patient", Action::Read);
//! let report = engine.validate_compliance(&ctx);
//! assert_eq!(report.overall_compliance, 0);
//! assert_eq!(report.critical_failures, 1);
//! ```

mod builtin;
mod engine;
mod report;
mod rule;

pub use builtin::{NoPhiFields, PhiFieldLookup, builtin_rules};
pub use engine::{ComplianceEngine, ComplianceStats, QuickValidation, RuleTiming};
pub use report::{
    ComplianceReport, RiskAssessment, RiskLevel, RuleResult,
};
pub use rule::{RuleInfo, RuleOutcome, SafeguardCategory, Severity, ValidationRule};

use thiserror::Error;

/// Parse errors for compliance enums.
#[derive(Debug, Error)]
pub enum ComplianceError {
    #[error("invalid severity: {0}")]
    InvalidSeverity(String),

    #[error("invalid safeguard category: {0}")]
    InvalidCategory(String),
}
