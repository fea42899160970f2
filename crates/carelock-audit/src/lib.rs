//! # carelock-audit: Audit trail
//!
//! Records every granted/denied decision and compliance outcome. Payloads
//! pass through the masking engine *before* they are stored or forwarded:
//! nothing unmasked ever leaves this boundary.
//!
//! Remote delivery (when an endpoint is configured) is fire-and-forget on
//! the ambient tokio runtime; delivery failures are logged and never
//! surfaced to the caller.

mod config;
mod event;
mod trail;

pub use config::{AuditConfig, HipaaLevel};
pub use event::{AuditDraft, AuditEvent, AuditEventType, AuditFilter, AuditOutcome};
pub use trail::{AuditStats, AuditTrail};
