//! The protected-operation pipeline.
//!
//! `authorize` runs the full control flow for one attempted operation:
//! session validation → access context → RBAC decision → critical
//! compliance gate → audit record. Every outcome — including denials — is
//! audited with masked payloads.

use serde_json::{Value, json};
use tracing::debug;

use carelock_audit::{AuditDraft, AuditEventType, AuditOutcome};
use carelock_compliance::QuickValidation;
use carelock_rbac::AccessDecision;
use carelock_session::SessionData;
use carelock_types::{AccessContext, Action, Actor, Environment, SessionId, SessionRef, UserId};

use crate::Carelock;

/// One attempted operation on a protected resource.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    pub resource: String,
    pub action: Action,
    pub resource_id: Option<String>,
    pub data: Option<Value>,
    pub environment: Environment,
}

impl AccessRequest {
    pub fn new(resource: impl Into<String>, action: Action) -> Self {
        Self {
            resource: resource.into(),
            action,
            resource_id: None,
            data: None,
            environment: Environment::default(),
        }
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

/// A granted operation, with everything the caller may want to log or
/// propagate.
#[derive(Debug, Clone)]
pub struct GrantedAccess {
    pub session: SessionData,
    pub decision: AccessDecision,
    pub compliance: QuickValidation,
}

/// Why an operation was refused. Structured, never an error: the caller
/// translates into its own user-facing shape without leaking rule ids to
/// untrusted clients.
#[derive(Debug, Clone)]
pub enum AccessDenial {
    /// No valid session (unknown, expired, idle, or ip mismatch).
    InvalidSession,
    /// RBAC denied the action.
    PermissionDenied(AccessDecision),
    /// RBAC granted, but a critical compliance rule failed.
    ComplianceBlocked(QuickValidation),
}

/// Outcome of the pipeline.
#[derive(Debug, Clone)]
pub enum Authorization {
    Granted(Box<GrantedAccess>),
    Denied(AccessDenial),
}

impl Authorization {
    pub fn is_granted(&self) -> bool {
        matches!(self, Authorization::Granted(_))
    }
}

impl Carelock {
    /// Runs the full protected-operation pipeline.
    pub fn authorize(
        &self,
        session_id: &SessionId,
        ip: Option<&str>,
        request: AccessRequest,
    ) -> Authorization {
        let Some(session) = self.sessions().validate_session(session_id, ip) else {
            self.audit().log_event(
                AuditDraft::new(
                    AuditEventType::Access,
                    UserId::new("unknown"),
                    format!("{} {}", request.action, request.resource),
                    AuditOutcome::Denied,
                )
                .with_details(json!({"reason": "invalid session"})),
            );
            return Authorization::Denied(AccessDenial::InvalidSession);
        };

        let ctx = self.build_context(&session, ip, request);

        let decision = self.rbac().check_access(&ctx);
        if !decision.granted {
            self.record(&ctx, AuditOutcome::Denied, json!({"reason": decision.reason}));
            return Authorization::Denied(AccessDenial::PermissionDenied(decision));
        }

        let gate = self.compliance().quick_validation(&ctx);
        if !gate.passed {
            self.record(
                &ctx,
                AuditOutcome::Denied,
                json!({
                    "reason": "critical compliance failure",
                    "failedRules": gate.failed_rules,
                }),
            );
            return Authorization::Denied(AccessDenial::ComplianceBlocked(gate));
        }

        self.record(&ctx, AuditOutcome::Success, json!({"reason": decision.reason}));
        debug!(
            user_id = %ctx.actor.id,
            resource = %ctx.resource,
            action = %ctx.action,
            "protected operation authorized"
        );

        Authorization::Granted(Box::new(GrantedAccess {
            session,
            decision,
            compliance: gate,
        }))
    }

    fn build_context(
        &self,
        session: &SessionData,
        ip: Option<&str>,
        request: AccessRequest,
    ) -> AccessContext {
        let mut environment = request.environment;
        // Every decision below is recorded in the audit trail.
        environment.audit_logged = true;
        if environment.ip_address.is_none() {
            environment.ip_address = ip.map(String::from).or_else(|| session.ip_address.clone());
        }

        let mut session_ref = SessionRef::new(session.session_id.clone());
        session_ref.ip_address = environment.ip_address.clone();
        session_ref.user_agent = session.user_agent.clone();

        let mut ctx = AccessContext::new(
            Actor::new(session.user_id.clone(), session.role.clone())
                .with_permissions(session.permissions.clone()),
            request.resource,
            request.action,
        )
        .with_session(session_ref)
        .with_environment(environment);

        if let Some(resource_id) = request.resource_id {
            ctx = ctx.with_resource_id(resource_id);
        }
        if let Some(data) = request.data {
            ctx = ctx.with_data(data);
        }
        ctx
    }

    /// Audits one pipeline outcome; payload masking happens inside the
    /// trail.
    fn record(&self, ctx: &AccessContext, outcome: AuditOutcome, details: Value) {
        let mut draft = AuditDraft::new(
            AuditEventType::Access,
            ctx.actor.id.clone(),
            format!("{} {}", ctx.action, ctx.resource),
            outcome,
        )
        .with_resource(ctx.resource.clone())
        .with_details(details);

        if ctx.resource == "Patient" {
            if let Some(patient_id) = &ctx.resource_id {
                draft = draft.with_patient_id(patient_id.clone());
            }
        }
        if let Some(ip) = &ctx.environment.ip_address {
            draft = draft.with_ip_address(ip.clone());
        }

        self.audit().log_event(draft);
    }
}
