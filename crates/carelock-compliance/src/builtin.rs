//! Builtin HIPAA rule catalog.
//!
//! The engine judges "is this field PHI" only through the injected
//! [`PhiFieldLookup`]; it never reaches into the masking engine's store.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;

use carelock_types::AccessContext;

use crate::rule::{RuleOutcome, SafeguardCategory, Severity, ValidationRule};

/// Answers whether a field name is registered as PHI.
pub trait PhiFieldLookup: Send + Sync {
    fn is_phi_field(&self, field: &str) -> bool;
}

/// Lookup that knows no PHI fields. Disables the field-coverage rule's
/// bite; deployments wire the masking registry in instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPhiFields;

impl PhiFieldLookup for NoPhiFields {
    fn is_phi_field(&self, _field: &str) -> bool {
        false
    }
}

impl<F> PhiFieldLookup for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_phi_field(&self, field: &str) -> bool {
        self(field)
    }
}

static SSN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("static regex"));
static NATIONAL_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{10}\b").expect("static regex"));
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[\w.%+-]+@[\w.-]+\.[A-Za-z]{2,}\b").expect("static regex"));

/// The default HIPAA safeguard rules.
pub fn builtin_rules(phi: Arc<dyn PhiFieldLookup>) -> Vec<ValidationRule> {
    vec![
        // Administrative safeguards
        ValidationRule::new(
            "admin_001",
            "Unique User Identification",
            SafeguardCategory::Administrative,
            Severity::Critical,
            |ctx| {
                if ctx.actor.id.as_str().is_empty() {
                    Ok(RuleOutcome::fail("User ID is required for all operations")
                        .with_recommendation(
                            "Ensure all users have unique identifiers before system access",
                        ))
                } else {
                    Ok(RuleOutcome::pass("User identification verified"))
                }
            },
        )
        .with_description("Each user must have a unique identifier"),
        ValidationRule::new(
            "admin_002",
            "Role-Based Access Control",
            SafeguardCategory::Administrative,
            Severity::High,
            |ctx| {
                if ctx.actor.role.is_empty() || ctx.actor.permissions.is_empty() {
                    Ok(RuleOutcome::fail("User role and permissions must be defined")
                        .with_recommendation(
                            "Assign appropriate roles and permissions to all users",
                        ))
                } else {
                    Ok(RuleOutcome::pass("Role-based access control verified"))
                }
            },
        )
        .with_description("Users must have defined roles with appropriate permissions"),
        ValidationRule::new(
            "admin_003",
            "Minimum Necessary Standard",
            SafeguardCategory::Administrative,
            Severity::Medium,
            |ctx| {
                if ctx.action == carelock_types::Action::Export
                    && !ctx.actor.permissions.iter().any(|p| p == "export" || p == "*")
                {
                    Ok(RuleOutcome::fail("User lacks permission for data export")
                        .with_recommendation("Grant appropriate export permissions or deny access"))
                } else {
                    Ok(RuleOutcome::pass("Minimum necessary access verified"))
                }
            },
        )
        .with_description("Access should be limited to minimum necessary information"),
        // Physical safeguards
        ValidationRule::new(
            "phys_001",
            "Workstation Security",
            SafeguardCategory::Physical,
            Severity::Medium,
            |_ctx| {
                // Workstation attestation arrives out of band; nothing to
                // check in-process yet.
                Ok(RuleOutcome::pass("Workstation security assumed compliant"))
            },
        )
        .with_description("Access from secure workstations only")
        .optional(),
        // Technical safeguards
        ValidationRule::new(
            "tech_001",
            "Encryption in Transit",
            SafeguardCategory::Technical,
            Severity::Critical,
            |ctx| {
                let user_agent = ctx
                    .session
                    .as_ref()
                    .and_then(|session| session.user_agent.as_deref())
                    .unwrap_or("");
                if user_agent.contains("http:") && !user_agent.contains("localhost") {
                    Ok(RuleOutcome::fail("Insecure connection detected")
                        .with_recommendation("Use HTTPS for all data transmission"))
                } else {
                    Ok(RuleOutcome::pass("Secure transmission verified"))
                }
            },
        )
        .with_description("Data must be encrypted during transmission"),
        ValidationRule::new(
            "tech_002",
            "Audit Logging",
            SafeguardCategory::Technical,
            Severity::Critical,
            |ctx| {
                if ctx.environment.audit_logged {
                    Ok(RuleOutcome::pass("Audit logging verified"))
                } else {
                    Ok(RuleOutcome::fail("Operation not properly audited")
                        .with_recommendation("Ensure all PHI access is logged for audit purposes"))
                }
            },
        )
        .with_description("All PHI access must be logged"),
        ValidationRule::new(
            "tech_003",
            "Session Timeout",
            SafeguardCategory::Technical,
            Severity::Medium,
            |_ctx| {
                // Timeout enforcement lives in the session manager; the
                // rule records that the safeguard is configured.
                Ok(RuleOutcome::pass("Session timeout configured"))
            },
        )
        .with_description("Sessions must timeout after period of inactivity"),
        ValidationRule::new(
            "tech_004",
            "PHI Data Masking",
            SafeguardCategory::Technical,
            Severity::High,
            |ctx| {
                if let Some(data) = &ctx.data {
                    let serialized = data.to_string();
                    let exposed = SSN_PATTERN.is_match(&serialized)
                        || NATIONAL_ID_PATTERN.is_match(&serialized)
                        || EMAIL_PATTERN.is_match(&serialized);
                    if exposed {
                        return Ok(RuleOutcome::fail(
                            "Potentially unmasked PHI detected in data",
                        )
                        .with_recommendation(
                            "Ensure all PHI is properly masked before processing",
                        ));
                    }
                }
                Ok(RuleOutcome::pass("PHI masking verified"))
            },
        )
        .with_description("PHI must be masked in logs and non-production environments"),
        ValidationRule::new(
            "tech_005",
            "Access Control Verification",
            SafeguardCategory::Technical,
            Severity::Critical,
            |ctx| {
                let required = format!("{}:{}", ctx.resource, ctx.action);
                let wildcard = format!("{}:*", ctx.resource);
                let granted = ctx
                    .actor
                    .permissions
                    .iter()
                    .any(|p| *p == required || *p == wildcard || p == "*");

                if granted {
                    Ok(RuleOutcome::pass("Access control verified"))
                } else {
                    Ok(RuleOutcome::fail(format!(
                        "User lacks permission for {} on {}",
                        ctx.action, ctx.resource
                    ))
                    .with_recommendation(format!("Grant {required} permission to user")))
                }
            },
        )
        .with_description("User must have appropriate permissions for the requested operation"),
        ValidationRule::new(
            "tech_006",
            "PHI Field Masking Coverage",
            SafeguardCategory::Technical,
            Severity::High,
            move |ctx| {
                let exposed = unmasked_phi_fields(ctx, phi.as_ref());
                if exposed.is_empty() {
                    Ok(RuleOutcome::pass("Registered PHI fields are masked"))
                } else {
                    Ok(RuleOutcome::fail(format!(
                        "Unmasked PHI fields in payload: {}",
                        exposed.join(", ")
                    ))
                    .with_recommendation("Pass payloads through the masking engine before use"))
                }
            },
        )
        .with_description("Fields registered as PHI must not appear unmasked in payloads"),
    ]
}

/// Top-level payload fields that the lookup flags as PHI but whose values
/// do not look masked.
fn unmasked_phi_fields(ctx: &AccessContext, phi: &dyn PhiFieldLookup) -> Vec<String> {
    let Some(Value::Object(map)) = &ctx.data else {
        return Vec::new();
    };

    map.iter()
        .filter(|(key, _)| phi.is_phi_field(key))
        .filter(|(_, value)| match value {
            Value::String(s) => {
                !s.contains('*') && !s.starts_with("HASH_") && !s.starts_with("TOKEN_")
            }
            Value::Number(_) => true,
            _ => false,
        })
        .map(|(key, _)| key.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ComplianceEngine;
    use carelock_types::{Action, Actor, Environment, SessionRef};
    use serde_json::json;

    fn phi_none() -> Arc<dyn PhiFieldLookup> {
        Arc::new(NoPhiFields)
    }

    /// A context that satisfies every builtin rule.
    fn compliant_ctx() -> AccessContext {
        AccessContext::new(
            Actor::new("u-1", "nurse").with_permissions(vec!["Patient:read".to_string()]),
            "Patient",
            Action::Read,
        )
        .with_session(
            SessionRef::new("sess_1")
                .with_ip_address("10.0.0.1")
                .with_user_agent("Mozilla/5.0 (https://emr.internal)"),
        )
        .with_data(json!({"note": "vitals stable"}))
        .with_environment({
            let mut env = Environment::default();
            env.audit_logged = true;
            env
        })
    }

    #[test]
    fn test_compliant_context_passes_everything() {
        let engine = ComplianceEngine::with_builtin_rules(phi_none());
        let report = engine.validate_compliance(&compliant_ctx());

        assert_eq!(report.overall_compliance, 100, "failures: {:?}", report.rule_results);
        assert_eq!(report.total_rules, 10);
        assert_eq!(report.critical_failures, 0);
    }

    #[test]
    fn test_missing_user_id_fails_admin_001() {
        let engine = ComplianceEngine::with_builtin_rules(phi_none());
        let mut ctx = compliant_ctx();
        ctx.actor.id = carelock_types::UserId::new("");

        let report = engine.validate_compliance(&ctx);
        let result = report
            .rule_results
            .iter()
            .find(|r| r.rule_id == "admin_001")
            .unwrap();
        assert!(!result.passed);
        assert_eq!(report.critical_failures, 1);
    }

    #[test]
    fn test_export_without_permission_fails_admin_003() {
        let engine = ComplianceEngine::with_builtin_rules(phi_none());
        let mut ctx = compliant_ctx();
        ctx.action = Action::Export;

        let report = engine.validate_compliance(&ctx);
        let result = report
            .rule_results
            .iter()
            .find(|r| r.rule_id == "admin_003")
            .unwrap();
        assert!(!result.passed);
    }

    #[test]
    fn test_insecure_transport_fails_tech_001() {
        let engine = ComplianceEngine::with_builtin_rules(phi_none());
        let mut ctx = compliant_ctx();
        ctx.session = Some(
            SessionRef::new("sess_1").with_user_agent("LegacyClient/1.0 (http://emr.internal)"),
        );

        let report = engine.validate_compliance(&ctx);
        let result = report
            .rule_results
            .iter()
            .find(|r| r.rule_id == "tech_001")
            .unwrap();
        assert!(!result.passed);
    }

    #[test]
    fn test_unaudited_operation_fails_tech_002() {
        let engine = ComplianceEngine::with_builtin_rules(phi_none());
        let mut ctx = compliant_ctx();
        ctx.environment.audit_logged = false;

        let quick = engine.quick_validation(&ctx);
        assert!(!quick.passed);
        assert!(quick.failed_rules.contains(&"tech_002".to_string()));
    }

    #[test]
    fn test_raw_ssn_in_payload_fails_tech_004() {
        let engine = ComplianceEngine::with_builtin_rules(phi_none());
        let ctx = compliant_ctx().with_data(json!({"note": "SSN 123-45-6789 on file"}));

        let report = engine.validate_compliance(&ctx);
        let result = report
            .rule_results
            .iter()
            .find(|r| r.rule_id == "tech_004")
            .unwrap();
        assert!(!result.passed);
    }

    #[test]
    fn test_missing_permission_fails_tech_005() {
        let engine = ComplianceEngine::with_builtin_rules(phi_none());
        let mut ctx = compliant_ctx();
        ctx.actor.permissions = vec!["Observation:read".to_string()];

        let quick = engine.quick_validation(&ctx);
        assert!(quick.failed_rules.contains(&"tech_005".to_string()));
    }

    #[test]
    fn test_wildcard_permissions_satisfy_tech_005() {
        let engine = ComplianceEngine::with_builtin_rules(phi_none());

        for grant in ["Patient:read", "Patient:*", "*"] {
            let mut ctx = compliant_ctx();
            ctx.actor.permissions = vec![grant.to_string()];
            let quick = engine.quick_validation(&ctx);
            assert!(quick.passed, "grant {grant} should satisfy tech_005");
        }
    }

    #[test]
    fn test_unmasked_phi_field_fails_tech_006() {
        let lookup: Arc<dyn PhiFieldLookup> = Arc::new(|field: &str| field == "ssn");
        let engine = ComplianceEngine::with_builtin_rules(lookup);

        // Digits only, so the tech_004 pattern scan stays quiet; only the
        // field-coverage rule should fire.
        let ctx = compliant_ctx().with_data(json!({"ssn": "123456789"}));
        let report = engine.validate_compliance(&ctx);
        let result = report
            .rule_results
            .iter()
            .find(|r| r.rule_id == "tech_006")
            .unwrap();
        assert!(!result.passed);
        assert!(result.message.contains("ssn"));
    }

    #[test]
    fn test_masked_phi_field_passes_tech_006() {
        let lookup: Arc<dyn PhiFieldLookup> = Arc::new(|field: &str| field == "ssn");
        let engine = ComplianceEngine::with_builtin_rules(lookup);

        let ctx = compliant_ctx().with_data(json!({"ssn": "***-**-6789"}));
        let report = engine.validate_compliance(&ctx);
        let result = report
            .rule_results
            .iter()
            .find(|r| r.rule_id == "tech_006")
            .unwrap();
        assert!(result.passed);
    }
}
