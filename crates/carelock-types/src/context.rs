//! Access context: the immutable input to RBAC and compliance evaluation.
//!
//! A context captures one attempted operation: who is acting (with a
//! role/permission snapshot taken at session resolution), what they are
//! doing to which resource, the structured payload involved, and the
//! environment the request arrived from.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Action, SessionId, UserId};

/// Snapshot of the acting user.
///
/// The role name and permission strings are copied out of the resolved
/// session at context-build time; the RBAC evaluator re-derives effective
/// permissions from its own role store and does not trust this snapshot.
/// Compliance rules, by contrast, evaluate the snapshot as-presented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: UserId,
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Actor {
    pub fn new(id: impl Into<UserId>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            permissions: Vec::new(),
        }
    }

    pub fn with_permissions(mut self, permissions: Vec<String>) -> Self {
        self.permissions = permissions;
        self
    }
}

/// Reference to the session the request arrived on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRef {
    pub id: SessionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl SessionRef {
    pub fn new(id: impl Into<SessionId>) -> Self {
        Self {
            id: id.into(),
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }
}

/// Environment bag attached to a request.
///
/// Well-known safeguard flags are typed; anything else rides in `extra`.
/// [`Environment::get`] presents both as one key-value view for condition
/// evaluation, keyed by the camelCase names conditions are written against.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Environment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub mfa_verified: bool,
    pub audit_logged: bool,
    pub ip_whitelisted: bool,
    pub baa_verified: bool,
    pub retention_policy_checked: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Environment {
    /// Looks up an environment entry by its wire name.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "ipAddress" => self.ip_address.clone().map(Value::String),
            "userAgent" => self.user_agent.clone().map(Value::String),
            "mfaVerified" => Some(Value::Bool(self.mfa_verified)),
            "auditLogged" => Some(Value::Bool(self.audit_logged)),
            "ipWhitelisted" => Some(Value::Bool(self.ip_whitelisted)),
            "baaVerified" => Some(Value::Bool(self.baa_verified)),
            "retentionPolicyChecked" => Some(Value::Bool(self.retention_policy_checked)),
            other => self.extra.get(other).cloned(),
        }
    }

    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// The immutable input to both RBAC and compliance evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessContext {
    pub actor: Actor,
    pub resource: String,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default)]
    pub environment: Environment,
}

impl AccessContext {
    pub fn new(actor: Actor, resource: impl Into<String>, action: Action) -> Self {
        Self {
            actor,
            resource: resource.into(),
            action,
            resource_id: None,
            session: None,
            data: None,
            environment: Environment::default(),
        }
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn with_session(mut self, session: SessionRef) -> Self {
        self.session = Some(session);
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

    /// Resolves a condition field against this context.
    ///
    /// Dotted paths descend into the data payload only; plain names check
    /// the data payload first and fall back to the environment view.
    pub fn lookup(&self, field: &str) -> Option<Value> {
        if field.contains('.') {
            return self.data.as_ref().and_then(|data| nested(data, field));
        }

        self.data
            .as_ref()
            .and_then(|data| data.get(field))
            .cloned()
            .or_else(|| self.environment.get(field))
    }
}

/// Walks a dot-separated path into a JSON value.
fn nested(value: &Value, path: &str) -> Option<Value> {
    let mut current = value;
    for key in path.split('.') {
        current = current.get(key)?;
    }
    Some(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context_with_data(data: Value) -> AccessContext {
        AccessContext::new(Actor::new("u-1", "physician"), "Patient", Action::Read)
            .with_data(data)
    }

    #[test]
    fn test_lookup_plain_field_in_data() {
        let ctx = context_with_data(json!({"accessReason": "medication_dispensing"}));
        assert_eq!(
            ctx.lookup("accessReason"),
            Some(json!("medication_dispensing"))
        );
    }

    #[test]
    fn test_lookup_dotted_path() {
        let ctx = context_with_data(json!({
            "subject": {"reference": "Patient/u-1"}
        }));
        assert_eq!(ctx.lookup("subject.reference"), Some(json!("Patient/u-1")));
        assert_eq!(ctx.lookup("subject.missing"), None);
    }

    #[test]
    fn test_lookup_falls_back_to_environment() {
        let ctx = AccessContext::new(Actor::new("u-1", "nurse"), "Patient", Action::Read)
            .with_environment(
                Environment::default()
                    .with_ip_address("10.0.0.1")
                    .with_extra("ward", json!("east")),
            );

        assert_eq!(ctx.lookup("ipAddress"), Some(json!("10.0.0.1")));
        assert_eq!(ctx.lookup("ward"), Some(json!("east")));
        assert_eq!(ctx.lookup("mfaVerified"), Some(json!(false)));
        assert_eq!(ctx.lookup("nope"), None);
    }

    #[test]
    fn test_data_shadows_environment() {
        let ctx = AccessContext::new(Actor::new("u-1", "nurse"), "Patient", Action::Read)
            .with_data(json!({"ward": "west"}))
            .with_environment(Environment::default().with_extra("ward", json!("east")));

        assert_eq!(ctx.lookup("ward"), Some(json!("west")));
    }

    #[test]
    fn test_context_json_shape() {
        let ctx = context_with_data(json!({"k": 1})).with_resource_id("p-9");
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value["action"], json!("read"));
        assert_eq!(value["resourceId"], json!("p-9"));
        assert_eq!(value["actor"]["id"], json!("u-1"));
    }
}
