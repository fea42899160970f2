//! Role, permission, and restriction types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use carelock_types::{Action, RoleId};

use crate::Condition;

/// Permission granted by a role: a resource pattern, the actions it
/// covers, and conditions that must all hold for the permission to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    /// Resource name, or `*` for every resource.
    pub resource: String,

    /// Actions this permission covers.
    pub actions: Vec<Action>,

    /// Conditions that must ALL evaluate true against the context.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl Permission {
    pub fn new(resource: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            resource: resource.into(),
            actions,
            conditions: Vec::new(),
        }
    }

    /// Every action on every resource.
    pub fn unrestricted() -> Self {
        Self::new(
            "*",
            vec![
                Action::Create,
                Action::Read,
                Action::Update,
                Action::Delete,
                Action::Search,
            ],
        )
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Returns whether this permission covers the resource/action pair.
    /// Conditions are evaluated separately by the evaluator.
    pub fn matches(&self, resource: &str, action: Action) -> bool {
        (self.resource == "*" || self.resource == resource) && self.actions.contains(&action)
    }
}

/// Rule tag for a role-level restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionKind {
    /// Clinician may only touch patients under their care.
    OwnPatientsOnly,
    /// Staff may only touch patients assigned to them.
    AssignedPatientsOnly,
    /// Payload must not carry clinical data.
    NoClinicalData,
    /// Only read/search actions permitted.
    ReadOnly,
    /// Acting user may only touch their own records.
    OwnDataOnly,
}

impl RestrictionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestrictionKind::OwnPatientsOnly => "own_patients_only",
            RestrictionKind::AssignedPatientsOnly => "assigned_patients_only",
            RestrictionKind::NoClinicalData => "no_clinical_data",
            RestrictionKind::ReadOnly => "read_only",
            RestrictionKind::OwnDataOnly => "own_data_only",
        }
    }
}

/// Role-level veto checked after permission matching succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restriction {
    pub kind: RestrictionKind,
    pub description: String,
}

impl Restriction {
    pub fn new(kind: RestrictionKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }
}

/// A role: named bundle of permissions and restrictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: String,
    pub permissions: Vec<Permission>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restrictions: Vec<Restriction>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Role {
    /// Creates an active role with no permissions yet. Timestamps are
    /// stamped by the evaluator when the role is registered.
    pub fn new(
        id: impl Into<RoleId>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            permissions: Vec::new(),
            restrictions: Vec::new(),
            is_active: true,
            created_at: DateTime::UNIX_EPOCH,
            updated_at: DateTime::UNIX_EPOCH,
            metadata: Map::new(),
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    pub fn with_restriction(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Partial update applied to an existing role. `None` fields are left
/// untouched; `updated_at` is always refreshed.
#[derive(Debug, Clone, Default)]
pub struct RoleUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<Permission>>,
    pub restrictions: Option<Vec<Restriction>>,
    pub is_active: Option<bool>,
    pub metadata: Option<Map<String, Value>>,
}

impl RoleUpdate {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn permissions(mut self, permissions: Vec<Permission>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn restrictions(mut self, restrictions: Vec<Restriction>) -> Self {
        self.restrictions = Some(restrictions);
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_matching() {
        let permission = Permission::new("Patient", vec![Action::Read, Action::Search]);

        assert!(permission.matches("Patient", Action::Read));
        assert!(permission.matches("Patient", Action::Search));
        assert!(!permission.matches("Patient", Action::Delete));
        assert!(!permission.matches("Observation", Action::Read));
    }

    #[test]
    fn test_wildcard_permission_matches_any_resource() {
        let permission = Permission::unrestricted();

        assert!(permission.matches("Patient", Action::Delete));
        assert!(permission.matches("Appointment", Action::Create));
        assert!(!permission.matches("Patient", Action::Export));
    }

    #[test]
    fn test_restriction_kind_wire_names() {
        let json = serde_json::to_string(&RestrictionKind::OwnPatientsOnly).unwrap();
        assert_eq!(json, "\"own_patients_only\"");
        assert_eq!(RestrictionKind::ReadOnly.as_str(), "read_only");
    }

    proptest::proptest! {
        #[test]
        fn prop_wildcard_covers_every_resource(resource in "[A-Za-z]{1,24}") {
            let permission = Permission::unrestricted();
            for action in [
                Action::Create,
                Action::Read,
                Action::Update,
                Action::Delete,
                Action::Search,
            ] {
                proptest::prop_assert!(permission.matches(&resource, action));
            }
            // Export is never part of the RBAC grant vocabulary.
            proptest::prop_assert!(!permission.matches(&resource, Action::Export));
        }
    }

    #[test]
    fn test_role_builder() {
        let role = Role::new("auditor", "Compliance Auditor", "Read-only audit access")
            .with_permission(Permission::new("*", vec![Action::Read, Action::Search]))
            .with_restriction(Restriction::new(
                RestrictionKind::ReadOnly,
                "Read-only access for audit purposes",
            ));

        assert!(role.is_active);
        assert_eq!(role.permissions.len(), 1);
        assert_eq!(role.restrictions[0].kind, RestrictionKind::ReadOnly);
    }
}
