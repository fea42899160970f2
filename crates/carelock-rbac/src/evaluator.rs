//! The access evaluator: permission matching and restriction checks.

use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, info};

use carelock_types::{AccessContext, Clock, RoleId, SystemClock, UserId};

use crate::store::{RoleStore, User, UserStore};
use crate::{
    CareAssignments, DenyAll, Permission, RbacError, Restriction, RestrictionKind, Result, Role,
    RoleUpdate, default_roles,
};

/// Terms whose presence in a payload marks it as clinical data.
const CLINICAL_TERMS: [&str; 8] = [
    "diagnosis",
    "procedure",
    "medication",
    "allergy",
    "condition",
    "observation",
    "labresult",
    "vitalsigns",
];

/// Outcome of an access check. Denial is a value, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessDecision {
    pub granted: bool,
    pub reason: String,
    /// Permissions that matched the resource/action pair, whether or not
    /// their conditions held.
    pub matched_permissions: Vec<Permission>,
    /// Restrictions collected from every scanned role, whether or not one
    /// of them ultimately blocked access.
    pub applied_restrictions: Vec<Restriction>,
}

impl AccessDecision {
    fn denied(reason: impl Into<String>) -> Self {
        Self {
            granted: false,
            reason: reason.into(),
            matched_permissions: Vec::new(),
            applied_restrictions: Vec::new(),
        }
    }
}

/// Effective permission summary for a user: the union across all active
/// assigned roles.
#[derive(Debug, Clone, Default)]
pub struct EffectivePermissions {
    pub roles: Vec<RoleId>,
    pub permissions: Vec<Permission>,
    pub restrictions: Vec<Restriction>,
}

/// RBAC registry statistics.
#[derive(Debug, Clone, Default)]
pub struct RbacStats {
    pub total_roles: usize,
    pub active_roles: usize,
    pub total_users: usize,
    pub active_users: usize,
    pub total_permissions: usize,
    pub total_restrictions: usize,
}

/// Owns the role and user stores and evaluates access requests.
pub struct AccessEvaluator {
    roles: RwLock<RoleStore>,
    users: RwLock<UserStore>,
    assignments: Arc<dyn CareAssignments>,
    clock: Arc<dyn Clock>,
}

impl AccessEvaluator {
    /// Creates an evaluator with empty stores. Care-scoped restrictions
    /// deny until a real [`CareAssignments`] roster is injected.
    pub fn new() -> Self {
        Self {
            roles: RwLock::new(RoleStore::new()),
            users: RwLock::new(UserStore::new()),
            assignments: Arc::new(DenyAll),
            clock: Arc::new(SystemClock),
        }
    }

    /// Creates an evaluator preloaded with the default healthcare roles.
    pub fn with_default_roles() -> Self {
        let evaluator = Self::new();
        {
            let now = evaluator.clock.now();
            let mut roles = evaluator.roles.write().expect("role store lock poisoned");
            for mut role in default_roles() {
                role.created_at = now;
                role.updated_at = now;
                roles.insert(role);
            }
            info!(role_count = roles.len(), "default RBAC roles initialized");
        }
        evaluator
    }

    /// Injects the care-assignment roster consulted by the
    /// `own_patients_only`/`assigned_patients_only` restrictions.
    pub fn care_assignments(mut self, assignments: Arc<dyn CareAssignments>) -> Self {
        self.assignments = assignments;
        self
    }

    /// Injects the clock used for role timestamps.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // -----------------------------------------------------------------------
    // Role administration
    // -----------------------------------------------------------------------

    /// Registers a new role. Fails on a duplicate id.
    pub fn create_role(&self, mut role: Role) -> Result<Role> {
        let mut roles = self.roles.write().expect("role store lock poisoned");
        if roles.contains(&role.id) {
            return Err(RbacError::RoleExists(role.id));
        }

        let now = self.clock.now();
        role.created_at = now;
        role.updated_at = now;

        info!(
            role_id = %role.id,
            role_name = %role.name,
            permission_count = role.permissions.len(),
            "role created"
        );
        roles.insert(role.clone());
        Ok(role)
    }

    /// Applies a partial update, refreshing `updated_at`. Returns the
    /// updated role, or `None` for an unknown id.
    pub fn update_role(&self, role_id: &RoleId, update: RoleUpdate) -> Option<Role> {
        let mut roles = self.roles.write().expect("role store lock poisoned");
        let role = roles.get_mut(role_id)?;

        if let Some(name) = update.name {
            role.name = name;
        }
        if let Some(description) = update.description {
            role.description = description;
        }
        if let Some(permissions) = update.permissions {
            role.permissions = permissions;
        }
        if let Some(restrictions) = update.restrictions {
            role.restrictions = restrictions;
        }
        if let Some(is_active) = update.is_active {
            role.is_active = is_active;
        }
        if let Some(metadata) = update.metadata {
            role.metadata = metadata;
        }
        role.updated_at = self.clock.now();

        info!(role_id = %role_id, "role updated");
        Some(role.clone())
    }

    /// Deletes a role and detaches it from every user. Returns whether the
    /// role existed.
    pub fn delete_role(&self, role_id: &RoleId) -> bool {
        let mut roles = self.roles.write().expect("role store lock poisoned");
        if roles.remove(role_id).is_none() {
            return false;
        }
        drop(roles);

        let mut users = self.users.write().expect("user store lock poisoned");
        for user in users.iter_mut() {
            user.roles.retain(|id| id != role_id);
        }

        info!(role_id = %role_id, "role deleted");
        true
    }

    pub fn get_role(&self, role_id: &RoleId) -> Option<Role> {
        self.roles
            .read()
            .expect("role store lock poisoned")
            .get(role_id)
            .cloned()
    }

    pub fn list_roles(&self, active_only: bool) -> Vec<Role> {
        self.roles
            .read()
            .expect("role store lock poisoned")
            .iter()
            .filter(|role| !active_only || role.is_active)
            .cloned()
            .collect()
    }

    // -----------------------------------------------------------------------
    // User administration
    // -----------------------------------------------------------------------

    /// Creates or replaces a user record. Every referenced role id must be
    /// registered.
    pub fn set_user(&self, user: User) -> Result<User> {
        {
            let roles = self.roles.read().expect("role store lock poisoned");
            for role_id in &user.roles {
                if !roles.contains(role_id) {
                    return Err(RbacError::RoleNotFound(role_id.clone()));
                }
            }
        }

        info!(
            user_id = %user.id,
            username = %user.username,
            role_count = user.roles.len(),
            "user set"
        );
        self.users
            .write()
            .expect("user store lock poisoned")
            .insert(user.clone());
        Ok(user)
    }

    pub fn get_user(&self, user_id: &UserId) -> Option<User> {
        self.users
            .read()
            .expect("user store lock poisoned")
            .get(user_id)
            .cloned()
    }

    pub fn remove_user(&self, user_id: &UserId) -> bool {
        let removed = self
            .users
            .write()
            .expect("user store lock poisoned")
            .remove(user_id)
            .is_some();
        if removed {
            info!(user_id = %user_id, "user removed");
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    /// Decides whether the context's acting user may perform the requested
    /// action. Fails closed on unknown/inactive users.
    pub fn check_access(&self, ctx: &AccessContext) -> AccessDecision {
        let users = self.users.read().expect("user store lock poisoned");
        let user = match users.get(&ctx.actor.id) {
            Some(user) if user.is_active => user,
            _ => return AccessDecision::denied("user not found or inactive"),
        };

        let roles = self.roles.read().expect("role store lock poisoned");
        let mut matched_permissions = Vec::new();
        let mut applied_restrictions = Vec::new();
        let mut has_permission = false;

        for role_id in &user.roles {
            let Some(role) = roles.get(role_id).filter(|role| role.is_active) else {
                continue;
            };

            for permission in &role.permissions {
                if permission.matches(&ctx.resource, ctx.action) {
                    matched_permissions.push(permission.clone());

                    if permission.conditions.is_empty()
                        || permission.conditions.iter().all(|c| c.evaluate(ctx))
                    {
                        has_permission = true;
                    }
                }
            }

            applied_restrictions.extend(role.restrictions.iter().cloned());
        }

        if !has_permission {
            return AccessDecision {
                granted: false,
                reason: "no matching permissions found".to_string(),
                matched_permissions,
                applied_restrictions,
            };
        }

        if let Some(violation) = self.check_restrictions(&applied_restrictions, ctx) {
            return AccessDecision {
                granted: false,
                reason: format!("restriction violation: {violation}"),
                matched_permissions,
                applied_restrictions,
            };
        }

        debug!(
            user_id = %ctx.actor.id,
            resource = %ctx.resource,
            action = %ctx.action,
            permission_count = matched_permissions.len(),
            restriction_count = applied_restrictions.len(),
            "access granted"
        );

        AccessDecision {
            granted: true,
            reason: "access granted based on role permissions".to_string(),
            matched_permissions,
            applied_restrictions,
        }
    }

    /// Union of permissions and restrictions across the user's active
    /// roles. Empty for unknown users.
    pub fn user_permissions(&self, user_id: &UserId) -> EffectivePermissions {
        let users = self.users.read().expect("user store lock poisoned");
        let Some(user) = users.get(user_id) else {
            return EffectivePermissions::default();
        };

        let roles = self.roles.read().expect("role store lock poisoned");
        let mut effective = EffectivePermissions {
            roles: user.roles.clone(),
            ..EffectivePermissions::default()
        };

        for role_id in &user.roles {
            if let Some(role) = roles.get(role_id).filter(|role| role.is_active) {
                effective.permissions.extend(role.permissions.iter().cloned());
                effective
                    .restrictions
                    .extend(role.restrictions.iter().cloned());
            }
        }
        effective
    }

    /// Registry statistics.
    pub fn stats(&self) -> RbacStats {
        let roles = self.roles.read().expect("role store lock poisoned");
        let users = self.users.read().expect("user store lock poisoned");

        let mut stats = RbacStats {
            total_roles: roles.len(),
            total_users: users.len(),
            active_users: users.iter().filter(|u| u.is_active).count(),
            ..RbacStats::default()
        };

        for role in roles.iter() {
            if role.is_active {
                stats.active_roles += 1;
            }
            stats.total_permissions += role.permissions.len();
            stats.total_restrictions += role.restrictions.len();
        }
        stats
    }

    // -----------------------------------------------------------------------
    // Restrictions
    // -----------------------------------------------------------------------

    /// Returns the first violation message, if any restriction blocks.
    fn check_restrictions(
        &self,
        restrictions: &[Restriction],
        ctx: &AccessContext,
    ) -> Option<String> {
        restrictions
            .iter()
            .find_map(|restriction| self.evaluate_restriction(restriction, ctx))
    }

    fn evaluate_restriction(
        &self,
        restriction: &Restriction,
        ctx: &AccessContext,
    ) -> Option<String> {
        match restriction.kind {
            RestrictionKind::OwnPatientsOnly | RestrictionKind::AssignedPatientsOnly => {
                // Without an identified patient there is nothing to scope;
                // the permission layer has already bounded the request.
                let patient = patient_in_context(ctx)?;
                if self.assignments.is_assigned(&ctx.actor.id, &patient) {
                    None
                } else if restriction.kind == RestrictionKind::OwnPatientsOnly {
                    Some("can only access patients under their care".to_string())
                } else {
                    Some("can only access assigned patients".to_string())
                }
            }
            RestrictionKind::NoClinicalData => {
                if ctx.data.as_ref().is_some_and(contains_clinical_data) {
                    Some("access to clinical data is restricted".to_string())
                } else {
                    None
                }
            }
            RestrictionKind::ReadOnly => {
                if ctx.action.is_read_only() {
                    None
                } else {
                    Some("only read access is permitted".to_string())
                }
            }
            RestrictionKind::OwnDataOnly => {
                if ctx.resource_id.as_deref() == Some(ctx.actor.id.as_str())
                    || is_self_reference(ctx)
                {
                    None
                } else {
                    Some("can only access own health information".to_string())
                }
            }
        }
    }
}

impl Default for AccessEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifies the patient a context is about, if any.
fn patient_in_context(ctx: &AccessContext) -> Option<String> {
    if ctx.resource == "Patient" {
        if let Some(id) = &ctx.resource_id {
            return Some(id.clone());
        }
    }
    if let Some(Value::String(patient_id)) = ctx.lookup("patientId") {
        return Some(patient_id);
    }
    if let Some(Value::String(reference)) = ctx.lookup("subject.reference") {
        let id = reference.strip_prefix("Patient/").unwrap_or(&reference);
        return Some(id.to_string());
    }
    None
}

/// Case-insensitive substring scan of top-level data keys against the
/// clinical lexicon.
fn contains_clinical_data(data: &Value) -> bool {
    let Value::Object(map) = data else {
        return false;
    };
    map.keys().any(|key| {
        let key = key.to_lowercase();
        CLINICAL_TERMS.iter().any(|term| key.contains(term))
    })
}

/// Whether the payload's subject reference resolves to the acting user.
fn is_self_reference(ctx: &AccessContext) -> bool {
    let Some(Value::String(reference)) = ctx.lookup("subject.reference") else {
        return false;
    };
    reference == format!("Patient/{}", ctx.actor.id) || reference == *ctx.actor.id.as_str()
}
