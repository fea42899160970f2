//! Role and user stores.
//!
//! Arena-style owned stores behind narrow interfaces; evaluation logic
//! never touches the maps directly, so a persistent backing could be
//! substituted without rewriting the evaluator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use carelock_types::{RoleId, UserId};

use crate::Role;

/// Identity projection consumed by the evaluator. Authentication happens
/// elsewhere; this core only sees the already-authenticated result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub roles: Vec<RoleId>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl User {
    pub fn new(id: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            roles: Vec::new(),
            is_active: true,
            metadata: Map::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<RoleId>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Roles keyed by id. Insertion order of permissions within a role is
/// preserved by the role itself; the store is a plain keyed arena.
#[derive(Debug, Default)]
pub struct RoleStore {
    roles: HashMap<RoleId, Role>,
}

impl RoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &RoleId) -> bool {
        self.roles.contains_key(id)
    }

    pub fn insert(&mut self, role: Role) {
        self.roles.insert(role.id.clone(), role);
    }

    pub fn get(&self, id: &RoleId) -> Option<&Role> {
        self.roles.get(id)
    }

    pub fn get_mut(&mut self, id: &RoleId) -> Option<&mut Role> {
        self.roles.get_mut(id)
    }

    pub fn remove(&mut self, id: &RoleId) -> Option<Role> {
        self.roles.remove(id)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }
}

/// Users keyed by id.
#[derive(Debug, Default)]
pub struct UserStore {
    users: HashMap<UserId, User>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    pub fn get(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    pub fn remove(&mut self, id: &UserId) -> Option<User> {
        self.users.remove(id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut User> {
        self.users.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_store_crud() {
        let mut store = RoleStore::new();
        assert!(store.is_empty());

        store.insert(Role::new("nurse", "Nurse", "Nursing staff"));
        assert!(store.contains(&RoleId::new("nurse")));
        assert_eq!(store.len(), 1);

        assert!(store.remove(&RoleId::new("nurse")).is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn test_user_store_crud() {
        let mut store = UserStore::new();
        store.insert(User::new("u1", "dr.chen").with_role("physician"));

        let user = store.get(&UserId::new("u1")).unwrap();
        assert_eq!(user.roles, vec![RoleId::new("physician")]);

        assert!(store.remove(&UserId::new("u1")).is_some());
        assert!(store.get(&UserId::new("u1")).is_none());
    }
}
