//! Care-assignment lookup.
//!
//! The `own_patients_only` and `assigned_patients_only` restrictions need
//! to know which patients a clinician is responsible for. That knowledge
//! lives outside this core (scheduling, care-team rosters), so the
//! evaluator consults an injected lookup instead of guessing.

use std::collections::{HashMap, HashSet};

use carelock_types::UserId;

/// Answers "is this patient under this user's care?".
pub trait CareAssignments: Send + Sync {
    fn is_assigned(&self, user: &UserId, patient_id: &str) -> bool;
}

/// Denies every assignment. The default: integrators must wire a real
/// roster before care-scoped restrictions grant anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl CareAssignments for DenyAll {
    fn is_assigned(&self, _user: &UserId, _patient_id: &str) -> bool {
        false
    }
}

/// Treats every patient as assigned. Only for deployments that scope care
/// relationships at a different layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl CareAssignments for AllowAll {
    fn is_assigned(&self, _user: &UserId, _patient_id: &str) -> bool {
        true
    }
}

/// Fixed in-memory roster, useful for tests and small deployments.
#[derive(Debug, Clone, Default)]
pub struct StaticAssignments {
    assignments: HashMap<UserId, HashSet<String>>,
}

impl StaticAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(mut self, user: impl Into<UserId>, patient_id: impl Into<String>) -> Self {
        self.assignments
            .entry(user.into())
            .or_default()
            .insert(patient_id.into());
        self
    }
}

impl CareAssignments for StaticAssignments {
    fn is_assigned(&self, user: &UserId, patient_id: &str) -> bool {
        self.assignments
            .get(user)
            .is_some_and(|patients| patients.contains(patient_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_roster() {
        let roster = StaticAssignments::new()
            .assign("dr-1", "p-100")
            .assign("dr-1", "p-101")
            .assign("dr-2", "p-200");

        assert!(roster.is_assigned(&UserId::new("dr-1"), "p-100"));
        assert!(!roster.is_assigned(&UserId::new("dr-1"), "p-200"));
        assert!(!roster.is_assigned(&UserId::new("dr-3"), "p-100"));
    }

    #[test]
    fn test_defaults() {
        assert!(!DenyAll.is_assigned(&UserId::new("u"), "p"));
        assert!(AllowAll.is_assigned(&UserId::new("u"), "p"));
    }
}
