//! # carelock-rbac: Role-Based Access Control
//!
//! Decides whether a user may perform an action on a resource:
//!
//! - **Roles** carry ordered permissions and optional restrictions
//! - **Permissions** match on resource (exact or `*`) and action, gated by
//!   conditions evaluated against the access context
//! - **Restrictions** are role-level vetoes checked after a provisional
//!   grant; any blocking restriction wins
//!
//! Evaluation fails closed: an unknown or inactive user is denied, never an
//! error. Denial is a structured [`AccessDecision`] with a human-readable
//! reason, because denial is an expected, frequent, auditable outcome.
//!
//! ## Example
//!
//! ```
//! use carelock_rbac::{AccessEvaluator, User};
//! use carelock_types::{AccessContext, Action, Actor};
//!
//! let evaluator = AccessEvaluator::with_default_roles();
//! evaluator
//!     .set_user(User::new("n-7", "nurse.okafor").with_role("nurse"))
//!     .unwrap();
//!
//! let ctx = AccessContext::new(Actor::new("n-7", "nurse"), "Patient", Action::Read);
//! assert!(evaluator.check_access(&ctx).granted);
//!
//! let ctx = AccessContext::new(Actor::new("n-7", "nurse"), "Patient", Action::Delete);
//! let decision = evaluator.check_access(&ctx);
//! assert!(!decision.granted);
//! assert!(decision.matched_permissions.is_empty());
//! ```

mod assignments;
mod catalog;
mod condition;
mod evaluator;
mod role;
mod store;

pub use assignments::{AllowAll, CareAssignments, DenyAll, StaticAssignments};
pub use catalog::default_roles;
pub use condition::{Condition, ConditionOperator};
pub use evaluator::{AccessDecision, AccessEvaluator, EffectivePermissions, RbacStats};
pub use role::{Permission, Restriction, RestrictionKind, Role, RoleUpdate};
pub use store::{RoleStore, User, UserStore};

use carelock_types::RoleId;
use thiserror::Error;

/// Errors raised by role/user mutations.
///
/// These indicate configuration mistakes (duplicate role id, user
/// referencing an unknown role) and are raised immediately; access denial
/// is never an error.
#[derive(Debug, Error)]
pub enum RbacError {
    /// A role with this id already exists.
    #[error("role already exists: {0}")]
    RoleExists(RoleId),

    /// A user referenced a role id that is not registered.
    #[error("role not found: {0}")]
    RoleNotFound(RoleId),
}

/// Result type for RBAC mutations.
pub type Result<T> = std::result::Result<T, RbacError>;
