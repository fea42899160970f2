//! # carelock-types: Core types for Carelock
//!
//! This crate contains shared types used across the Carelock system:
//! - Entity IDs ([`UserId`], [`RoleId`], [`SessionId`])
//! - Operations on resources ([`Action`])
//! - Evaluation input ([`AccessContext`], [`Environment`])
//! - Time injection ([`Clock`], [`SystemClock`], [`ManualClock`])
//!
//! All IDs are thin string newtypes: access-control subjects in healthcare
//! deployments are externally issued identifiers (`"dr-smith"`,
//! `"sess_9f2..."`), not dense integers.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod clock;
mod context;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{AccessContext, Actor, Environment, SessionRef};

// ============================================================================
// Entity IDs
// ============================================================================

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Unique identifier for an acting user (clinician, staff, or patient).
    UserId
}

string_id! {
    /// Unique identifier for a role in the RBAC system.
    RoleId
}

string_id! {
    /// Unique identifier for an authenticated session.
    SessionId
}

// ============================================================================
// Action
// ============================================================================

/// Operation performed on a resource.
///
/// The first five variants are the RBAC permission vocabulary; `Export` only
/// appears in compliance operation checks (bulk data leaving the system).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Search,
    Export,
}

impl Action {
    /// Returns whether this action only reads data.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Action::Read | Action::Search)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Search => "search",
            Action::Export => "export",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an [`Action`] from a string fails.
#[derive(Debug, Error)]
#[error("unknown action: {0}")]
pub struct ParseActionError(String);

impl std::str::FromStr for Action {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            "search" => Ok(Action::Search),
            "export" => Ok(Action::Export),
            other => Err(ParseActionError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_roundtrip() {
        let id = UserId::new("dr-smith");
        assert_eq!(id.as_str(), "dr-smith");
        assert_eq!(id.to_string(), "dr-smith");
        assert_eq!(UserId::from("dr-smith"), id);

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"dr-smith\"");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!("read".parse::<Action>().unwrap(), Action::Read);
        assert_eq!("export".parse::<Action>().unwrap(), Action::Export);
        assert!("browse".parse::<Action>().is_err());
    }

    #[test]
    fn test_action_read_only() {
        assert!(Action::Read.is_read_only());
        assert!(Action::Search.is_read_only());
        assert!(!Action::Create.is_read_only());
        assert!(!Action::Update.is_read_only());
        assert!(!Action::Delete.is_read_only());
        assert!(!Action::Export.is_read_only());
    }

    #[test]
    fn test_action_serde_lowercase() {
        let json = serde_json::to_string(&Action::Delete).unwrap();
        assert_eq!(json, "\"delete\"");
    }
}
