//! Session records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{self, Display};

use carelock_types::{SessionId, UserId};

/// Why a session left the active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Explicit termination (logout, admin action).
    Manual,
    /// Absolute lifetime exceeded.
    Expired,
    /// Idle gap exceeded the idle timeout.
    IdleTimeout,
    /// Request arrived from a different ip than the session was bound to.
    IpMismatch,
    /// Evicted to make room for a newer session.
    ConcurrentLimitExceeded,
    /// Bulk termination of a user's sessions.
    UserSessionsTerminated,
    /// Manager shutdown.
    SystemShutdown,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::Manual => "manual",
            TerminationReason::Expired => "expired",
            TerminationReason::IdleTimeout => "idle_timeout",
            TerminationReason::IpMismatch => "ip_mismatch",
            TerminationReason::ConcurrentLimitExceeded => "concurrent_limit_exceeded",
            TerminationReason::UserSessionsTerminated => "user_sessions_terminated",
            TerminationReason::SystemShutdown => "system_shutdown",
        }
    }
}

impl Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub role: String,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<TerminationReason>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl SessionData {
    /// Returns whether the absolute lifetime has elapsed.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Returns whether the idle gap exceeds `idle_timeout`.
    pub fn is_idle_at(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
        now - self.last_activity > idle_timeout
    }

    /// A session counts as live only while active and within both timeouts.
    pub fn is_valid_at(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
        self.is_active && !self.is_expired_at(now) && !self.is_idle_at(now, idle_timeout)
    }

    /// Metadata-free projection for listings and admin surfaces.
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
            role: self.role.clone(),
            permissions: self.permissions.clone(),
            created_at: self.created_at,
            last_activity: self.last_activity,
            expires_at: self.expires_at,
            ip_address: self.ip_address.clone(),
            user_agent: self.user_agent.clone(),
            is_active: self.is_active,
        }
    }
}

/// Session projection without the opaque metadata bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub role: String,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(now: DateTime<Utc>) -> SessionData {
        SessionData {
            session_id: SessionId::new("sess_1"),
            user_id: UserId::new("u-1"),
            role: "nurse".to_string(),
            permissions: vec![],
            created_at: now,
            last_activity: now,
            expires_at: now + Duration::minutes(480),
            ip_address: None,
            user_agent: None,
            is_active: true,
            terminated_at: None,
            termination_reason: None,
            metadata: Map::new(),
        }
    }

    #[test]
    fn test_validity_windows() {
        let now = DateTime::UNIX_EPOCH;
        let s = session(now);
        let idle = Duration::minutes(30);

        assert!(s.is_valid_at(now, idle));
        assert!(s.is_valid_at(now + Duration::minutes(30), idle));
        assert!(!s.is_valid_at(now + Duration::minutes(31), idle));
        assert!(!s.is_valid_at(now + Duration::minutes(481), idle));
    }

    #[test]
    fn test_inactive_never_valid() {
        let now = DateTime::UNIX_EPOCH;
        let mut s = session(now);
        s.is_active = false;
        assert!(!s.is_valid_at(now, Duration::minutes(30)));
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(TerminationReason::IdleTimeout.to_string(), "idle_timeout");
        assert_eq!(
            TerminationReason::ConcurrentLimitExceeded.to_string(),
            "concurrent_limit_exceeded"
        );
    }
}
