//! Session manager configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the session manager.
///
/// Durations are minutes: healthcare session policy is written in minutes
/// and hours, never sub-second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Absolute session lifetime from creation (minutes).
    pub max_duration: u64,

    /// Maximum allowed gap between activities before forced expiry (minutes).
    pub idle_timeout: u64,

    /// Maximum concurrently active sessions per user. Creating one more
    /// evicts the user's oldest active session.
    pub max_concurrent_sessions: usize,

    /// When enabled, a session bound to an ip address is terminated if a
    /// request for it arrives from a different address.
    pub secure_transport: bool,

    /// Length of generated session tokens.
    pub session_token_length: usize,

    /// Renewal threshold (minutes): renewing earlier than this before
    /// expiry is a no-op.
    pub renew_before_expiry: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_duration: 480, // 8 hours
            idle_timeout: 30,
            max_concurrent_sessions: 3,
            secure_transport: true,
            session_token_length: 64,
            renew_before_expiry: 60,
        }
    }
}

impl SessionConfig {
    pub fn max_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.max_duration as i64)
    }

    pub fn idle_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.idle_timeout as i64)
    }

    pub fn renew_before_expiry(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.renew_before_expiry as i64)
    }
}
