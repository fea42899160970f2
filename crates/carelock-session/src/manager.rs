//! Session lifecycle manager.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use carelock_types::{Clock, SessionId, SystemClock, UserId};

use crate::store::SessionStore;
use crate::{SessionConfig, SessionData, SessionInfo, TerminationReason};

/// How long a terminated session stays inspectable before the sweep
/// hard-removes it from the store.
const TERMINATION_GRACE_SECS: i64 = 60;

/// Request metadata captured at session creation.
#[derive(Debug, Clone, Default)]
pub struct SessionMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub additional: Map<String, Value>,
}

impl SessionMeta {
    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }
}

/// Owns session records and drives their lifecycle.
///
/// Mutation is last-writer-wins per session id; callers needing stronger
/// consistency across multiple sessions serialize at a higher layer.
pub struct SessionManager {
    store: RwLock<SessionStore>,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    /// Creates a manager on the system clock.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a manager with an injected clock (deterministic tests).
    pub fn with_clock(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: RwLock::new(SessionStore::new()),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Creates a new session for an already-authenticated identity.
    ///
    /// When the user is at the concurrent-session limit, the single oldest
    /// active session (by creation time) is terminated first — the new
    /// session is never rejected.
    pub fn create_session(
        &self,
        user_id: UserId,
        role: impl Into<String>,
        permissions: Vec<String>,
        meta: SessionMeta,
    ) -> SessionData {
        let now = self.clock.now();
        let mut store = self.store.write().expect("session store lock poisoned");

        let mut active: Vec<(SessionId, DateTime<Utc>)> = store
            .user_session_ids(&user_id)
            .into_iter()
            .filter_map(|id| {
                store
                    .get(&id)
                    .filter(|session| session.is_active)
                    .map(|session| (id.clone(), session.created_at))
            })
            .collect();

        if active.len() >= self.config.max_concurrent_sessions {
            active.sort_by_key(|(_, created_at)| *created_at);
            let (oldest, _) = active.remove(0);
            terminate_locked(
                &mut store,
                &oldest,
                TerminationReason::ConcurrentLimitExceeded,
                now,
            );
        }

        let session = SessionData {
            session_id: self.generate_session_id(),
            user_id: user_id.clone(),
            role: role.into(),
            permissions,
            created_at: now,
            last_activity: now,
            expires_at: now + self.config.max_duration(),
            ip_address: meta.ip_address,
            user_agent: meta.user_agent,
            is_active: true,
            terminated_at: None,
            termination_reason: None,
            metadata: meta.additional,
        };

        info!(
            session_id = %session.session_id,
            user_id = %user_id,
            role = %session.role,
            expires_at = %session.expires_at,
            "session created"
        );

        store.insert(session.clone());
        session
    }

    /// Validates a session and refreshes its activity timestamp.
    ///
    /// Returns `None` (terminating where noted) when the session is
    /// unknown, inactive, past its absolute lifetime (`expired`), idle too
    /// long (`idle_timeout`), or — under secure transport — presented from
    /// a different ip than it was bound to (`ip_mismatch`).
    pub fn validate_session(&self, session_id: &SessionId, ip: Option<&str>) -> Option<SessionData> {
        let now = self.clock.now();
        let mut store = self.store.write().expect("session store lock poisoned");

        let session = match store.get(session_id) {
            Some(session) => session,
            None => {
                warn!(session_id = %session_id, "session validation failed: not found");
                return None;
            }
        };

        if !session.is_active {
            warn!(session_id = %session_id, "session validation failed: inactive");
            return None;
        }

        if session.is_expired_at(now) {
            warn!(session_id = %session_id, "session validation failed: expired");
            terminate_locked(&mut store, session_id, TerminationReason::Expired, now);
            return None;
        }

        if session.is_idle_at(now, self.config.idle_timeout()) {
            warn!(
                session_id = %session_id,
                idle_secs = (now - session.last_activity).num_seconds(),
                "session validation failed: idle timeout"
            );
            terminate_locked(&mut store, session_id, TerminationReason::IdleTimeout, now);
            return None;
        }

        if self.config.secure_transport {
            if let (Some(bound), Some(current)) = (session.ip_address.as_deref(), ip) {
                if bound != current {
                    warn!(
                        session_id = %session_id,
                        bound_ip = bound,
                        current_ip = current,
                        "session validation failed: ip mismatch"
                    );
                    terminate_locked(&mut store, session_id, TerminationReason::IpMismatch, now);
                    return None;
                }
            }
        }

        let session = store.get_mut(session_id).expect("session checked above");
        session.last_activity = now;
        Some(session.clone())
    }

    /// Renews a session's absolute expiry.
    ///
    /// Validation runs first. While more than `renew_before_expiry` minutes
    /// remain the session is returned unchanged; otherwise `expires_at`
    /// extends to `now + max_duration`.
    pub fn renew_session(&self, session_id: &SessionId) -> Option<SessionData> {
        let session = self.validate_session(session_id, None)?;
        let now = self.clock.now();

        if session.expires_at > now + self.config.renew_before_expiry() {
            return Some(session);
        }

        let mut store = self.store.write().expect("session store lock poisoned");
        let session = store.get_mut(session_id)?;
        session.expires_at = now + self.config.max_duration();

        info!(
            session_id = %session_id,
            user_id = %session.user_id,
            new_expires_at = %session.expires_at,
            "session renewed"
        );

        Some(session.clone())
    }

    /// Terminates a session. Returns whether an active session was
    /// terminated. The record stays in the store for a short grace window
    /// so audit tooling can inspect it.
    pub fn terminate_session(
        &self,
        session_id: &SessionId,
        reason: Option<TerminationReason>,
    ) -> bool {
        let now = self.clock.now();
        let mut store = self.store.write().expect("session store lock poisoned");
        terminate_locked(
            &mut store,
            session_id,
            reason.unwrap_or(TerminationReason::Manual),
            now,
        )
    }

    /// Terminates all of a user's sessions, optionally sparing one.
    /// Returns the number of sessions terminated.
    pub fn terminate_user_sessions(
        &self,
        user_id: &UserId,
        except: Option<&SessionId>,
    ) -> usize {
        let now = self.clock.now();
        let mut store = self.store.write().expect("session store lock poisoned");

        let targets: Vec<SessionId> = store
            .user_session_ids(user_id)
            .into_iter()
            .filter(|id| except != Some(id))
            .collect();

        let terminated = targets
            .iter()
            .filter(|id| {
                terminate_locked(
                    &mut store,
                    id,
                    TerminationReason::UserSessionsTerminated,
                    now,
                )
            })
            .count();

        if terminated > 0 {
            info!(user_id = %user_id, terminated, "user sessions terminated");
        }
        terminated
    }

    /// Active sessions for a user.
    pub fn user_sessions(&self, user_id: &UserId) -> Vec<SessionData> {
        let store = self.store.read().expect("session store lock poisoned");
        store
            .user_session_ids(user_id)
            .into_iter()
            .filter_map(|id| store.get(&id).cloned())
            .filter(|session| session.is_active)
            .collect()
    }

    /// Metadata-free projection of one session.
    pub fn session_info(&self, session_id: &SessionId) -> Option<SessionInfo> {
        let store = self.store.read().expect("session store lock poisoned");
        store.get(session_id).map(SessionData::info)
    }

    /// All live sessions, most recently active first.
    pub fn all_active_sessions(&self) -> Vec<SessionInfo> {
        let now = self.clock.now();
        let store = self.store.read().expect("session store lock poisoned");

        let mut sessions: Vec<SessionInfo> = store
            .iter()
            .filter(|session| session.is_active && !session.is_expired_at(now))
            .map(SessionData::info)
            .collect();
        sessions.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        sessions
    }

    /// Replaces a live session's permission snapshot.
    pub fn update_session_permissions(
        &self,
        session_id: &SessionId,
        permissions: Vec<String>,
    ) -> bool {
        let now = self.clock.now();
        let mut store = self.store.write().expect("session store lock poisoned");

        let Some(session) = store.get_mut(session_id) else {
            return false;
        };
        if !session.is_active {
            return false;
        }

        session.permissions = permissions;
        session.last_activity = now;
        debug!(
            session_id = %session_id,
            permission_count = session.permissions.len(),
            "session permissions updated"
        );
        true
    }

    /// Returns whether a live session carries a permission string.
    pub fn has_permission(&self, session_id: &SessionId, permission: &str) -> bool {
        let store = self.store.read().expect("session store lock poisoned");
        store
            .get(session_id)
            .is_some_and(|s| s.is_active && s.permissions.iter().any(|p| p == permission))
    }

    /// Identifies active sessions past their absolute or idle limits.
    /// Scan only; termination is the sweeper's job.
    pub fn scan_expired(&self) -> Vec<(SessionId, TerminationReason)> {
        let now = self.clock.now();
        let store = self.store.read().expect("session store lock poisoned");

        store
            .iter()
            .filter(|session| session.is_active)
            .filter_map(|session| {
                if session.is_expired_at(now) {
                    Some((session.session_id.clone(), TerminationReason::Expired))
                } else if session.is_idle_at(now, self.config.idle_timeout()) {
                    Some((session.session_id.clone(), TerminationReason::IdleTimeout))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Hard-removes terminated sessions once their grace window has
    /// passed. Returns the number purged.
    pub fn purge_terminated(&self) -> usize {
        let now = self.clock.now();
        let mut store = self.store.write().expect("session store lock poisoned");

        let expired_grace: Vec<SessionId> = store
            .iter()
            .filter(|session| !session.is_active)
            .filter(|session| {
                session
                    .terminated_at
                    .is_some_and(|t| (now - t).num_seconds() >= TERMINATION_GRACE_SECS)
            })
            .map(|session| session.session_id.clone())
            .collect();

        for id in &expired_grace {
            store.remove(id);
        }
        expired_grace.len()
    }

    /// Session statistics across all stored (including not-yet-purged
    /// terminated) sessions.
    pub fn stats(&self) -> SessionStats {
        let now = self.clock.now();
        let store = self.store.read().expect("session store lock poisoned");

        let mut stats = SessionStats {
            total_sessions: store.len(),
            user_count: store.user_count(),
            ..SessionStats::default()
        };

        let mut total_duration_secs: i64 = 0;
        for session in store.iter() {
            if session.is_active && !session.is_expired_at(now) {
                stats.active_sessions += 1;
            } else {
                stats.expired_sessions += 1;
            }
            total_duration_secs += (session.last_activity - session.created_at).num_seconds();
            *stats
                .sessions_per_user
                .entry(session.user_id.clone())
                .or_default() += 1;
        }

        if stats.total_sessions > 0 {
            stats.average_session_duration_mins =
                ((total_duration_secs as f64 / stats.total_sessions as f64) / 60.0).round() as u64;
        }
        stats
    }

    /// Terminates every active session (manager shutdown). Returns the
    /// number terminated.
    pub fn shutdown(&self) -> usize {
        let now = self.clock.now();
        let mut store = self.store.write().expect("session store lock poisoned");

        let active: Vec<SessionId> = store
            .iter()
            .filter(|session| session.is_active)
            .map(|session| session.session_id.clone())
            .collect();

        let terminated = active
            .iter()
            .filter(|id| {
                terminate_locked(&mut store, id, TerminationReason::SystemShutdown, now)
            })
            .count();

        info!(terminated, "session manager shutdown complete");
        terminated
    }

    fn generate_session_id(&self) -> SessionId {
        let entropy: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let raw = format!("sess_{}_{entropy}", Uuid::new_v4().simple());

        let token: String = raw
            .chars()
            .take(self.config.session_token_length.max(16))
            .collect();
        SessionId::new(token)
    }
}

/// Marks a session terminated while the store lock is held.
fn terminate_locked(
    store: &mut SessionStore,
    session_id: &SessionId,
    reason: TerminationReason,
    now: DateTime<Utc>,
) -> bool {
    let Some(session) = store.get_mut(session_id) else {
        return false;
    };
    if !session.is_active {
        return false;
    }

    session.is_active = false;
    session.terminated_at = Some(now);
    session.termination_reason = Some(reason);
    let user_id = session.user_id.clone();

    store.detach_from_user(&user_id, session_id);

    info!(
        session_id = %session_id,
        user_id = %user_id,
        reason = reason.as_str(),
        "session terminated"
    );
    true
}

/// Session statistics for observability.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub total_sessions: usize,
    pub active_sessions: usize,
    pub expired_sessions: usize,
    pub user_count: usize,
    pub average_session_duration_mins: u64,
    pub sessions_per_user: HashMap<UserId, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelock_types::ManualClock;
    use chrono::Duration;

    fn fixture(config: SessionConfig) -> (Arc<ManualClock>, SessionManager) {
        let clock = Arc::new(ManualClock::default());
        let manager = SessionManager::with_clock(config, clock.clone());
        (clock, manager)
    }

    fn create(manager: &SessionManager, user: &str) -> SessionData {
        manager.create_session(
            UserId::new(user),
            "physician",
            vec!["Patient:read".to_string()],
            SessionMeta::default(),
        )
    }

    #[test]
    fn test_create_and_validate() {
        let (_, manager) = fixture(SessionConfig::default());
        let session = create(&manager, "u1");

        assert!(session.session_id.as_str().starts_with("sess_"));
        assert_eq!(session.session_id.as_str().len(), 64);

        let validated = manager.validate_session(&session.session_id, None);
        assert!(validated.is_some());
    }

    #[test]
    fn test_absolute_expiry_after_one_minute() {
        let config = SessionConfig {
            max_duration: 1,
            ..SessionConfig::default()
        };
        let (clock, manager) = fixture(config);
        let session = create(&manager, "u1");

        clock.advance(Duration::seconds(59));
        assert!(manager.validate_session(&session.session_id, None).is_some());

        clock.advance(Duration::seconds(2)); // 61s total
        assert!(manager.validate_session(&session.session_id, None).is_none());

        // Terminated, not merely rejected; excluded from active listings.
        assert!(manager.all_active_sessions().is_empty());
        let info = manager.session_info(&session.session_id).unwrap();
        assert!(!info.is_active);

        // Null forever after, even if called again.
        assert!(manager.validate_session(&session.session_id, None).is_none());
    }

    #[test]
    fn test_idle_timeout() {
        let (clock, manager) = fixture(SessionConfig::default());
        let session = create(&manager, "u1");

        // Touch the session at minute 20, then go idle past the threshold.
        clock.advance(Duration::minutes(20));
        assert!(manager.validate_session(&session.session_id, None).is_some());

        clock.advance(Duration::minutes(31));
        assert!(manager.validate_session(&session.session_id, None).is_none());

        let info = manager.session_info(&session.session_id).unwrap();
        assert!(!info.is_active);
    }

    #[test]
    fn test_validation_refreshes_activity() {
        let (clock, manager) = fixture(SessionConfig::default());
        let session = create(&manager, "u1");

        // Repeated activity keeps an otherwise idle-bound session alive.
        for _ in 0..20 {
            clock.advance(Duration::minutes(25));
            assert!(manager.validate_session(&session.session_id, None).is_some());
        }
    }

    #[test]
    fn test_concurrent_limit_evicts_exactly_oldest() {
        let (clock, manager) = fixture(SessionConfig::default());

        let first = create(&manager, "u1");
        clock.advance(Duration::minutes(1));
        let second = create(&manager, "u1");
        clock.advance(Duration::minutes(1));
        let third = create(&manager, "u1");
        clock.advance(Duration::minutes(1));

        assert_eq!(manager.user_sessions(&UserId::new("u1")).len(), 3);

        let fourth = create(&manager, "u1");

        let remaining = manager.user_sessions(&UserId::new("u1"));
        assert_eq!(remaining.len(), 3);
        assert!(!remaining.iter().any(|s| s.session_id == first.session_id));
        for survivor in [&second, &third, &fourth] {
            assert!(remaining.iter().any(|s| s.session_id == survivor.session_id));
        }

        let evicted = manager.session_info(&first.session_id).unwrap();
        assert!(!evicted.is_active);
    }

    #[test]
    fn test_renew_noop_when_far_from_expiry() {
        let (_, manager) = fixture(SessionConfig::default());
        let session = create(&manager, "u1");

        let renewed = manager.renew_session(&session.session_id).unwrap();
        assert_eq!(renewed.expires_at, session.expires_at);
    }

    #[test]
    fn test_renew_extends_near_expiry() {
        let (clock, manager) = fixture(SessionConfig::default());
        let session = create(&manager, "u1");

        // 8h lifetime, 1h renewal threshold: at 7h30m renewal applies.
        clock.advance(Duration::minutes(450));
        let renewed = manager.renew_session(&session.session_id).unwrap();
        assert!(renewed.expires_at > session.expires_at);
        assert_eq!(renewed.expires_at, clock.now() + Duration::minutes(480));
    }

    #[test]
    fn test_ip_mismatch_under_secure_transport() {
        let (_, manager) = fixture(SessionConfig::default());
        let session = manager.create_session(
            UserId::new("u1"),
            "nurse",
            vec![],
            SessionMeta::default().with_ip_address("10.0.0.1"),
        );

        assert!(
            manager
                .validate_session(&session.session_id, Some("10.0.0.1"))
                .is_some()
        );
        assert!(
            manager
                .validate_session(&session.session_id, Some("10.9.9.9"))
                .is_none()
        );
        let info = manager.session_info(&session.session_id).unwrap();
        assert!(!info.is_active);
    }

    #[test]
    fn test_ip_check_skipped_without_secure_transport() {
        let config = SessionConfig {
            secure_transport: false,
            ..SessionConfig::default()
        };
        let (_, manager) = fixture(config);
        let session = manager.create_session(
            UserId::new("u1"),
            "nurse",
            vec![],
            SessionMeta::default().with_ip_address("10.0.0.1"),
        );

        assert!(
            manager
                .validate_session(&session.session_id, Some("10.9.9.9"))
                .is_some()
        );
    }

    #[test]
    fn test_terminate_user_sessions_with_exception() {
        let (_, manager) = fixture(SessionConfig::default());
        let keep = create(&manager, "u1");
        create(&manager, "u1");
        create(&manager, "u1");

        let terminated = manager.terminate_user_sessions(&UserId::new("u1"), Some(&keep.session_id));
        assert_eq!(terminated, 2);

        let remaining = manager.user_sessions(&UserId::new("u1"));
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].session_id, keep.session_id);
    }

    #[test]
    fn test_grace_purge() {
        let (clock, manager) = fixture(SessionConfig::default());
        let session = create(&manager, "u1");

        manager.terminate_session(&session.session_id, None);
        // Still inspectable inside the grace window.
        assert_eq!(manager.purge_terminated(), 0);
        assert!(manager.session_info(&session.session_id).is_some());

        clock.advance(Duration::seconds(61));
        assert_eq!(manager.purge_terminated(), 1);
        assert!(manager.session_info(&session.session_id).is_none());
    }

    #[test]
    fn test_scan_expired_reports_reasons() {
        let config = SessionConfig {
            max_duration: 60,
            idle_timeout: 30,
            ..SessionConfig::default()
        };
        let (clock, manager) = fixture(config);

        let idle = create(&manager, "u1");
        clock.advance(Duration::minutes(25));
        let fresh = create(&manager, "u2");
        clock.advance(Duration::minutes(10)); // idle at 35m, fresh at 10m

        let scan = manager.scan_expired();
        assert_eq!(scan.len(), 1);
        assert_eq!(scan[0].0, idle.session_id);
        assert_eq!(scan[0].1, TerminationReason::IdleTimeout);

        clock.advance(Duration::minutes(60));
        let scan = manager.scan_expired();
        // fresh is now past both limits; absolute expiry wins the label.
        assert!(scan.iter().any(|(id, reason)| {
            *id == fresh.session_id && *reason == TerminationReason::Expired
        }));
    }

    #[test]
    fn test_session_permissions() {
        let (_, manager) = fixture(SessionConfig::default());
        let session = create(&manager, "u1");

        assert!(manager.has_permission(&session.session_id, "Patient:read"));
        assert!(!manager.has_permission(&session.session_id, "Patient:delete"));

        assert!(manager.update_session_permissions(
            &session.session_id,
            vec!["Patient:read".to_string(), "Patient:delete".to_string()],
        ));
        assert!(manager.has_permission(&session.session_id, "Patient:delete"));

        manager.terminate_session(&session.session_id, None);
        assert!(!manager.has_permission(&session.session_id, "Patient:read"));
        assert!(!manager.update_session_permissions(&session.session_id, vec![]));
    }

    #[test]
    fn test_stats() {
        let (clock, manager) = fixture(SessionConfig::default());
        create(&manager, "u1");
        create(&manager, "u1");
        let terminated = create(&manager, "u2");
        manager.terminate_session(&terminated.session_id, None);

        clock.advance(Duration::minutes(10));
        let stats = manager.stats();
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.active_sessions, 2);
        assert_eq!(stats.expired_sessions, 1);
        assert_eq!(stats.sessions_per_user[&UserId::new("u1")], 2);
        assert_eq!(stats.user_count, 1); // u2's only session is detached
    }

    #[test]
    fn test_shutdown_terminates_everything() {
        let (_, manager) = fixture(SessionConfig::default());
        create(&manager, "u1");
        create(&manager, "u2");

        assert_eq!(manager.shutdown(), 2);
        assert!(manager.all_active_sessions().is_empty());
    }
}
