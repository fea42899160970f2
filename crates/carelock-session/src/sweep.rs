//! Periodic session sweep.
//!
//! The only long-lived background activity in the core. Each tick scans for
//! sessions past their absolute or idle limits, terminates them
//! concurrently (one slow termination never blocks the rest), then purges
//! terminated records whose grace window has passed. Failures are caught
//! and logged; the next cycle always runs.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::SessionManager;

/// Default sweep cadence.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Spawns the sweep loop on the current tokio runtime.
///
/// The returned handle can be aborted at shutdown; the loop itself never
/// exits on its own.
pub fn run_sweeper(manager: Arc<SessionManager>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs(), "session sweep started");

        loop {
            tick.tick().await;
            sweep_once(&manager).await;
        }
    })
}

/// One sweep cycle: terminate expired sessions concurrently, then purge.
pub async fn sweep_once(manager: &Arc<SessionManager>) {
    let targets = manager.scan_expired();

    if !targets.is_empty() {
        let mut terminations = JoinSet::new();
        for (session_id, reason) in targets {
            let manager = Arc::clone(manager);
            terminations
                .spawn(async move { manager.terminate_session(&session_id, Some(reason)) });
        }

        let mut terminated = 0usize;
        while let Some(result) = terminations.join_next().await {
            match result {
                Ok(true) => terminated += 1,
                Ok(false) => {}
                Err(error) => warn!(%error, "session sweep termination failed"),
            }
        }
        info!(terminated, "expired sessions cleaned up");
    }

    let purged = manager.purge_terminated();
    if purged > 0 {
        debug!(purged, "terminated sessions purged after grace window");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SessionConfig, SessionMeta};
    use carelock_types::{ManualClock, UserId};
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn test_sweep_terminates_and_purges() {
        let clock = Arc::new(ManualClock::default());
        let manager = Arc::new(SessionManager::with_clock(
            SessionConfig {
                max_duration: 1,
                ..SessionConfig::default()
            },
            clock.clone(),
        ));

        let session = manager.create_session(
            UserId::new("u1"),
            "nurse",
            vec![],
            SessionMeta::default(),
        );

        clock.advance(ChronoDuration::seconds(61));
        sweep_once(&manager).await;

        let info = manager.session_info(&session.session_id).unwrap();
        assert!(!info.is_active);

        // Grace window elapses; the next cycle removes the record.
        clock.advance(ChronoDuration::seconds(61));
        sweep_once(&manager).await;
        assert!(manager.session_info(&session.session_id).is_none());
    }

    #[tokio::test]
    async fn test_sweep_leaves_live_sessions_alone() {
        let clock = Arc::new(ManualClock::default());
        let manager = Arc::new(SessionManager::with_clock(
            SessionConfig::default(),
            clock.clone(),
        ));

        let session = manager.create_session(
            UserId::new("u1"),
            "nurse",
            vec![],
            SessionMeta::default(),
        );

        clock.advance(ChronoDuration::minutes(5));
        sweep_once(&manager).await;

        assert!(manager.validate_session(&session.session_id, None).is_some());
    }
}
