//! # carelock-session: Session lifecycle management
//!
//! Issues, validates, renews, and terminates authenticated sessions under
//! concurrency limits and idle/absolute timeouts.
//!
//! ## Lifecycle
//!
//! ```text
//! created ──► active ──┬─► renewed ──► active
//!                      ├─► idle-expired ────────┐
//!                      ├─► absolute-expired ────┤
//!                      ├─► manually-terminated ─┼─► terminated ─► purged
//!                      └─► evicted (limit) ─────┘    (after grace window)
//! ```
//!
//! A session is valid only while
//! `is_active && now < expires_at && now - last_activity < idle_timeout`.
//! Terminated sessions stay in the store for a short grace window so audit
//! tooling can still inspect them, then the periodic sweep removes them.
//!
//! All time arithmetic goes through an injected [`Clock`], so every expiry
//! path is testable by advancing a manual clock.
//!
//! ## Example
//!
//! ```
//! use carelock_session::{SessionConfig, SessionManager, SessionMeta};
//! use carelock_types::UserId;
//!
//! let manager = SessionManager::new(SessionConfig::default());
//! let session = manager.create_session(
//!     UserId::new("dr-chen"),
//!     "physician",
//!     vec!["Patient:read".into()],
//!     SessionMeta::default(),
//! );
//!
//! assert!(manager.validate_session(&session.session_id, None).is_some());
//! assert!(manager.terminate_session(&session.session_id, None));
//! assert!(manager.validate_session(&session.session_id, None).is_none());
//! ```
//!
//! [`Clock`]: carelock_types::Clock

mod config;
mod manager;
mod session;
mod store;
mod sweep;

pub use config::SessionConfig;
pub use manager::{SessionManager, SessionMeta, SessionStats};
pub use session::{SessionData, SessionInfo, TerminationReason};
pub use store::SessionStore;
pub use sweep::{DEFAULT_SWEEP_INTERVAL, run_sweeper, sweep_once};
