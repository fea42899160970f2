//! The audit trail: masked storage, leveled emission, remote delivery.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use carelock_masking::FieldMasker;
use carelock_types::{Clock, SystemClock};

use crate::{AuditConfig, AuditDraft, AuditEvent, AuditFilter, HipaaLevel};

/// Trail statistics for observability.
#[derive(Debug, Clone, Default)]
pub struct AuditStats {
    pub total_events: usize,
    pub events_by_type: HashMap<String, usize>,
    pub events_by_outcome: HashMap<String, usize>,
    pub oldest_event: Option<DateTime<Utc>>,
    pub newest_event: Option<DateTime<Utc>>,
}

/// In-memory audit trail.
///
/// Every payload is masked on the way in; retention cleanup and remote
/// delivery are the trail's own concerns, never the caller's.
pub struct AuditTrail {
    events: RwLock<HashMap<Uuid, AuditEvent>>,
    config: AuditConfig,
    masker: Arc<FieldMasker>,
    clock: Arc<dyn Clock>,
    client: Option<reqwest::Client>,
}

impl AuditTrail {
    pub fn new(config: AuditConfig, masker: Arc<FieldMasker>) -> Self {
        Self::with_clock(config, masker, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: AuditConfig,
        masker: Arc<FieldMasker>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let client = config.endpoint.as_ref().map(|_| reqwest::Client::new());
        Self {
            events: RwLock::new(HashMap::new()),
            config,
            masker,
            clock,
            client,
        }
    }

    /// Records an event, masking `patient_id` and the details payload
    /// before storage. Returns the event id.
    pub fn log_event(&self, draft: AuditDraft) -> Uuid {
        let event = AuditEvent {
            id: Uuid::new_v4(),
            timestamp: self.clock.now(),
            event_type: draft.event_type,
            user_id: draft.user_id,
            patient_id: draft.patient_id.map(|patient_id| {
                self.masker
                    .mask_value(&Value::String(patient_id), "patientId")
                    .as_str()
                    .unwrap_or_default()
                    .to_string()
            }),
            action: draft.action,
            resource: draft.resource,
            outcome: draft.outcome,
            ip_address: draft.ip_address,
            details: draft.details.map(|details| self.masker.mask_object(&details)),
        };

        self.emit(&event);
        self.deliver(&event);

        let id = event.id;
        self.events
            .write()
            .expect("audit store lock poisoned")
            .insert(id, event);
        id
    }

    /// Events matching a filter, newest first.
    pub fn events(&self, filter: &AuditFilter) -> Vec<AuditEvent> {
        let events = self.events.read().expect("audit store lock poisoned");
        let mut matching: Vec<AuditEvent> = events
            .values()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matching
    }

    /// Removes events older than the retention period. Returns the number
    /// removed.
    pub fn cleanup_expired(&self) -> usize {
        let cutoff = self.clock.now() - Duration::days(i64::from(self.config.retention_period));
        let mut events = self.events.write().expect("audit store lock poisoned");

        let before = events.len();
        events.retain(|_, event| event.timestamp >= cutoff);
        let removed = before - events.len();

        if removed > 0 {
            info!(removed, %cutoff, "old audit events cleaned up");
        }
        removed
    }

    /// Trail statistics.
    pub fn stats(&self) -> AuditStats {
        let events = self.events.read().expect("audit store lock poisoned");
        let mut stats = AuditStats {
            total_events: events.len(),
            ..AuditStats::default()
        };

        for event in events.values() {
            *stats
                .events_by_type
                .entry(event.event_type.as_str().to_string())
                .or_default() += 1;
            *stats
                .events_by_outcome
                .entry(event.outcome.as_str().to_string())
                .or_default() += 1;

            stats.oldest_event = Some(match stats.oldest_event {
                Some(oldest) => oldest.min(event.timestamp),
                None => event.timestamp,
            });
            stats.newest_event = Some(match stats.newest_event {
                Some(newest) => newest.max(event.timestamp),
                None => event.timestamp,
            });
        }
        stats
    }

    /// Emits the event to tracing, shaped by the configured HIPAA level.
    fn emit(&self, event: &AuditEvent) {
        match self.config.hipaa_level {
            HipaaLevel::Minimal => info!(
                event_id = %event.id,
                event_type = event.event_type.as_str(),
                outcome = event.outcome.as_str(),
                "audit event"
            ),
            HipaaLevel::Standard => info!(
                event_id = %event.id,
                event_type = event.event_type.as_str(),
                user_id = %event.user_id,
                action = %event.action,
                outcome = event.outcome.as_str(),
                timestamp = %event.timestamp,
                "audit event"
            ),
            HipaaLevel::Comprehensive => info!(
                event = %serde_json::to_string(event).unwrap_or_default(),
                "audit event"
            ),
        }
    }

    /// Fire-and-forget delivery to the remote endpoint. Skipped silently
    /// when reporting is off; failures are logged, never surfaced.
    fn deliver(&self, event: &AuditEvent) {
        if !self.config.automatic_reporting {
            return;
        }
        let (Some(endpoint), Some(client)) = (self.config.endpoint.clone(), self.client.clone())
        else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let event = event.clone();
                handle.spawn(async move {
                    if let Err(error) = client.post(&endpoint).json(&event).send().await {
                        warn!(%error, event_id = %event.id, "audit delivery failed");
                    }
                });
            }
            Err(_) => {
                debug!(event_id = %event.id, "no async runtime; skipping remote audit delivery");
            }
        }
    }
}
