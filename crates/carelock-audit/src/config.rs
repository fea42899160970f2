//! Audit trail configuration.

use serde::{Deserialize, Serialize};

/// How much of each event the audit log emits to tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HipaaLevel {
    /// Event id, type, and outcome only.
    Minimal,
    /// The standard HIPAA-required fields.
    #[default]
    Standard,
    /// Every field, with PHI masked.
    Comprehensive,
}

/// Configuration for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub hipaa_level: HipaaLevel,

    /// Days an event is retained before cleanup removes it.
    pub retention_period: u32,

    /// Whether events are forwarded to the remote endpoint automatically.
    pub automatic_reporting: bool,

    /// Optional remote collection endpoint.
    pub endpoint: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            hipaa_level: HipaaLevel::Standard,
            retention_period: 2190, // six years, HIPAA documentation retention
            automatic_reporting: false,
            endpoint: None,
        }
    }
}
