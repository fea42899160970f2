//! Configuration management for Carelock
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (`CARELOCK_*` prefix, highest precedence)
//! 2. `carelock.local.toml` (gitignored, local overrides)
//! 3. `carelock.toml` (git-tracked, project config)
//! 4. Built-in defaults (lowest precedence)
//!
//! Configuration errors fail fast and loud at setup time; a deployment
//! with a broken masking or session policy must not start.

use serde::{Deserialize, Serialize};

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

pub use carelock_audit::AuditConfig;
pub use carelock_masking::MaskingConfig;
pub use carelock_session::SessionConfig;

/// Main Carelock configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CarelockConfig {
    pub session: SessionConfig,
    pub masking: MaskingConfig,
    pub audit: AuditConfig,
}

impl CarelockConfig {
    /// Validates the composed configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.masking
            .validate()
            .map_err(|error| ConfigError::Validation(error.to_string()))?;

        if self.session.max_concurrent_sessions == 0 {
            return Err(ConfigError::Validation(
                "session.max_concurrent_sessions must be at least 1".to_string(),
            ));
        }
        if self.session.session_token_length < 16 {
            return Err(ConfigError::Validation(
                "session.session_token_length must be at least 16".to_string(),
            ));
        }
        if self.session.max_duration == 0 || self.session.idle_timeout == 0 {
            return Err(ConfigError::Validation(
                "session timeouts must be non-zero".to_string(),
            ));
        }
        if self.audit.automatic_reporting && self.audit.endpoint.is_none() {
            return Err(ConfigError::Validation(
                "audit.automatic_reporting requires audit.endpoint".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CarelockConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = CarelockConfig::default();
        config.session.max_concurrent_sessions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_short_token_rejected() {
        let mut config = CarelockConfig::default();
        config.session.session_token_length = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reporting_without_endpoint_rejected() {
        let mut config = CarelockConfig::default();
        config.audit.automatic_reporting = true;
        assert!(config.validate().is_err());

        config.audit.endpoint = Some("https://audit.internal/events".to_string());
        assert!(config.validate().is_ok());
    }
}
