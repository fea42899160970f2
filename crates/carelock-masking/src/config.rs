//! Masking engine configuration.

use serde::{Deserialize, Serialize};

use crate::{MaskingError, Result};

/// Configuration for the masking engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingConfig {
    /// Character used to replace masked characters.
    pub default_mask_char: char,

    /// Whether format masking preserves the recognizable structure of the
    /// original value (separator positions, format shells).
    pub preserve_format: bool,

    /// Per-category enable flags for the default rule catalog.
    pub patterns: MaskingPatterns,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            default_mask_char: '*',
            preserve_format: true,
            patterns: MaskingPatterns::default(),
        }
    }
}

impl MaskingConfig {
    /// Validates the configuration, failing fast on setup mistakes.
    pub fn validate(&self) -> Result<()> {
        if self.default_mask_char.is_whitespace() || self.default_mask_char.is_control() {
            return Err(MaskingError::InvalidMaskChar(self.default_mask_char));
        }
        Ok(())
    }
}

/// Enable flags for the default masking rule families.
///
/// Each flag gates whether the corresponding default rule is installed;
/// explicitly added rules are never gated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingPatterns {
    pub ssn: bool,
    pub phone: bool,
    pub email: bool,
    pub national_id: bool,
    pub medical_record_number: bool,
    pub account_number: bool,
    pub certificate_number: bool,
    pub vehicle_identifier: bool,
    pub device_identifier: bool,
    pub web_url: bool,
    pub ip_address: bool,
    pub biometric_identifier: bool,
    pub face_photograph: bool,
    pub other_unique_identifier: bool,
}

impl Default for MaskingPatterns {
    fn default() -> Self {
        Self {
            ssn: true,
            phone: true,
            email: true,
            national_id: true,
            medical_record_number: true,
            account_number: true,
            certificate_number: true,
            vehicle_identifier: true,
            device_identifier: true,
            web_url: true,
            ip_address: true,
            biometric_identifier: true,
            face_photograph: true,
            other_unique_identifier: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(MaskingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_whitespace_mask_char_rejected() {
        let config = MaskingConfig {
            default_mask_char: ' ',
            ..MaskingConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MaskingError::InvalidMaskChar(' '))
        ));
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let toml_src = r##"
default_mask_char = "#"
preserve_format = false

[patterns]
ssn = false
"##;
        let config: MaskingConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.default_mask_char, '#');
        assert!(!config.preserve_format);
        assert!(!config.patterns.ssn);
        assert!(config.patterns.phone);
    }
}
