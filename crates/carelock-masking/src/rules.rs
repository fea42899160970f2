//! Masking rules: which strategy applies to which field.

use serde::{Deserialize, Serialize};

use crate::MaskingPatterns;

/// Strategy used to mask a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskingKind {
    /// Replace every character with the mask character.
    Full,
    /// Keep `visible_chars` characters at each end, mask the middle.
    Partial,
    /// Structure-aware masking dispatched on the field name
    /// (SSN, national id, phone, email, ip, date fields).
    Format,
    /// Deterministic SHA-256 derived token.
    Hash,
    /// Random opaque token, unstable across calls.
    Tokenize,
}

impl MaskingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaskingKind::Full => "full",
            MaskingKind::Partial => "partial",
            MaskingKind::Format => "format",
            MaskingKind::Hash => "hash",
            MaskingKind::Tokenize => "tokenize",
        }
    }
}

/// Masking rule for a single field.
///
/// At most one rule is active per field name; registering a second rule for
/// the same field replaces the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskingRule {
    /// Field name this rule applies to (object key in payloads).
    pub field: String,

    /// The masking strategy.
    pub kind: MaskingKind,

    /// For `Full`: whether the mask preserves the value's length.
    #[serde(default = "default_true")]
    pub preserve_length: bool,

    /// For `Partial` and `Format`: number of characters left visible.
    #[serde(default)]
    pub visible_chars: usize,
}

fn default_true() -> bool {
    true
}

impl MaskingRule {
    pub fn new(field: impl Into<String>, kind: MaskingKind) -> Self {
        Self {
            field: field.into(),
            kind,
            preserve_length: true,
            visible_chars: 0,
        }
    }

    pub fn with_visible_chars(mut self, visible_chars: usize) -> Self {
        self.visible_chars = visible_chars;
        self
    }

    pub fn without_preserved_length(mut self) -> Self {
        self.preserve_length = false;
        self
    }
}

/// The default PHI rule catalog.
///
/// Families covered by a [`MaskingPatterns`] flag are only installed when
/// that flag is enabled; identity fields like names and addresses are
/// always masked.
pub(crate) fn default_rules(patterns: &MaskingPatterns) -> Vec<MaskingRule> {
    let mut rules = Vec::new();

    // Direct identifiers
    if patterns.ssn {
        rules.push(MaskingRule::new("ssn", MaskingKind::Format).with_visible_chars(4));
    }
    if patterns.national_id {
        rules.push(MaskingRule::new("nationalId", MaskingKind::Format).with_visible_chars(4));
    }
    if patterns.medical_record_number {
        rules.push(
            MaskingRule::new("medicalRecordNumber", MaskingKind::Partial).with_visible_chars(3),
        );
    }
    if patterns.account_number {
        rules.push(MaskingRule::new("accountNumber", MaskingKind::Partial).with_visible_chars(4));
    }
    rules.push(MaskingRule::new("patientId", MaskingKind::Partial).with_visible_chars(2));

    // Contact information
    if patterns.phone {
        rules.push(MaskingRule::new("phone", MaskingKind::Format).with_visible_chars(4));
        rules.push(MaskingRule::new("fax", MaskingKind::Format).with_visible_chars(4));
    }
    if patterns.email {
        rules.push(MaskingRule::new("email", MaskingKind::Format).with_visible_chars(2));
    }

    // Names and addresses
    rules.push(MaskingRule::new("firstName", MaskingKind::Partial).with_visible_chars(1));
    rules.push(MaskingRule::new("lastName", MaskingKind::Partial).with_visible_chars(1));
    rules.push(MaskingRule::new("middleName", MaskingKind::Partial).with_visible_chars(1));
    rules.push(MaskingRule::new("address", MaskingKind::Partial));
    rules.push(MaskingRule::new("city", MaskingKind::Partial).with_visible_chars(2));
    rules.push(MaskingRule::new("state", MaskingKind::Full));
    rules.push(MaskingRule::new("zipCode", MaskingKind::Partial).with_visible_chars(2));

    // Technical identifiers
    if patterns.ip_address {
        rules.push(MaskingRule::new("ipAddress", MaskingKind::Format));
    }
    if patterns.web_url {
        rules.push(MaskingRule::new("webUrl", MaskingKind::Partial));
    }
    if patterns.device_identifier {
        rules.push(MaskingRule::new("deviceId", MaskingKind::Hash));
    }
    if patterns.biometric_identifier {
        rules.push(MaskingRule::new("biometricId", MaskingKind::Hash));
    }

    // Dates (year stays visible)
    rules.push(MaskingRule::new("dateOfBirth", MaskingKind::Format).with_visible_chars(4));
    rules.push(MaskingRule::new("admissionDate", MaskingKind::Format).with_visible_chars(4));
    rules.push(MaskingRule::new("dischargeDate", MaskingKind::Format).with_visible_chars(4));

    rules
}
