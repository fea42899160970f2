//! The masking engine: strategy dispatch and deep object walking.

use std::collections::HashMap;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::rules::default_rules;
use crate::{MaskingConfig, MaskingError, MaskingKind, MaskingRule, Result};

/// Field-level data masker.
///
/// Owns the masking rule registry. Unknown fields fall back to full
/// masking, so a value passed through the masker never leaves unmasked by
/// omission. When `preserve_format` is disabled in the configuration,
/// format rules degrade to partial masking (no recognizable shells).
#[derive(Debug, Clone)]
pub struct FieldMasker {
    config: MaskingConfig,
    rules: HashMap<String, MaskingRule>,
}

impl FieldMasker {
    /// Creates a masker with the default PHI rule catalog installed.
    pub fn new(config: MaskingConfig) -> Result<Self> {
        let mut masker = Self::without_default_rules(config)?;
        for rule in default_rules(&masker.config.patterns) {
            masker.rules.insert(rule.field.clone(), rule);
        }
        debug!(rule_count = masker.rules.len(), "PHI masking rules initialized");
        Ok(masker)
    }

    /// Creates a masker with an empty rule registry.
    pub fn without_default_rules(config: MaskingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rules: HashMap::new(),
        })
    }

    /// Adds or replaces the rule for a field.
    pub fn add_rule(&mut self, rule: MaskingRule) -> Result<()> {
        if rule.field.is_empty() {
            return Err(MaskingError::EmptyFieldName);
        }
        debug!(field = %rule.field, kind = rule.kind.as_str(), "masking rule added");
        self.rules.insert(rule.field.clone(), rule);
        Ok(())
    }

    /// Removes the rule for a field. Returns whether a rule was present.
    pub fn remove_rule(&mut self, field: &str) -> bool {
        let removed = self.rules.remove(field).is_some();
        if removed {
            debug!(field, "masking rule removed");
        }
        removed
    }

    /// Returns whether a field has a registered masking rule.
    pub fn is_phi_field(&self, field: &str) -> bool {
        self.rules.contains_key(field)
    }

    /// Masks a single value according to the field's rule.
    ///
    /// JSON null passes through unchanged. Other scalars are rendered to a
    /// string and masked; arrays and objects are walked recursively (array
    /// items inherit the parent field name for scalar leaves).
    pub fn mask_value(&self, value: &Value, field: &str) -> Value {
        match value {
            Value::Null => Value::Null,
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| match item {
                        Value::Object(_) => self.mask_object(item),
                        other => self.mask_value(other, field),
                    })
                    .collect(),
            ),
            Value::Object(_) => self.mask_object(value),
            scalar => {
                let text = scalar_to_string(scalar);
                if text.is_empty() {
                    return scalar.clone();
                }
                Value::String(self.mask_text(&text, field))
            }
        }
    }

    /// Deep-masks an object graph, applying field rules to scalar leaves
    /// by their key name. The input is never mutated; a fresh structure is
    /// returned.
    pub fn mask_object(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut masked = Map::with_capacity(map.len());
                for (key, entry) in map {
                    masked.insert(key.clone(), self.mask_value(entry, key));
                }
                Value::Object(masked)
            }
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.mask_object(item)).collect())
            }
            // A bare scalar has no key to select a rule by.
            other => other.clone(),
        }
    }

    /// Masking statistics for observability.
    pub fn stats(&self) -> MaskingStats {
        let mut rules_by_kind: HashMap<String, usize> = HashMap::new();
        let mut phi_fields: Vec<String> = Vec::with_capacity(self.rules.len());

        for (field, rule) in &self.rules {
            *rules_by_kind.entry(rule.kind.as_str().to_string()).or_default() += 1;
            phi_fields.push(field.clone());
        }
        phi_fields.sort();

        MaskingStats {
            total_rules: self.rules.len(),
            rules_by_kind,
            phi_fields,
        }
    }

    fn mask_text(&self, text: &str, field: &str) -> String {
        let Some(rule) = self.rules.get(field) else {
            return self.full(text, true);
        };

        match rule.kind {
            MaskingKind::Full => self.full(text, rule.preserve_length),
            MaskingKind::Partial => self.partial(text, rule.visible_chars),
            MaskingKind::Format if self.config.preserve_format => {
                self.format(text, field, rule.visible_chars)
            }
            MaskingKind::Format => self.partial(text, rule.visible_chars),
            MaskingKind::Hash => hash_token(text),
            MaskingKind::Tokenize => tokenize(),
        }
    }

    // -----------------------------------------------------------------------
    // Strategies
    // -----------------------------------------------------------------------

    fn full(&self, text: &str, preserve_length: bool) -> String {
        if !preserve_length {
            return "***".to_string();
        }
        self.mask_run(text.chars().count())
    }

    fn partial(&self, text: &str, visible_chars: usize) -> String {
        let len = text.chars().count();

        // Too short to show both ends distinctly.
        if len <= visible_chars * 2 {
            return self.mask_run(len.max(3));
        }
        if visible_chars == 0 {
            return self.mask_run(len);
        }

        let start: String = text.chars().take(visible_chars).collect();
        let end: String = text
            .chars()
            .skip(len - visible_chars)
            .collect();
        format!("{start}{}{end}", self.mask_run(len - visible_chars * 2))
    }

    fn format(&self, text: &str, field: &str, visible_chars: usize) -> String {
        match field {
            "ssn" => self.mask_ssn(text, visible_chars),
            "nationalId" => self.mask_national_id(text, visible_chars),
            "phone" => self.mask_phone(text, visible_chars),
            "email" => self.mask_email(text),
            "ipAddress" => self.mask_ip(text),
            "dateOfBirth" | "admissionDate" | "dischargeDate" => {
                self.mask_date(text, visible_chars)
            }
            _ => self.partial(text, visible_chars),
        }
    }

    /// `123-45-6789` -> `***-**-6789`.
    fn mask_ssn(&self, text: &str, visible_chars: usize) -> String {
        let digits: String = text.chars().filter(char::is_ascii_digit).collect();
        if digits.len() != 9 {
            return self.partial(text, visible_chars);
        }
        if visible_chars >= 4 {
            format!("***-**-{}", &digits[5..])
        } else {
            "***-**-****".to_string()
        }
    }

    /// Ten-digit national id: `1234567890` -> `******7890`.
    fn mask_national_id(&self, text: &str, visible_chars: usize) -> String {
        let digits: String = text.chars().filter(char::is_ascii_digit).collect();
        if digits.len() != 10 {
            return self.partial(text, visible_chars);
        }
        if visible_chars >= 4 {
            format!("******{}", &digits[6..])
        } else {
            "**********".to_string()
        }
    }

    /// Preserves a recognized national format shell.
    fn mask_phone(&self, text: &str, visible_chars: usize) -> String {
        let digits: String = text.chars().filter(char::is_ascii_digit).collect();

        if digits.len() == 10 {
            if visible_chars >= 4 {
                format!("(***) ***-{}", &digits[6..])
            } else {
                "(***) ***-****".to_string()
            }
        } else if digits.len() == 11 && digits.starts_with('1') {
            if visible_chars >= 4 {
                format!("1-***-***-{}", &digits[7..])
            } else {
                "1-***-***-****".to_string()
            }
        } else {
            self.partial(text, visible_chars)
        }
    }

    /// `john@example.com` -> `j***n@***.com`.
    fn mask_email(&self, text: &str) -> String {
        let Some(at) = text.find('@') else {
            return self.partial(text, 2);
        };

        let (username, rest) = text.split_at(at);
        let domain = &rest[1..];

        let user_chars: Vec<char> = username.chars().collect();
        let masked_username = if user_chars.len() > 2 {
            format!(
                "{}***{}",
                user_chars[0],
                user_chars[user_chars.len() - 1]
            )
        } else {
            "***".to_string()
        };

        let masked_domain = match domain.rfind('.') {
            Some(dot) => format!("***{}", &domain[dot..]),
            None => "***".to_string(),
        };

        format!("{masked_username}@{masked_domain}")
    }

    /// IPv4 octets are zeroed wholesale; anything else is fully masked.
    fn mask_ip(&self, text: &str) -> String {
        if text.split('.').count() == 4 {
            "***.***.***.***".to_string()
        } else {
            self.full(text, true)
        }
    }

    /// Date-of-birth style fields optionally reveal only the year.
    fn mask_date(&self, text: &str, visible_chars: usize) -> String {
        let Some(year) = parse_year(text) else {
            return self.partial(text, visible_chars);
        };
        if visible_chars >= 4 {
            format!("****-**-** ({year})")
        } else {
            "****-**-**".to_string()
        }
    }

    fn mask_run(&self, len: usize) -> String {
        std::iter::repeat(self.config.default_mask_char).take(len).collect()
    }
}

/// Deterministic SHA-256 derived token: `HASH_` + 16 hex chars.
fn hash_token(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let hex: String = digest
        .iter()
        .take(8)
        .map(|byte| format!("{byte:02X}"))
        .collect();
    format!("HASH_{hex}")
}

/// Random opaque token. Not stable across calls: tokenization is meant to
/// break linkability, unlike `hash_token`.
fn tokenize() -> String {
    let id: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(13)
        .map(|byte| (byte as char).to_ascii_uppercase())
        .collect();
    format!("TOKEN_{id}")
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_year(text: &str) -> Option<i32> {
    use chrono::Datelike;

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.year());
    }
    for format in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(text, format) {
            return Some(date.year());
        }
    }
    None
}

/// Masking statistics for observability.
#[derive(Debug, Clone)]
pub struct MaskingStats {
    pub total_rules: usize,
    pub rules_by_kind: HashMap<String, usize>,
    pub phi_fields: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use test_case::test_case;

    fn masker() -> FieldMasker {
        FieldMasker::new(MaskingConfig::default()).unwrap()
    }

    #[test_case("123-45-6789", "***-**-6789" ; "formatted ssn")]
    #[test_case("123456789", "***-**-6789" ; "unformatted ssn")]
    fn test_mask_ssn(input: &str, expected: &str) {
        assert_eq!(masker().mask_value(&json!(input), "ssn"), json!(expected));
    }

    #[test]
    fn test_mask_ssn_wrong_length_falls_back_to_partial() {
        // 5 digits is not an SSN; partial masking with 4 visible would
        // expose the whole value, so the short-value path full-masks it.
        assert_eq!(masker().mask_value(&json!("12345"), "ssn"), json!("*****"));
    }

    #[test]
    fn test_mask_national_id() {
        assert_eq!(
            masker().mask_value(&json!("1234567890"), "nationalId"),
            json!("******7890")
        );
    }

    #[test_case("5551234567", "(***) ***-4567" ; "us ten digit")]
    #[test_case("15551234567", "1-***-***-4567" ; "us with country code")]
    fn test_mask_phone(input: &str, expected: &str) {
        assert_eq!(masker().mask_value(&json!(input), "phone"), json!(expected));
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(
            masker().mask_value(&json!("john@example.com"), "email"),
            json!("j***n@***.com")
        );
        assert_eq!(
            masker().mask_value(&json!("jo@example.com"), "email"),
            json!("***@***.com")
        );
    }

    #[test]
    fn test_mask_ip() {
        assert_eq!(
            masker().mask_value(&json!("192.168.1.10"), "ipAddress"),
            json!("***.***.***.***")
        );
    }

    #[test]
    fn test_mask_date_reveals_year_only() {
        assert_eq!(
            masker().mask_value(&json!("1990-05-15"), "dateOfBirth"),
            json!("****-**-** (1990)")
        );
    }

    #[test]
    fn test_unknown_field_fully_masked() {
        assert_eq!(
            masker().mask_value(&json!("anything"), "mysteryField"),
            json!("********")
        );
    }

    #[test]
    fn test_null_passes_through() {
        assert_eq!(masker().mask_value(&Value::Null, "ssn"), Value::Null);
    }

    #[test]
    fn test_hash_is_deterministic_and_prefixed() {
        let m = masker();
        let a = m.mask_value(&json!("device-123"), "deviceId");
        let b = m.mask_value(&json!("device-123"), "deviceId");
        assert_eq!(a, b);
        assert!(a.as_str().unwrap().starts_with("HASH_"));

        let other = m.mask_value(&json!("device-124"), "deviceId");
        assert_ne!(a, other);
    }

    #[test]
    fn test_tokenize_is_unstable() {
        let mut m = masker();
        m.add_rule(MaskingRule::new("claimId", MaskingKind::Tokenize))
            .unwrap();
        let a = m.mask_value(&json!("CLM-1"), "claimId");
        let b = m.mask_value(&json!("CLM-1"), "claimId");
        assert!(a.as_str().unwrap().starts_with("TOKEN_"));
        // Random token: two calls must not be linkable.
        assert_ne!(a, b);
    }

    #[test]
    fn test_mask_object_deep_walk() {
        let m = masker();
        let input = json!({
            "firstName": "Amina",
            "contact": {"email": "amina@clinic.sa", "phone": "5551234567"},
            "visits": [
                {"admissionDate": "2024-01-03", "note": "stable"},
            ],
            "age": 42,
        });

        let masked = m.mask_object(&input);

        assert_eq!(masked["firstName"], json!("A***a"));
        assert_eq!(masked["contact"]["email"], json!("a***a@***.sa"));
        assert_eq!(masked["contact"]["phone"], json!("(***) ***-4567"));
        assert_eq!(masked["visits"][0]["admissionDate"], json!("****-**-** (2024)"));
        // Unknown fields are fully masked, length preserved
        assert_eq!(masked["note"], Value::Null); // key only exists nested
        assert_eq!(masked["visits"][0]["note"], json!("******"));
        assert_eq!(masked["age"], json!("**"));

        // Input untouched
        assert_eq!(input["firstName"], json!("Amina"));
        assert_eq!(input["visits"][0]["note"], json!("stable"));
    }

    #[test]
    fn test_mask_array_of_scalars_inherits_field() {
        let m = masker();
        let masked = m.mask_value(&json!(["123-45-6789", "987-65-4321"]), "ssn");
        assert_eq!(masked, json!(["***-**-6789", "***-**-4321"]));
    }

    #[test]
    fn test_preserve_format_disabled_degrades_to_partial() {
        let config = MaskingConfig {
            preserve_format: false,
            ..MaskingConfig::default()
        };
        let m = FieldMasker::new(config).unwrap();
        // 11 chars, 4 visible at each end
        assert_eq!(
            m.mask_value(&json!("123-45-6789"), "ssn"),
            json!("123-***6789")
        );
    }

    #[test]
    fn test_is_phi_field() {
        let m = masker();
        assert!(m.is_phi_field("ssn"));
        assert!(m.is_phi_field("dateOfBirth"));
        assert!(!m.is_phi_field("favoriteColor"));
    }

    #[test]
    fn test_stats() {
        let stats = masker().stats();
        assert_eq!(stats.total_rules, stats.phi_fields.len());
        assert!(stats.phi_fields.binary_search(&"ssn".to_string()).is_ok());
        assert!(stats.rules_by_kind["format"] >= 5);
    }

    #[test]
    fn test_empty_rule_field_rejected() {
        let mut m = masker();
        assert!(matches!(
            m.add_rule(MaskingRule::new("", MaskingKind::Full)),
            Err(MaskingError::EmptyFieldName)
        ));
    }

    proptest! {
        #[test]
        fn prop_mask_value_is_deterministic(value in "[a-zA-Z0-9@%. -]{1,40}") {
            let m = masker();
            let a = m.mask_value(&json!(value), "email");
            let b = m.mask_value(&json!(value), "email");
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_full_mask_preserves_char_count(value in "[a-zA-Z0-9]{1,64}") {
            let m = masker();
            let masked = m.mask_value(&json!(value.clone()), "unknownField");
            let masked = masked.as_str().unwrap();
            prop_assert_eq!(masked.chars().count(), value.chars().count());
            prop_assert!(masked.chars().all(|c| c == '*'));
        }

        #[test]
        fn prop_partial_never_exposes_short_values(value in "[a-zA-Z0-9]{1,8}") {
            let mut m = masker();
            m.add_rule(
                MaskingRule::new("code", MaskingKind::Partial).with_visible_chars(4),
            ).unwrap();
            let masked = m.mask_value(&json!(value), "code");
            // Values of <= 8 chars cannot show 4 at each end; all masked.
            prop_assert!(masked.as_str().unwrap().chars().all(|c| c == '*'));
        }

        #[test]
        fn prop_mask_object_never_mutates_input(name in "[a-zA-Z]{1,20}", mrn in "[0-9]{4,12}") {
            let m = masker();
            let input = json!({"firstName": name, "medicalRecordNumber": mrn, "nested": {"ssn": "123-45-6789"}});
            let snapshot = input.clone();
            let _ = m.mask_object(&input);
            prop_assert_eq!(input, snapshot);
        }
    }
}
