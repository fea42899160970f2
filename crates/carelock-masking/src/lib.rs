//! # carelock-masking: Field-level PHI masking
//!
//! Redacts protected fields before data is logged or exported, supporting
//! the HIPAA "minimum necessary" principle. Five strategies:
//!
//! | Strategy | Description                                  | Stable |
//! |----------|----------------------------------------------|--------|
//! | Full     | Every character replaced by the mask char    | Yes    |
//! | Partial  | Keep N characters at each end                | Yes    |
//! | Format   | Structure-aware (SSN, phone, email, ip, ...) | Yes    |
//! | Hash     | SHA-256 derived token (`HASH_...`)           | Yes    |
//! | Tokenize | Random opaque token (`TOKEN_...`)            | No     |
//!
//! `Tokenize` is unstable across calls on purpose: it breaks linkability,
//! where `Hash` preserves it for consistent pseudonymization.
//!
//! ## Example
//!
//! ```
//! use carelock_masking::{FieldMasker, MaskingConfig};
//! use serde_json::json;
//!
//! let masker = FieldMasker::new(MaskingConfig::default()).unwrap();
//!
//! let masked = masker.mask_value(&json!("123-45-6789"), "ssn");
//! assert_eq!(masked, json!("***-**-6789"));
//!
//! let record = json!({"firstName": "Amina", "age": 42});
//! let masked = masker.mask_object(&record);
//! assert_eq!(masked["firstName"], json!("A***a"));
//! ```

mod config;
mod masker;
mod rules;

pub use config::{MaskingConfig, MaskingPatterns};
pub use masker::{FieldMasker, MaskingStats};
pub use rules::{MaskingKind, MaskingRule};

use thiserror::Error;

/// Errors raised by masking configuration.
///
/// Masking itself never fails: a value always has a fallback (full masking).
/// Configuration mistakes, by contrast, fail fast at setup time.
#[derive(Debug, Error)]
pub enum MaskingError {
    /// The default mask character must be a single printable character.
    #[error("default mask character {0:?} is not maskable")]
    InvalidMaskChar(char),

    /// A masking rule referenced an empty field name.
    #[error("masking rule field name must not be empty")]
    EmptyFieldName,
}

/// Result type for masking configuration.
pub type Result<T> = std::result::Result<T, MaskingError>;
