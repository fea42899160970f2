//! Validation rules.

use std::fmt::{self, Display};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use carelock_types::AccessContext;

use crate::ComplianceError;

/// Safeguard family a rule belongs to (HIPAA Security Rule structure).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeguardCategory {
    Administrative,
    Physical,
    Technical,
}

impl SafeguardCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafeguardCategory::Administrative => "administrative",
            SafeguardCategory::Physical => "physical",
            SafeguardCategory::Technical => "technical",
        }
    }
}

impl Display for SafeguardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SafeguardCategory {
    type Err = ComplianceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "administrative" => Ok(SafeguardCategory::Administrative),
            "physical" => Ok(SafeguardCategory::Physical),
            "technical" => Ok(SafeguardCategory::Technical),
            other => Err(ComplianceError::InvalidCategory(other.to_string())),
        }
    }
}

/// Rule severity. The numeric weight feeds the risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Weight used to convert failed-rule counts into a risk score.
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 4,
            Severity::Critical => 8,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = ComplianceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(ComplianceError::InvalidSeverity(other.to_string())),
        }
    }
}

/// Result of one rule's check function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub passed: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

impl RuleOutcome {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            recommendations: Vec::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            recommendations: Vec::new(),
        }
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendations.push(recommendation.into());
        self
    }
}

/// The check function type. Fallible on purpose: a rule that cannot
/// evaluate reports an error, which the engine folds into a failed result
/// without aborting the batch.
pub type CheckFn = Arc<dyn Fn(&AccessContext) -> anyhow::Result<RuleOutcome> + Send + Sync>;

/// A registered validation rule.
#[derive(Clone)]
pub struct ValidationRule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: SafeguardCategory,
    pub severity: Severity,
    /// Required rules participate in quick validation when critical.
    pub required: bool,
    pub check: CheckFn,
}

impl ValidationRule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: SafeguardCategory,
        severity: Severity,
        check: impl Fn(&AccessContext) -> anyhow::Result<RuleOutcome> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category,
            severity,
            required: true,
            check: Arc::new(check),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Metadata projection (the check function is not listable).
    pub fn info(&self) -> RuleInfo {
        RuleInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category,
            severity: self.severity,
            required: self.required,
        }
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("severity", &self.severity)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// Rule metadata without the check function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: SafeguardCategory,
    pub severity: Severity,
    pub required: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_weights() {
        assert_eq!(Severity::Low.weight(), 1);
        assert_eq!(Severity::Medium.weight(), 2);
        assert_eq!(Severity::High.weight(), 4);
        assert_eq!(Severity::Critical.weight(), 8);
    }

    #[test]
    fn test_severity_parsing() {
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(
            "technical".parse::<SafeguardCategory>().unwrap(),
            SafeguardCategory::Technical
        );
        assert!("magical".parse::<SafeguardCategory>().is_err());
    }

    #[test]
    fn test_rule_info_projection() {
        let rule = ValidationRule::new(
            "t1",
            "Test",
            SafeguardCategory::Technical,
            Severity::Low,
            |_| Ok(RuleOutcome::pass("ok")),
        )
        .with_description("desc")
        .optional();

        let info = rule.info();
        assert_eq!(info.id, "t1");
        assert_eq!(info.severity, Severity::Low);
        assert!(!info.required);
    }
}
