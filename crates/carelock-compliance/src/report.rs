//! Compliance reports and risk assessment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{SafeguardCategory, Severity};

/// Per-rule evaluation result inside a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResult {
    pub rule_id: String,
    pub rule_name: String,
    pub category: SafeguardCategory,
    pub severity: Severity,
    pub passed: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

/// Weighted compliance report. Derived and ephemeral; never persisted by
/// this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    /// `round(passed / total * 100)`; 100 when no rules are registered.
    pub overall_compliance: u8,
    pub total_rules: usize,
    pub passed_rules: usize,
    pub failed_rules: usize,
    pub critical_failures: usize,
    pub timestamp: DateTime<Utc>,
    pub rule_results: Vec<RuleResult>,
    /// Deduplicated recommendations from failed rules, in rule order.
    pub recommendations: Vec<String>,
}

impl ComplianceReport {
    /// Human-readable summary for operators and audit attachments.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("HIPAA Compliance Report - {}", self.timestamp.to_rfc3339()));
        lines.push(format!("Overall Compliance: {}%", self.overall_compliance));
        lines.push(format!(
            "Passed Rules: {}/{}",
            self.passed_rules, self.total_rules
        ));

        if self.critical_failures > 0 {
            lines.push(format!("CRITICAL FAILURES: {}", self.critical_failures));
        }
        if self.failed_rules > 0 {
            lines.push(format!("Failed Rules: {}", self.failed_rules));
        }

        if !self.recommendations.is_empty() {
            lines.push(String::new());
            lines.push("Recommendations:".to_string());
            for (index, recommendation) in self.recommendations.iter().enumerate() {
                lines.push(format!("{}. {recommendation}", index + 1));
            }
        }

        lines.join("\n")
    }
}

/// Risk bucket derived from the weighted score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Buckets a 0–100 risk score: low(≤20), medium(≤50), high(≤80),
    /// critical(>80).
    pub fn from_score(score: f64) -> Self {
        if score <= 20.0 {
            RiskLevel::Low
        } else if score <= 50.0 {
            RiskLevel::Medium
        } else if score <= 80.0 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }
}

/// Full report plus normalized risk scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub report: ComplianceReport,
    /// `Σ(severity weight of failed rules) / (rule count × 8) × 100`.
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    /// Up to 5 recommendations drawn from failed critical/high rules.
    pub priority_recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0.0, RiskLevel::Low)]
    #[test_case(20.0, RiskLevel::Low)]
    #[test_case(20.1, RiskLevel::Medium)]
    #[test_case(50.0, RiskLevel::Medium)]
    #[test_case(64.9, RiskLevel::High)]
    #[test_case(80.0, RiskLevel::High)]
    #[test_case(80.1, RiskLevel::Critical)]
    #[test_case(100.0, RiskLevel::Critical)]
    fn test_risk_buckets(score: f64, expected: RiskLevel) {
        assert_eq!(RiskLevel::from_score(score), expected);
    }

    #[test]
    fn test_summary_rendering() {
        let report = ComplianceReport {
            overall_compliance: 50,
            total_rules: 2,
            passed_rules: 1,
            failed_rules: 1,
            critical_failures: 1,
            timestamp: DateTime::UNIX_EPOCH,
            rule_results: vec![],
            recommendations: vec!["Enable audit logging".to_string()],
        };

        let summary = report.summary();
        assert!(summary.contains("Overall Compliance: 50%"));
        assert!(summary.contains("Passed Rules: 1/2"));
        assert!(summary.contains("CRITICAL FAILURES: 1"));
        assert!(summary.contains("1. Enable audit logging"));
    }
}
