//! The compliance engine: rule registry and evaluation modes.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, error, info};

use carelock_types::{AccessContext, Clock, SystemClock};

use crate::builtin::{PhiFieldLookup, builtin_rules};
use crate::report::{ComplianceReport, RiskAssessment, RiskLevel, RuleResult};
use crate::rule::{RuleInfo, Severity, ValidationRule};

/// Result of the latency-sensitive critical-rule gate.
#[derive(Debug, Clone)]
pub struct QuickValidation {
    pub passed: bool,
    pub critical_failures: usize,
    pub failed_rules: Vec<String>,
    pub timings: Vec<RuleTiming>,
}

/// Per-rule wall-clock timing from quick validation.
#[derive(Debug, Clone)]
pub struct RuleTiming {
    pub rule_id: String,
    pub elapsed: Duration,
}

/// Rule registry statistics.
#[derive(Debug, Clone, Default)]
pub struct ComplianceStats {
    pub total_rules: usize,
    pub rules_by_category: HashMap<String, usize>,
    pub rules_by_severity: HashMap<String, usize>,
    pub required_rules: usize,
}

/// Owns the validation rule registry and runs evaluations against it.
///
/// Rule ids are unique; registering a duplicate id overwrites the previous
/// rule (last-write-wins). Registration order is preserved and determines
/// evaluation and recommendation-aggregation order.
pub struct ComplianceEngine {
    rules: RwLock<IndexMap<String, ValidationRule>>,
    clock: Arc<dyn Clock>,
}

impl ComplianceEngine {
    /// Creates an engine with an empty registry.
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(IndexMap::new()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Creates an engine preloaded with the builtin HIPAA rule catalog.
    /// PHI-awareness flows through the injected lookup only.
    pub fn with_builtin_rules(phi: Arc<dyn PhiFieldLookup>) -> Self {
        let engine = Self::new();
        {
            let mut rules = engine.rules.write().expect("rule registry lock poisoned");
            for rule in builtin_rules(phi) {
                rules.insert(rule.id.clone(), rule);
            }
            info!(rule_count = rules.len(), "compliance validation rules initialized");
        }
        engine
    }

    /// Injects the clock used for report timestamps.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Adds or replaces a rule (last-write-wins on the id).
    pub fn add_rule(&self, rule: ValidationRule) {
        let mut rules = self.rules.write().expect("rule registry lock poisoned");
        let replaced = rules.insert(rule.id.clone(), rule.clone()).is_some();
        debug!(rule_id = %rule.id, rule_name = %rule.name, replaced, "validation rule registered");
    }

    /// Removes a rule. Returns whether it existed.
    pub fn remove_rule(&self, rule_id: &str) -> bool {
        let mut rules = self.rules.write().expect("rule registry lock poisoned");
        let removed = rules.shift_remove(rule_id).is_some();
        if removed {
            debug!(rule_id, "validation rule removed");
        }
        removed
    }

    /// Metadata for one rule.
    pub fn rule(&self, rule_id: &str) -> Option<RuleInfo> {
        self.rules
            .read()
            .expect("rule registry lock poisoned")
            .get(rule_id)
            .map(ValidationRule::info)
    }

    /// Metadata for every registered rule, in registration order.
    pub fn list_rules(&self) -> Vec<RuleInfo> {
        self.rules
            .read()
            .expect("rule registry lock poisoned")
            .values()
            .map(ValidationRule::info)
            .collect()
    }

    /// Runs every registered rule sequentially and builds the weighted
    /// report. Rule evaluation faults never abort the batch.
    pub fn validate_compliance(&self, ctx: &AccessContext) -> ComplianceReport {
        let started = Instant::now();
        let rules = self.snapshot(|_| true);
        let results: Vec<RuleResult> = rules.iter().map(|rule| execute(rule, ctx)).collect();
        let report = self.build_report(results);

        info!(
            overall_compliance = report.overall_compliance,
            passed_rules = report.passed_rules,
            failed_rules = report.failed_rules,
            critical_failures = report.critical_failures,
            validation_ms = started.elapsed().as_millis() as u64,
            "compliance validation completed"
        );
        report
    }

    /// Same computation restricted to one safeguard category. Works on a
    /// snapshot: the live registry is never mutated, even transiently, so
    /// concurrent callers always observe the full rule set.
    pub fn validate_category(
        &self,
        ctx: &AccessContext,
        category: crate::SafeguardCategory,
    ) -> ComplianceReport {
        let rules = self.snapshot(|rule| rule.category == category);
        let results: Vec<RuleResult> = rules.iter().map(|rule| execute(rule, ctx)).collect();
        self.build_report(results)
    }

    /// Latency-sensitive gate: evaluates only rules that are both
    /// critical-severity and required, in parallel, with per-rule timing.
    pub fn quick_validation(&self, ctx: &AccessContext) -> QuickValidation {
        let rules = self.snapshot(|rule| rule.severity == Severity::Critical && rule.required);

        let evaluated: Vec<(RuleResult, RuleTiming)> = rules
            .par_iter()
            .map(|rule| {
                let started = Instant::now();
                let result = execute(rule, ctx);
                let timing = RuleTiming {
                    rule_id: rule.id.clone(),
                    elapsed: started.elapsed(),
                };
                (result, timing)
            })
            .collect();

        let failed_rules: Vec<String> = evaluated
            .iter()
            .filter(|(result, _)| !result.passed)
            .map(|(result, _)| result.rule_id.clone())
            .collect();

        QuickValidation {
            passed: failed_rules.is_empty(),
            critical_failures: failed_rules.len(),
            failed_rules,
            timings: evaluated.into_iter().map(|(_, timing)| timing).collect(),
        }
    }

    /// Full report plus a normalized 0–100 risk score.
    pub fn advanced_validation(&self, ctx: &AccessContext) -> RiskAssessment {
        let report = self.validate_compliance(ctx);

        let failed_weight: u32 = report
            .rule_results
            .iter()
            .filter(|result| !result.passed)
            .map(|result| result.severity.weight())
            .sum();

        let risk_score = if report.total_rules == 0 {
            0.0
        } else {
            f64::from(failed_weight) / (report.total_rules as f64 * 8.0) * 100.0
        };

        let mut priority_recommendations = Vec::new();
        for result in &report.rule_results {
            if result.passed
                || !matches!(result.severity, Severity::Critical | Severity::High)
            {
                continue;
            }
            for recommendation in &result.recommendations {
                if !priority_recommendations.contains(recommendation) {
                    priority_recommendations.push(recommendation.clone());
                }
                if priority_recommendations.len() == 5 {
                    break;
                }
            }
            if priority_recommendations.len() == 5 {
                break;
            }
        }

        RiskAssessment {
            risk_level: RiskLevel::from_score(risk_score),
            risk_score,
            report,
            priority_recommendations,
        }
    }

    /// Registry statistics.
    pub fn stats(&self) -> ComplianceStats {
        let rules = self.rules.read().expect("rule registry lock poisoned");
        let mut stats = ComplianceStats {
            total_rules: rules.len(),
            ..ComplianceStats::default()
        };

        for rule in rules.values() {
            *stats
                .rules_by_category
                .entry(rule.category.as_str().to_string())
                .or_default() += 1;
            *stats
                .rules_by_severity
                .entry(rule.severity.as_str().to_string())
                .or_default() += 1;
            if rule.required {
                stats.required_rules += 1;
            }
        }
        stats
    }

    /// Clones matching rules out of the registry so evaluation never holds
    /// the lock.
    fn snapshot(&self, keep: impl Fn(&ValidationRule) -> bool) -> Vec<ValidationRule> {
        self.rules
            .read()
            .expect("rule registry lock poisoned")
            .values()
            .filter(|rule| keep(rule))
            .cloned()
            .collect()
    }

    fn build_report(&self, results: Vec<RuleResult>) -> ComplianceReport {
        let total_rules = results.len();
        let passed_rules = results.iter().filter(|r| r.passed).count();
        let failed_rules = total_rules - passed_rules;
        let critical_failures = results
            .iter()
            .filter(|r| !r.passed && r.severity == Severity::Critical)
            .count();

        let mut recommendations: Vec<String> = Vec::new();
        for result in results.iter().filter(|r| !r.passed) {
            for recommendation in &result.recommendations {
                if !recommendations.contains(recommendation) {
                    recommendations.push(recommendation.clone());
                }
            }
        }

        let overall_compliance = if total_rules == 0 {
            100
        } else {
            (passed_rules as f64 / total_rules as f64 * 100.0).round() as u8
        };

        ComplianceReport {
            overall_compliance,
            total_rules,
            passed_rules,
            failed_rules,
            critical_failures,
            timestamp: self.clock.now(),
            rule_results: results,
            recommendations,
        }
    }
}

impl Default for ComplianceEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Executes one rule, folding check errors into a failed result so the
/// batch always completes.
fn execute(rule: &ValidationRule, ctx: &AccessContext) -> RuleResult {
    match (rule.check)(ctx) {
        Ok(outcome) => RuleResult {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            category: rule.category,
            severity: rule.severity,
            passed: outcome.passed,
            message: outcome.message,
            recommendations: outcome.recommendations,
        },
        Err(fault) => {
            error!(rule_id = %rule.id, %fault, "validation rule execution failed");
            RuleResult {
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                category: rule.category,
                severity: rule.severity,
                passed: false,
                message: format!("rule execution failed: {fault}"),
                recommendations: vec!["Review and fix validation rule implementation".to_string()],
            }
        }
    }
}
