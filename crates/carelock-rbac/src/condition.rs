//! Permission conditions.
//!
//! A condition is a typed (field path, operator, value) triple evaluated
//! against the access context's key-value view: dotted paths descend into
//! the data payload, plain names fall back to the environment bag.
//!
//! `patientId == "self"` is a synthetic alias meaning "the resource owner
//! is the acting user": the comparison value is substituted with the
//! acting user id and the owner is read from the payload's `patientId`
//! (or the target resource id).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use carelock_types::AccessContext;

/// Comparison operator for a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    In,
    NotIn,
}

/// A single permission condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Dot-addressable field path into the context data.
    pub field: String,
    pub operator: ConditionOperator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Shorthand for the `patientId == self` ownership alias.
    pub fn self_patient() -> Self {
        Self::new("patientId", ConditionOperator::Equals, Value::String("self".into()))
    }

    /// Evaluates this condition against a context.
    pub fn evaluate(&self, ctx: &AccessContext) -> bool {
        // Ownership alias: compare the resource owner to the acting user.
        // Owner references may be bare ids or `Patient/<id>` form.
        if self.is_self_alias() {
            let owner = self.owner_value(ctx);
            let matches = owner.is_some_and(|owner| {
                owner == Value::String(ctx.actor.id.to_string())
                    || owner == Value::String(format!("Patient/{}", ctx.actor.id))
            });
            return match self.operator {
                ConditionOperator::Equals => matches,
                ConditionOperator::NotEquals => !matches,
                _ => false,
            };
        }

        let actual = ctx.lookup(&self.field);
        apply(self.operator, actual.as_ref(), &self.value)
    }

    fn is_self_alias(&self) -> bool {
        self.value == Value::String("self".into())
    }

    /// Resolves the owner the alias compares against: the addressed field,
    /// falling back to the target resource id for `patientId`.
    fn owner_value(&self, ctx: &AccessContext) -> Option<Value> {
        let from_field = ctx.lookup(&self.field);
        if self.field == "patientId" {
            return from_field.or_else(|| ctx.resource_id.clone().map(Value::String));
        }
        from_field
    }
}

fn apply(operator: ConditionOperator, actual: Option<&Value>, expected: &Value) -> bool {
    match operator {
        ConditionOperator::Equals => actual == Some(expected),
        ConditionOperator::NotEquals => actual != Some(expected),
        ConditionOperator::Contains => match (actual, expected) {
            (Some(Value::String(haystack)), Value::String(needle)) => haystack.contains(needle),
            _ => false,
        },
        ConditionOperator::In => match (actual, expected) {
            (Some(actual), Value::Array(options)) => options.contains(actual),
            _ => false,
        },
        // A missing value is trivially "not in" the list.
        ConditionOperator::NotIn => match expected {
            Value::Array(options) => actual.is_none_or(|actual| !options.contains(actual)),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelock_types::{Action, Actor, Environment};
    use serde_json::json;
    use test_case::test_case;

    fn ctx() -> AccessContext {
        AccessContext::new(Actor::new("u-42", "pharmacist"), "Patient", Action::Read)
            .with_data(json!({
                "accessReason": "medication_dispensing",
                "dataType": "demographics",
                "subject": {"reference": "Patient/u-42"},
            }))
            .with_environment(Environment::default().with_extra("shift", json!("night")))
    }

    #[test_case(ConditionOperator::Equals, json!("medication_dispensing"), true ; "equals hit")]
    #[test_case(ConditionOperator::Equals, json!("lab_testing"), false ; "equals miss")]
    #[test_case(ConditionOperator::NotEquals, json!("lab_testing"), true ; "not equals hit")]
    #[test_case(ConditionOperator::Contains, json!("dispensing"), true ; "contains hit")]
    #[test_case(ConditionOperator::Contains, json!("surgery"), false ; "contains miss")]
    fn test_operators_on_access_reason(
        operator: ConditionOperator,
        value: Value,
        expected: bool,
    ) {
        let condition = Condition::new("accessReason", operator, value);
        assert_eq!(condition.evaluate(&ctx()), expected);
    }

    #[test]
    fn test_in_and_not_in() {
        let inside = Condition::new(
            "dataType",
            ConditionOperator::In,
            json!(["demographics", "contact", "insurance"]),
        );
        assert!(inside.evaluate(&ctx()));

        let outside = Condition::new(
            "dataType",
            ConditionOperator::NotIn,
            json!(["clinical", "labs"]),
        );
        assert!(outside.evaluate(&ctx()));

        // Missing field: In fails, NotIn holds.
        let missing_in =
            Condition::new("missing", ConditionOperator::In, json!(["anything"]));
        assert!(!missing_in.evaluate(&ctx()));
        let missing_not_in =
            Condition::new("missing", ConditionOperator::NotIn, json!(["anything"]));
        assert!(missing_not_in.evaluate(&ctx()));
    }

    #[test]
    fn test_dotted_path() {
        let condition = Condition::new(
            "subject.reference",
            ConditionOperator::Equals,
            json!("Patient/u-42"),
        );
        assert!(condition.evaluate(&ctx()));
    }

    #[test]
    fn test_environment_fallback() {
        let condition = Condition::new("shift", ConditionOperator::Equals, json!("night"));
        assert!(condition.evaluate(&ctx()));
    }

    #[test]
    fn test_self_alias_matches_owner() {
        let condition = Condition::self_patient();

        let own = AccessContext::new(Actor::new("p-1", "patient"), "Patient", Action::Read)
            .with_data(json!({"patientId": "p-1"}));
        assert!(condition.evaluate(&own));

        let other = AccessContext::new(Actor::new("p-1", "patient"), "Patient", Action::Read)
            .with_data(json!({"patientId": "p-2"}));
        assert!(!condition.evaluate(&other));
    }

    #[test]
    fn test_self_alias_falls_back_to_resource_id() {
        let condition = Condition::self_patient();

        let ctx = AccessContext::new(Actor::new("p-1", "patient"), "Patient", Action::Read)
            .with_resource_id("p-1");
        assert!(condition.evaluate(&ctx));

        let ctx = AccessContext::new(Actor::new("p-1", "patient"), "Patient", Action::Read)
            .with_resource_id("p-9");
        assert!(!condition.evaluate(&ctx));
    }

    #[test]
    fn test_self_alias_on_subject_reference() {
        let condition = Condition::new(
            "subject.reference",
            ConditionOperator::Equals,
            json!("self"),
        );

        let own = AccessContext::new(Actor::new("u-42", "patient"), "Observation", Action::Read)
            .with_data(json!({"subject": {"reference": "Patient/u-42"}}));
        assert!(condition.evaluate(&own));

        let other = AccessContext::new(Actor::new("u-42", "patient"), "Observation", Action::Read)
            .with_data(json!({"subject": {"reference": "Patient/u-99"}}));
        assert!(!condition.evaluate(&other));

        // Missing owner fails closed.
        let missing =
            AccessContext::new(Actor::new("u-42", "patient"), "Observation", Action::Read);
        assert!(!condition.evaluate(&missing));
    }
}
