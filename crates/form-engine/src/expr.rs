use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::value::{FieldValue, ValueStore, js_number, js_string};

/// Comparison applied by a visibility rule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    #[default]
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    /// Any operator this engine does not know; such rules never hide a field.
    #[serde(other)]
    Unknown,
}

/// Visibility rule `{field, operator, value}` over another field's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Condition {
    pub field: String,
    #[serde(default)]
    pub operator: ConditionOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: Some(value.into()),
        }
    }

    /// Evaluates the rule against the store. Pure; safe to call on every keystroke.
    pub fn evaluate(&self, store: &ValueStore) -> bool {
        let actual = store.get(&self.field);
        let target = self.value.as_deref();
        match self.operator {
            ConditionOperator::Equals => loosely_equal(actual, target),
            ConditionOperator::NotEquals => !loosely_equal(actual, target),
            ConditionOperator::Contains => {
                let haystack = match actual {
                    None | Some(FieldValue::Null) => String::new(),
                    Some(value) => js_string(Some(value)),
                };
                haystack.contains(target.unwrap_or(""))
            }
            ConditionOperator::GreaterThan => js_number(actual) > target_number(target),
            ConditionOperator::LessThan => js_number(actual) < target_number(target),
            ConditionOperator::Unknown => true,
        }
    }
}

/// Strict equality against the configured string, or equality of the
/// stringified stored value. Both must fail for `not_equals` to hold.
fn loosely_equal(actual: Option<&FieldValue>, target: Option<&str>) -> bool {
    let strict = match (actual, target) {
        (None, None) => true,
        (Some(FieldValue::Text(text)), Some(target)) => text == target,
        _ => false,
    };
    strict || target.is_some_and(|target| js_string(actual) == target)
}

fn target_number(target: Option<&str>) -> f64 {
    match target {
        Some(text) => crate::value::parse_js_number(text),
        None => f64::NAN,
    }
}
