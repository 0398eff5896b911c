use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The value held by one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
    Null,
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Null, empty string and empty list count as "no answer".
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Bool(_) | FieldValue::Number(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Converts an arbitrary JSON value without field-type knowledge.
    /// Arrays keep only their scalar members, stringified.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(flag) => FieldValue::Bool(*flag),
            Value::Number(number) => number
                .as_f64()
                .map(FieldValue::Number)
                .unwrap_or(FieldValue::Null),
            Value::String(text) => FieldValue::Text(text.clone()),
            Value::Array(items) => FieldValue::List(
                items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(text) => Some(text.clone()),
                        Value::Number(number) => Some(number.to_string()),
                        Value::Bool(flag) => Some(flag.to_string()),
                        _ => None,
                    })
                    .collect(),
            ),
            Value::Object(_) => FieldValue::Text(value.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Display form used by text renderers.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::List(items) => items.join(", "),
            other => js_string(Some(other)),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

/// ECMAScript `String(x)` for the shapes a field can hold; `None` is `undefined`.
pub fn js_string(value: Option<&FieldValue>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(FieldValue::Null) => "null".to_string(),
        Some(FieldValue::Bool(flag)) => flag.to_string(),
        Some(FieldValue::Number(number)) => format_number(*number),
        Some(FieldValue::Text(text)) => text.clone(),
        Some(FieldValue::List(items)) => items.join(","),
    }
}

/// ECMAScript `Number(x)`; `None` is `undefined` and yields NaN.
pub fn js_number(value: Option<&FieldValue>) -> f64 {
    match value {
        None => f64::NAN,
        Some(FieldValue::Null) => 0.0,
        Some(FieldValue::Bool(flag)) => {
            if *flag {
                1.0
            } else {
                0.0
            }
        }
        Some(FieldValue::Number(number)) => *number,
        Some(FieldValue::Text(text)) => parse_js_number(text),
        Some(FieldValue::List(items)) => match items.as_slice() {
            [] => 0.0,
            [single] => parse_js_number(single),
            _ => f64::NAN,
        },
    }
}

/// ECMAScript string-to-number conversion: blank is 0, junk is NaN.
pub fn parse_js_number(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .map(|number| number as f64)
            .unwrap_or(f64::NAN);
    }
    let lowered = trimmed.to_ascii_lowercase();
    if lowered.contains("inf") || lowered.contains("nan") {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Formats a number the way ECMAScript prints it for common magnitudes.
pub fn format_number(number: f64) -> String {
    if number.is_nan() {
        "NaN".to_string()
    } else if number.is_infinite() {
        if number > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if number == number.trunc() && number.abs() < 1e21 {
        format!("{:.0}", number + 0.0)
    } else {
        number.to_string()
    }
}

/// Field key to current value for one editing session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ValueStore {
    values: BTreeMap<String, FieldValue>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field_key: &str) -> Option<&FieldValue> {
        self.values.get(field_key)
    }

    pub fn contains_key(&self, field_key: &str) -> bool {
        self.values.contains_key(field_key)
    }

    /// Stores `value`, returning the previous one.
    pub fn set(&mut self, field_key: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.values.insert(field_key.into(), value.into())
    }

    pub fn remove(&mut self, field_key: &str) -> Option<FieldValue> {
        self.values.remove(field_key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for ValueStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Signature field key (the signer role) to encoded raster payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SignatureStore {
    signatures: BTreeMap<String, String>,
}

impl SignatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, signer_role: &str) -> Option<&str> {
        self.signatures.get(signer_role).map(String::as_str)
    }

    pub fn contains(&self, signer_role: &str) -> bool {
        self.signatures.contains_key(signer_role)
    }

    pub fn insert(&mut self, signer_role: impl Into<String>, payload: impl Into<String>) -> Option<String> {
        self.signatures.insert(signer_role.into(), payload.into())
    }

    pub fn remove(&mut self, signer_role: &str) -> Option<String> {
        self.signatures.remove(signer_role)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.signatures.iter()
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_coercion_matches_ecmascript() {
        assert_eq!(js_string(None), "undefined");
        assert_eq!(js_string(Some(&FieldValue::Null)), "null");
        assert_eq!(js_string(Some(&FieldValue::Bool(true))), "true");
        assert_eq!(js_string(Some(&FieldValue::Number(5.0))), "5");
        assert_eq!(js_string(Some(&FieldValue::Number(2.5))), "2.5");
        assert_eq!(
            js_string(Some(&FieldValue::List(vec!["a".into(), "b".into()]))),
            "a,b"
        );
    }

    #[test]
    fn number_coercion_matches_ecmascript() {
        assert!(js_number(None).is_nan());
        assert_eq!(js_number(Some(&FieldValue::Null)), 0.0);
        assert_eq!(js_number(Some(&FieldValue::text(" 42 "))), 42.0);
        assert_eq!(js_number(Some(&FieldValue::text(""))), 0.0);
        assert_eq!(js_number(Some(&FieldValue::text("0x10"))), 16.0);
        assert!(js_number(Some(&FieldValue::text("inf"))).is_nan());
        assert!(js_number(Some(&FieldValue::text("12abc"))).is_nan());
        assert_eq!(js_number(Some(&FieldValue::text("Infinity"))), f64::INFINITY);
    }

    #[test]
    fn field_values_decode_untagged() {
        let store: ValueStore = serde_json::from_value(json!({
            "a": "x",
            "b": 5,
            "c": true,
            "d": ["one", "two"],
            "e": null
        }))
        .expect("decode store");
        assert_eq!(store.get("a"), Some(&FieldValue::text("x")));
        assert_eq!(store.get("b"), Some(&FieldValue::Number(5.0)));
        assert_eq!(store.get("c"), Some(&FieldValue::Bool(true)));
        assert_eq!(
            store.get("d"),
            Some(&FieldValue::List(vec!["one".into(), "two".into()]))
        );
        assert_eq!(store.get("e"), Some(&FieldValue::Null));
    }

    #[test]
    fn blank_values() {
        assert!(FieldValue::Null.is_blank());
        assert!(FieldValue::text("").is_blank());
        assert!(FieldValue::List(vec![]).is_blank());
        assert!(!FieldValue::Bool(false).is_blank());
        assert!(!FieldValue::Number(0.0).is_blank());
    }
}
