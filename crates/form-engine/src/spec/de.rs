//! Lenient decoders for REST payloads where numeric columns may arrive as
//! numbers, numeric strings or empty strings.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::expr::ConditionOperator;

fn number_from(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok().filter(|parsed| parsed.is_finite())
            }
        }
        _ => None,
    }
}

/// `Option<f64>` from a number, numeric string, empty string or null.
pub fn optional_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from))
}

/// `Option<usize>` from a non-negative integer or integer string.
pub fn optional_usize<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(number_from)
        .filter(|number| *number >= 0.0)
        .map(|number| number as usize))
}

/// Sort key: numeric strings parse to integers, anything unparsable sorts as 0.
pub fn order<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(number_from)
        .map(|number| number.trunc() as i64)
        .unwrap_or(0))
}

/// Optional string that treats `""` as absent.
pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) if !text.is_empty() => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    })
}

/// Optional string that keeps `""`; scalars are stringified.
pub fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    })
}

/// Condition operator where `""` and null fall back to the default.
pub fn operator<'de, D>(deserializer: D) -> Result<Option<ConditionOperator>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(other) => ConditionOperator::deserialize(other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "super::optional_f64")]
        number: Option<f64>,
        #[serde(default, deserialize_with = "super::optional_usize")]
        length: Option<usize>,
        #[serde(default, deserialize_with = "super::order")]
        order: i64,
    }

    #[test]
    fn accepts_numeric_strings_and_blanks() {
        let probe: Probe =
            serde_json::from_value(json!({"number": "2.5", "length": "", "order": "7"}))
                .expect("decode");
        assert_eq!(probe.number, Some(2.5));
        assert_eq!(probe.length, None);
        assert_eq!(probe.order, 7);
    }

    #[test]
    fn missing_order_sorts_first() {
        let probe: Probe = serde_json::from_value(json!({"order": "abc"})).expect("decode");
        assert_eq!(probe.order, 0);
        assert_eq!(probe.number, None);
    }
}
