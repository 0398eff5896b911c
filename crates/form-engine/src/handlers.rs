//! Per-type strategies selected by [`FieldType`]. Each handler turns raw
//! host input into a [`FieldValue`] and applies the checks specific to its
//! kind; the checks shared by every kind live in [`crate::validate`].

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::spec::field::{FieldDefinition, FieldType};
use crate::value::{FieldValue, format_number, parse_js_number};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

pub const INVALID_EMAIL: &str = "Please enter a valid email address";

pub trait FieldHandler: Send + Sync {
    /// Type-specific check for a present, non-blank value.
    fn validate(&self, field: &FieldDefinition, value: &FieldValue) -> Option<String>;

    /// Converts raw host input into the value stored for this kind.
    fn normalize(&self, field: &FieldDefinition, raw: &Value) -> FieldValue;
}

impl FieldType {
    pub fn handler(&self) -> &'static dyn FieldHandler {
        static TEXT: TextHandler = TextHandler;
        static EMAIL_HANDLER: EmailHandler = EmailHandler;
        static NUMBER: NumberHandler = NumberHandler;
        static YES_NO: YesNoHandler = YesNoHandler;
        static CHECKBOX: CheckboxHandler = CheckboxHandler;
        static CHOICE: ChoiceHandler = ChoiceHandler;
        static MULTI_CHOICE: MultiChoiceHandler = MultiChoiceHandler;
        static RATING: RatingHandler = RatingHandler;
        static SLIDER: SliderHandler = SliderHandler;
        static NO_VALUE: NoValueHandler = NoValueHandler;

        match self {
            FieldType::Text
            | FieldType::Textarea
            | FieldType::Date
            | FieldType::Time
            | FieldType::Datetime
            | FieldType::File
            | FieldType::Image
            | FieldType::Video
            | FieldType::Audio
            | FieldType::Location => &TEXT,
            FieldType::Email => &EMAIL_HANDLER,
            FieldType::Number => &NUMBER,
            FieldType::YesNo => &YES_NO,
            FieldType::Checkbox => &CHECKBOX,
            FieldType::Radio | FieldType::Select => &CHOICE,
            FieldType::Multiselect => &MULTI_CHOICE,
            FieldType::Rating => &RATING,
            FieldType::Slider => &SLIDER,
            FieldType::Signature | FieldType::SectionHeader | FieldType::Paragraph => &NO_VALUE,
        }
    }
}

fn scalar_text(raw: &Value) -> FieldValue {
    match raw {
        Value::Null => FieldValue::Null,
        Value::String(text) => FieldValue::Text(text.clone()),
        Value::Number(number) => FieldValue::Text(number.to_string()),
        Value::Bool(flag) => FieldValue::Text(flag.to_string()),
        other => FieldValue::from_json(other),
    }
}

fn numeric(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(number) => number.as_f64(),
        Value::String(text) if !text.trim().is_empty() => {
            Some(parse_js_number(text)).filter(|number| number.is_finite())
        }
        _ => None,
    }
}

/// Free text and the kinds stored as plain strings (dates, media URLs, locations).
pub struct TextHandler;

impl FieldHandler for TextHandler {
    fn validate(&self, _field: &FieldDefinition, _value: &FieldValue) -> Option<String> {
        None
    }

    fn normalize(&self, _field: &FieldDefinition, raw: &Value) -> FieldValue {
        scalar_text(raw)
    }
}

pub struct EmailHandler;

impl FieldHandler for EmailHandler {
    fn validate(&self, _field: &FieldDefinition, value: &FieldValue) -> Option<String> {
        match value.as_str() {
            Some(text) if !EMAIL.is_match(text) => Some(INVALID_EMAIL.to_string()),
            _ => None,
        }
    }

    fn normalize(&self, _field: &FieldDefinition, raw: &Value) -> FieldValue {
        match scalar_text(raw) {
            FieldValue::Text(text) => FieldValue::Text(text.trim().to_string()),
            other => other,
        }
    }
}

pub struct NumberHandler;

impl FieldHandler for NumberHandler {
    fn validate(&self, field: &FieldDefinition, value: &FieldValue) -> Option<String> {
        let number = match value {
            FieldValue::Number(number) => *number,
            FieldValue::Text(text) => parse_js_number(text),
            _ => f64::NAN,
        };
        if number.is_nan() {
            return Some(format!("{} must be a valid number", field.label));
        }
        if let Some(min) = field.min_value
            && number < min
        {
            return Some(format!("{} must be at least {}", field.label, format_number(min)));
        }
        if let Some(max) = field.max_value
            && number > max
        {
            return Some(format!(
                "{} must be no more than {}",
                field.label,
                format_number(max)
            ));
        }
        None
    }

    /// Parseable input becomes a number; anything else is kept verbatim so
    /// validation can report it.
    fn normalize(&self, _field: &FieldDefinition, raw: &Value) -> FieldValue {
        match numeric(raw) {
            Some(number) => FieldValue::Number(number),
            None => scalar_text(raw),
        }
    }
}

pub struct YesNoHandler;

impl FieldHandler for YesNoHandler {
    fn validate(&self, _field: &FieldDefinition, _value: &FieldValue) -> Option<String> {
        None
    }

    fn normalize(&self, _field: &FieldDefinition, raw: &Value) -> FieldValue {
        match raw {
            Value::Bool(true) => FieldValue::text("yes"),
            Value::Bool(false) => FieldValue::text("no"),
            other => scalar_text(other),
        }
    }
}

/// Single checkboxes hold a boolean; checkbox groups with options hold a list.
pub struct CheckboxHandler;

impl FieldHandler for CheckboxHandler {
    fn validate(&self, field: &FieldDefinition, value: &FieldValue) -> Option<String> {
        MultiChoiceHandler.validate(field, value)
    }

    fn normalize(&self, field: &FieldDefinition, raw: &Value) -> FieldValue {
        match raw {
            Value::Bool(flag) => FieldValue::Bool(*flag),
            Value::Array(_) => MultiChoiceHandler.normalize(field, raw),
            Value::String(text) => FieldValue::Bool(matches!(
                text.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "on" | "1"
            )),
            Value::Number(number) => FieldValue::Bool(number.as_f64().is_some_and(|n| n != 0.0)),
            _ => FieldValue::Bool(false),
        }
    }
}

/// Radio buttons and dropdowns: exactly one option value.
pub struct ChoiceHandler;

impl FieldHandler for ChoiceHandler {
    fn validate(&self, field: &FieldDefinition, value: &FieldValue) -> Option<String> {
        match value.as_str() {
            Some(text) if !field.options.is_empty() && !field.has_option(text) => {
                Some(format!("{} has an invalid selection", field.label))
            }
            _ => None,
        }
    }

    fn normalize(&self, _field: &FieldDefinition, raw: &Value) -> FieldValue {
        scalar_text(raw)
    }
}

pub struct MultiChoiceHandler;

impl FieldHandler for MultiChoiceHandler {
    fn validate(&self, field: &FieldDefinition, value: &FieldValue) -> Option<String> {
        let items = value.as_list()?;
        if field.options.is_empty() {
            return None;
        }
        items
            .iter()
            .any(|item| !field.has_option(item))
            .then(|| format!("{} has an invalid selection", field.label))
    }

    fn normalize(&self, _field: &FieldDefinition, raw: &Value) -> FieldValue {
        let mut items: Vec<String> = Vec::new();
        let mut push = |item: String| {
            if !item.is_empty() && !items.contains(&item) {
                items.push(item);
            }
        };
        match raw {
            Value::Array(values) => {
                for value in values {
                    if let FieldValue::Text(text) = scalar_text(value) {
                        push(text);
                    }
                }
            }
            Value::String(text) => push(text.clone()),
            Value::Number(number) => push(number.to_string()),
            _ => {}
        }
        FieldValue::List(items)
    }
}

pub struct RatingHandler;

impl FieldHandler for RatingHandler {
    fn validate(&self, field: &FieldDefinition, value: &FieldValue) -> Option<String> {
        let max = field.rating().max;
        let rating = value.as_f64()?;
        if rating < 1.0 || rating > f64::from(max) {
            Some(format!("{} must be between 1 and {}", field.label, max))
        } else {
            None
        }
    }

    fn normalize(&self, _field: &FieldDefinition, raw: &Value) -> FieldValue {
        numeric(raw)
            .map(|number| FieldValue::Number(number.round()))
            .unwrap_or(FieldValue::Null)
    }
}

pub struct SliderHandler;

impl FieldHandler for SliderHandler {
    fn validate(&self, field: &FieldDefinition, value: &FieldValue) -> Option<String> {
        let slider = field.slider();
        let position = value.as_f64()?;
        if position < slider.min || position > slider.max {
            Some(format!(
                "{} must be between {} and {}",
                field.label,
                format_number(slider.min),
                format_number(slider.max)
            ))
        } else {
            None
        }
    }

    fn normalize(&self, _field: &FieldDefinition, raw: &Value) -> FieldValue {
        numeric(raw)
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Null)
    }
}

/// Signatures (held in the signature store) and layout-only kinds.
pub struct NoValueHandler;

impl FieldHandler for NoValueHandler {
    fn validate(&self, _field: &FieldDefinition, _value: &FieldValue) -> Option<String> {
        None
    }

    fn normalize(&self, _field: &FieldDefinition, _raw: &Value) -> FieldValue {
        FieldValue::Null
    }
}
