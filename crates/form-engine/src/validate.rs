use std::collections::BTreeMap;

use regex::Regex;
use tracing::debug;

use crate::spec::field::FieldDefinition;
use crate::value::{FieldValue, SignatureStore, ValueStore};
use crate::visibility::is_visible;

/// Field key to the message shown beside that field.
pub type ErrorMap = BTreeMap<String, String>;

/// The two stores a validation pass reads.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub values: &'a ValueStore,
    pub signatures: &'a SignatureStore,
}

impl<'a> ValidationContext<'a> {
    pub fn new(values: &'a ValueStore, signatures: &'a SignatureStore) -> Self {
        Self { values, signatures }
    }
}

/// Validates one field. Hidden fields are exempt from every rule.
pub fn validate_field(field: &FieldDefinition, ctx: ValidationContext<'_>) -> Option<String> {
    if !is_visible(field, ctx.values) || field.field_type.is_display_only() {
        return None;
    }
    if field.field_type.is_signature() {
        return (field.is_required() && !ctx.signatures.contains(&field.field_key))
            .then(|| required_message(field));
    }
    check_value(field, ctx.values.get(&field.field_key))
}

/// Applies the value rules to a visible, non-signature field: required,
/// then string constraints, then the type handler. First failure wins.
pub fn check_value(field: &FieldDefinition, value: Option<&FieldValue>) -> Option<String> {
    let Some(value) = value.filter(|value| !value.is_blank()) else {
        return field.is_required().then(|| required_message(field));
    };

    if let FieldValue::Text(text) = value
        && let Some(error) = enforce_string_constraints(field, text)
    {
        return Some(error);
    }

    field.field_type.handler().validate(field, value)
}

/// Validates every visible field. The result replaces any previous map.
pub fn validate_all(
    fields: &[FieldDefinition],
    values: &ValueStore,
    signatures: &SignatureStore,
) -> ErrorMap {
    let ctx = ValidationContext::new(values, signatures);
    let errors: ErrorMap = fields
        .iter()
        .filter_map(|field| {
            validate_field(field, ctx).map(|message| (field.field_key.clone(), message))
        })
        .collect();
    debug!(error_count = errors.len(), "validated form");
    errors
}

pub fn required_message(field: &FieldDefinition) -> String {
    format!("{} is required", field.label)
}

fn enforce_string_constraints(field: &FieldDefinition, text: &str) -> Option<String> {
    let length = text.chars().count();

    if let Some(min_len) = field.min_length
        && length < min_len
    {
        return Some(format!(
            "{} must be at least {} characters",
            field.label, min_len
        ));
    }

    if let Some(max_len) = field.max_length
        && length > max_len
    {
        return Some(format!(
            "{} must be no more than {} characters",
            field.label, max_len
        ));
    }

    if let Some(pattern) = &field.pattern {
        match Regex::new(pattern) {
            Ok(regex) if !regex.is_match(text) => {
                return Some(format!("{} format is invalid", field.label));
            }
            Ok(_) => {}
            Err(error) => {
                debug!(field = %field.field_key, %error, "skipping invalid pattern");
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ConditionOperator;
    use crate::spec::field::FieldType;

    fn check(field: &FieldDefinition, value: FieldValue) -> Option<String> {
        let values: ValueStore = [(field.field_key.as_str(), value)].into_iter().collect();
        validate_field(field, ValidationContext::new(&values, &SignatureStore::new()))
    }

    #[test]
    fn min_length_message() {
        let mut field = FieldDefinition::new("name", "Preferred name", FieldType::Text);
        field.min_length = Some(5);
        assert_eq!(
            check(&field, FieldValue::text("abc")),
            Some("Preferred name must be at least 5 characters".to_string())
        );
        assert_eq!(check(&field, FieldValue::text("abcde")), None);
    }

    #[test]
    fn max_length_counts_characters() {
        let mut field = FieldDefinition::new("name", "Name", FieldType::Text);
        field.max_length = Some(3);
        assert_eq!(check(&field, FieldValue::text("Zoë")), None);
        assert_eq!(
            check(&field, FieldValue::text("Zoey")),
            Some("Name must be no more than 3 characters".to_string())
        );
    }

    #[test]
    fn invalid_pattern_is_skipped() {
        let mut field = FieldDefinition::new("code", "Code", FieldType::Text);
        field.pattern = Some("([a-z".into());
        assert_eq!(check(&field, FieldValue::text("anything")), None);

        field.pattern = Some("^[0-9]{4}$".into());
        assert_eq!(
            check(&field, FieldValue::text("12a4")),
            Some("Code format is invalid".to_string())
        );
        assert_eq!(check(&field, FieldValue::text("1234")), None);
    }

    #[test]
    fn blank_values_skip_constraints_unless_required() {
        let mut field = FieldDefinition::new("code", "Code", FieldType::Email);
        field.min_length = Some(5);
        assert_eq!(check(&field, FieldValue::text("")), None);
        let field = field.required();
        assert_eq!(
            check(&field, FieldValue::List(vec![])),
            Some("Code is required".to_string())
        );
        assert_eq!(check(&field, FieldValue::Null), Some("Code is required".to_string()));
    }

    #[test]
    fn hidden_required_fields_are_exempt() {
        let fields = vec![
            FieldDefinition::new("has_carer", "Has carer", FieldType::YesNo),
            FieldDefinition::new("carer_name", "Carer name", FieldType::Text)
                .required()
                .with_condition("has_carer", ConditionOperator::Equals, "yes"),
        ];
        let values: ValueStore = [("has_carer", "no")].into_iter().collect();
        assert!(validate_all(&fields, &values, &SignatureStore::new()).is_empty());

        let values: ValueStore = [("has_carer", "yes")].into_iter().collect();
        let errors = validate_all(&fields, &values, &SignatureStore::new());
        assert_eq!(
            errors.get("carer_name").map(String::as_str),
            Some("Carer name is required")
        );
    }

    #[test]
    fn required_signature_reads_signature_store() {
        let field = FieldDefinition::new("participant_signature", "Signature", FieldType::Signature)
            .required();
        let values = ValueStore::new();
        let mut signatures = SignatureStore::new();
        assert_eq!(
            validate_field(&field, ValidationContext::new(&values, &signatures)),
            Some("Signature is required".to_string())
        );
        signatures.insert("participant_signature", "data:image/png;base64,AAAA");
        assert_eq!(
            validate_field(&field, ValidationContext::new(&values, &signatures)),
            None
        );
    }
}
