use serde_json::{Map, Value, json};

use crate::spec::{FieldDefinition, FieldType, TemplateDocument};
use crate::visibility::VisibilityMap;

/// JSON Schema for the value store of the fields `visibility` marks visible.
/// Signature and layout fields hold no store value and are left out.
pub fn generate(document: &TemplateDocument, visibility: &VisibilityMap) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in &document.fields {
        if !visibility.get(&field.field_key).copied().unwrap_or(true)
            || field.field_type.is_signature()
            || field.field_type.is_display_only()
        {
            continue;
        }
        let mut schema = property_schema(field);
        if let Value::Object(map) = &mut schema {
            map.insert("title".into(), Value::String(field.label.clone()));
            if let Some(description) = &field.description {
                map.insert("description".into(), Value::String(description.clone()));
            }
        }
        properties.insert(field.field_key.clone(), schema);
        if field.is_required() {
            required.push(Value::String(field.field_key.clone()));
        }
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": document.template.name,
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn option_values(field: &FieldDefinition) -> Vec<Value> {
    field
        .options
        .iter()
        .map(|option| Value::String(option.value.clone()))
        .collect()
}

fn string_schema(field: &FieldDefinition, format: Option<&str>) -> Value {
    let mut map = Map::new();
    map.insert("type".into(), Value::String("string".into()));
    if let Some(format) = format {
        map.insert("format".into(), Value::String(format.into()));
    }
    if let Some(min_len) = field.min_length {
        map.insert("minLength".into(), json!(min_len));
    }
    if let Some(max_len) = field.max_length {
        map.insert("maxLength".into(), json!(max_len));
    }
    if let Some(pattern) = &field.pattern {
        map.insert("pattern".into(), Value::String(pattern.clone()));
    }
    Value::Object(map)
}

fn property_schema(field: &FieldDefinition) -> Value {
    match field.field_type {
        FieldType::Text
        | FieldType::Textarea
        | FieldType::Location
        | FieldType::File
        | FieldType::Image
        | FieldType::Video
        | FieldType::Audio => string_schema(field, None),
        FieldType::Email => string_schema(field, Some("email")),
        FieldType::Date => string_schema(field, Some("date")),
        FieldType::Time => string_schema(field, Some("time")),
        FieldType::Datetime => string_schema(field, Some("date-time")),
        FieldType::Number => {
            let mut map = Map::new();
            map.insert("type".into(), Value::String("number".into()));
            if let Some(min) = field.min_value {
                map.insert("minimum".into(), json!(min));
            }
            if let Some(max) = field.max_value {
                map.insert("maximum".into(), json!(max));
            }
            Value::Object(map)
        }
        FieldType::YesNo => json!({ "type": "string", "enum": ["yes", "no"] }),
        FieldType::Checkbox if field.options.is_empty() => json!({ "type": "boolean" }),
        FieldType::Checkbox | FieldType::Multiselect => {
            let mut items = json!({ "type": "string" });
            if !field.options.is_empty() {
                items["enum"] = Value::Array(option_values(field));
            }
            json!({ "type": "array", "items": items, "uniqueItems": true })
        }
        FieldType::Radio | FieldType::Select => {
            let mut schema = json!({ "type": "string" });
            if !field.options.is_empty() {
                schema["enum"] = Value::Array(option_values(field));
            }
            schema
        }
        FieldType::Rating => json!({
            "type": "integer",
            "minimum": 1,
            "maximum": field.rating().max,
        }),
        FieldType::Slider => {
            let slider = field.slider();
            json!({ "type": "number", "minimum": slider.min, "maximum": slider.max })
        }
        FieldType::Signature | FieldType::SectionHeader | FieldType::Paragraph => json!({}),
    }
}
