use serde_json::{Map, Value, json};

use crate::spec::{
    FieldDefinition, FieldOption, FieldType, FieldWidth, RatingStyle, TemplateDocument,
};
use crate::validate::{ErrorMap, validate_all};
use crate::value::{FieldValue, SignatureStore, ValueStore, format_number};
use crate::visibility::visible_fields;

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// At least one visible field still fails validation.
    NeedInput,
    /// Every visible field passes validation.
    Ready,
    /// The session cannot be edited.
    ReadOnly,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Ready => "ready",
            RenderStatus::ReadOnly => "read_only",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub answered: usize,
    pub total: usize,
}

/// Filled/unfilled state of each rating control, first to last.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingDisplay {
    pub style: RatingStyle,
    pub filled: Vec<bool>,
}

#[derive(Debug, Clone)]
pub struct RenderField {
    pub key: String,
    pub label: String,
    pub kind: FieldType,
    pub required: bool,
    pub width: FieldWidth,
    pub description: Option<String>,
    pub placeholder: Option<String>,
    pub value: Option<FieldValue>,
    pub error: Option<String>,
    pub options: Vec<FieldOption>,
    pub rating: Option<RatingDisplay>,
    pub signed: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct RenderSection {
    pub title: Option<String>,
    pub fields: Vec<RenderField>,
}

/// Host-facing snapshot of the visible form.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub template_id: String,
    pub template_name: String,
    pub template_version: Option<String>,
    pub status: RenderStatus,
    pub progress: RenderProgress,
    pub help: Option<String>,
    pub sections: Vec<RenderSection>,
}

impl RenderPayload {
    pub fn fields(&self) -> impl Iterator<Item = &RenderField> {
        self.sections.iter().flat_map(|section| section.fields.iter())
    }

    pub fn field(&self, key: &str) -> Option<&RenderField> {
        self.fields().find(|field| field.key == key)
    }
}

/// Builds the payload for the currently visible fields, grouped into
/// consecutive runs of the same section.
pub fn build_render_payload(
    document: &TemplateDocument,
    values: &ValueStore,
    signatures: &SignatureStore,
    errors: &ErrorMap,
    read_only: bool,
) -> RenderPayload {
    let visible = visible_fields(&document.fields, values);

    let mut sections: Vec<RenderSection> = Vec::new();
    for field in &visible {
        let rendered = render_field(field, values, signatures, errors);
        match sections.last_mut() {
            Some(section) if section.title == field.section => section.fields.push(rendered),
            _ => sections.push(RenderSection {
                title: field.section.clone(),
                fields: vec![rendered],
            }),
        }
    }

    let inputs: Vec<_> = visible
        .iter()
        .filter(|field| !field.field_type.is_display_only())
        .collect();
    let answered = inputs
        .iter()
        .filter(|field| is_answered(field, values, signatures))
        .count();

    let status = if read_only {
        RenderStatus::ReadOnly
    } else if validate_all(&document.fields, values, signatures).is_empty() {
        RenderStatus::Ready
    } else {
        RenderStatus::NeedInput
    };

    RenderPayload {
        template_id: document.template.id.clone(),
        template_name: document.template.name.clone(),
        template_version: document.template.version.clone(),
        status,
        progress: RenderProgress {
            answered,
            total: inputs.len(),
        },
        help: document.template.description.clone(),
        sections,
    }
}

fn is_answered(field: &FieldDefinition, values: &ValueStore, signatures: &SignatureStore) -> bool {
    if field.field_type.is_signature() {
        signatures.contains(&field.field_key)
    } else {
        values
            .get(&field.field_key)
            .is_some_and(|value| !value.is_blank())
    }
}

fn render_field(
    field: &FieldDefinition,
    values: &ValueStore,
    signatures: &SignatureStore,
    errors: &ErrorMap,
) -> RenderField {
    let value = values.get(&field.field_key).cloned();
    let rating = (field.field_type == FieldType::Rating).then(|| {
        let config = field.rating();
        let current = value.as_ref().and_then(FieldValue::as_f64).unwrap_or(0.0);
        RatingDisplay {
            style: config.style,
            filled: (1..=config.max).map(|slot| f64::from(slot) <= current).collect(),
        }
    });
    RenderField {
        key: field.field_key.clone(),
        label: field.label.clone(),
        kind: field.field_type,
        required: field.is_required(),
        width: field.width,
        description: field.description.clone(),
        placeholder: field.placeholder.clone(),
        value,
        error: errors.get(&field.field_key).cloned(),
        options: field.options.clone(),
        rating,
        signed: field
            .field_type
            .is_signature()
            .then(|| signatures.contains(&field.field_key)),
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let sections = payload
        .sections
        .iter()
        .map(|section| {
            let fields = section
                .fields
                .iter()
                .map(|field| {
                    let mut map = Map::new();
                    map.insert("key".into(), Value::String(field.key.clone()));
                    map.insert("label".into(), Value::String(field.label.clone()));
                    map.insert("type".into(), Value::String(field.kind.as_str().into()));
                    map.insert("required".into(), Value::Bool(field.required));
                    map.insert(
                        "width".into(),
                        serde_json::to_value(field.width).unwrap_or(Value::Null),
                    );
                    if let Some(description) = &field.description {
                        map.insert("description".into(), Value::String(description.clone()));
                    }
                    if let Some(placeholder) = &field.placeholder {
                        map.insert("placeholder".into(), Value::String(placeholder.clone()));
                    }
                    if let Some(value) = &field.value {
                        map.insert("value".into(), value.to_json());
                    }
                    if let Some(error) = &field.error {
                        map.insert("error".into(), Value::String(error.clone()));
                    }
                    if !field.options.is_empty() {
                        map.insert(
                            "options".into(),
                            Value::Array(
                                field
                                    .options
                                    .iter()
                                    .map(|option| {
                                        json!({
                                            "value": option.value,
                                            "label": option.display_label(),
                                        })
                                    })
                                    .collect(),
                            ),
                        );
                    }
                    if let Some(rating) = &field.rating {
                        map.insert(
                            "rating".into(),
                            json!({
                                "style": rating.style,
                                "filled": rating.filled,
                            }),
                        );
                    }
                    if let Some(signed) = field.signed {
                        map.insert("signed".into(), Value::Bool(signed));
                    }
                    Value::Object(map)
                })
                .collect::<Vec<_>>();
            json!({
                "title": section.title,
                "fields": fields,
            })
        })
        .collect::<Vec<_>>();

    json!({
        "template_id": payload.template_id,
        "template_name": payload.template_name,
        "template_version": payload.template_version,
        "status": payload.status.as_str(),
        "progress": {
            "answered": payload.progress.answered,
            "total": payload.progress.total,
        },
        "help": payload.help,
        "sections": sections,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Form: {} ({})",
        payload.template_name, payload.template_id
    ));
    lines.push(format!(
        "Status: {} ({}/{})",
        payload.status.as_str(),
        payload.progress.answered,
        payload.progress.total
    ));
    if let Some(help) = &payload.help {
        lines.push(format!("Help: {}", help));
    }

    for section in &payload.sections {
        if let Some(title) = &section.title {
            lines.push(format!("== {} ==", title));
        }
        for field in &section.fields {
            match field.kind {
                FieldType::SectionHeader => lines.push(format!("# {}", field.label)),
                FieldType::Paragraph => lines.push(field.label.clone()),
                _ => lines.push(field_line(field)),
            }
            if let Some(error) = &field.error {
                lines.push(format!("   ! {}", error));
            }
        }
    }

    lines.join("\n")
}

fn field_line(field: &RenderField) -> String {
    let mut entry = format!(" - {} ({})", field.key, field.label);
    if field.required {
        entry.push_str(" [required]");
    }
    if let Some(rating) = &field.rating {
        let marks: String = rating
            .filled
            .iter()
            .map(|filled| if *filled { '*' } else { '.' })
            .collect();
        entry.push_str(&format!(" = {}", marks));
    } else if let Some(signed) = field.signed {
        entry.push_str(if signed { " = signed" } else { " = unsigned" });
    } else if let Some(value) = &field.value {
        let shown = match value {
            FieldValue::Number(number) => format_number(*number),
            other => other.display(),
        };
        entry.push_str(&format!(" = {}", shown));
    }
    entry
}
