use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::expr::{Condition, ConditionOperator};
use crate::spec::de;

/// Closed set of field kinds a template may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Email,
    Number,
    Date,
    Time,
    Datetime,
    YesNo,
    Checkbox,
    Radio,
    Select,
    Multiselect,
    Rating,
    Slider,
    Signature,
    File,
    Image,
    Video,
    Audio,
    Location,
    SectionHeader,
    Paragraph,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Email => "email",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Datetime => "datetime",
            FieldType::YesNo => "yes_no",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::Select => "select",
            FieldType::Multiselect => "multiselect",
            FieldType::Rating => "rating",
            FieldType::Slider => "slider",
            FieldType::Signature => "signature",
            FieldType::File => "file",
            FieldType::Image => "image",
            FieldType::Video => "video",
            FieldType::Audio => "audio",
            FieldType::Location => "location",
            FieldType::SectionHeader => "section_header",
            FieldType::Paragraph => "paragraph",
        }
    }

    /// Layout-only kinds that never hold a value.
    pub fn is_display_only(&self) -> bool {
        matches!(self, FieldType::SectionHeader | FieldType::Paragraph)
    }

    /// Kinds whose value lives in the signature store rather than the value store.
    pub fn is_signature(&self) -> bool {
        matches!(self, FieldType::Signature)
    }
}

/// A `{value, label}` pair offered by choice fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldOption {
    pub value: String,
    #[serde(default)]
    pub label: String,
}

impl FieldOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.value
        } else {
            &self.label
        }
    }
}

/// Column span hint for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldWidth {
    #[default]
    Full,
    Half,
    Third,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RatingStyle {
    #[default]
    Stars,
    Numbers,
    Hearts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingConfig {
    pub max: u32,
    pub style: RatingStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliderConfig {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub unit: Option<String>,
}

pub const DEFAULT_RATING_MAX: u32 = 5;

/// Declarative description of one form field, as served by the template API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Backend identifier used as `fieldId` on value records.
    #[serde(default)]
    pub id: String,
    pub field_key: String,
    pub label: String,
    pub field_type: FieldType,
    #[serde(default, deserialize_with = "de::order")]
    pub order: i64,
    #[serde(default, deserialize_with = "de::optional_string", skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// `"yes"` marks the field as required; any other value does not.
    #[serde(default, deserialize_with = "de::optional_text", skip_serializing_if = "Option::is_none")]
    pub is_required: Option<String>,
    #[serde(default, deserialize_with = "de::optional_string", skip_serializing_if = "Option::is_none")]
    pub conditional_on: Option<String>,
    #[serde(default, deserialize_with = "de::optional_text", skip_serializing_if = "Option::is_none")]
    pub conditional_value: Option<String>,
    #[serde(default, deserialize_with = "de::operator", skip_serializing_if = "Option::is_none")]
    pub conditional_operator: Option<ConditionOperator>,
    #[serde(default, deserialize_with = "de::optional_usize", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, deserialize_with = "de::optional_usize", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, deserialize_with = "de::optional_string", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, deserialize_with = "de::optional_f64", skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, deserialize_with = "de::optional_f64", skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default)]
    pub width: FieldWidth,
    #[serde(default, deserialize_with = "de::optional_usize", skip_serializing_if = "Option::is_none")]
    pub rating_max: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_style: Option<RatingStyle>,
    #[serde(default, deserialize_with = "de::optional_f64", skip_serializing_if = "Option::is_none")]
    pub slider_min: Option<f64>,
    #[serde(default, deserialize_with = "de::optional_f64", skip_serializing_if = "Option::is_none")]
    pub slider_max: Option<f64>,
    #[serde(default, deserialize_with = "de::optional_f64", skip_serializing_if = "Option::is_none")]
    pub slider_step: Option<f64>,
    #[serde(default, deserialize_with = "de::optional_string", skip_serializing_if = "Option::is_none")]
    pub slider_unit: Option<String>,
    #[serde(default, deserialize_with = "de::optional_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de::optional_string", skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl FieldDefinition {
    /// Minimal definition; remaining attributes take their serde defaults.
    pub fn new(field_key: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        let field_key = field_key.into();
        Self {
            id: field_key.clone(),
            field_key,
            label: label.into(),
            field_type,
            order: 0,
            section: None,
            is_required: None,
            conditional_on: None,
            conditional_value: None,
            conditional_operator: None,
            min_length: None,
            max_length: None,
            pattern: None,
            min_value: None,
            max_value: None,
            options: Vec::new(),
            width: FieldWidth::Full,
            rating_max: None,
            rating_style: None,
            slider_min: None,
            slider_max: None,
            slider_step: None,
            slider_unit: None,
            description: None,
            placeholder: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = Some("yes".into());
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_condition(
        mut self,
        field_key: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<String>,
    ) -> Self {
        self.conditional_on = Some(field_key.into());
        self.conditional_operator = Some(operator);
        self.conditional_value = Some(value.into());
        self
    }

    pub fn with_options<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.options = values
            .into_iter()
            .map(|value| {
                let value = value.into();
                FieldOption::new(value.clone(), value)
            })
            .collect();
        self
    }

    pub fn is_required(&self) -> bool {
        self.is_required.as_deref() == Some("yes")
    }

    /// Identifier written as `fieldId` on value records.
    pub fn record_id(&self) -> &str {
        if self.id.is_empty() {
            &self.field_key
        } else {
            &self.id
        }
    }

    /// The visibility rule, if the field declares one.
    pub fn condition(&self) -> Option<Condition> {
        self.conditional_on.as_ref().map(|field| Condition {
            field: field.clone(),
            operator: self.conditional_operator.clone().unwrap_or_default(),
            value: self.conditional_value.clone(),
        })
    }

    pub fn rating(&self) -> RatingConfig {
        RatingConfig {
            max: self
                .rating_max
                .filter(|max| *max > 0)
                .map(|max| max as u32)
                .unwrap_or(DEFAULT_RATING_MAX),
            style: self.rating_style.unwrap_or_default(),
        }
    }

    pub fn slider(&self) -> SliderConfig {
        SliderConfig {
            min: self.slider_min.unwrap_or(0.0),
            max: self.slider_max.unwrap_or(100.0),
            step: self.slider_step.filter(|step| *step > 0.0).unwrap_or(1.0),
            unit: self.slider_unit.clone(),
        }
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|option| option.value == value)
    }
}
