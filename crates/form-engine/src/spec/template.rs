use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::de;
use crate::spec::field::FieldDefinition;

/// Read-only template metadata. The engine never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormTemplate {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "de::optional_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de::optional_text")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "de::optional_string", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl FormTemplate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            version: None,
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// A template together with its field definitions, as stored on disk or
/// assembled from the two template API calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TemplateDocument {
    pub template: FormTemplate,
    pub fields: Vec<FieldDefinition>,
}

impl TemplateDocument {
    /// Builds a document with fields stably sorted by `order`.
    pub fn new(template: FormTemplate, mut fields: Vec<FieldDefinition>) -> Self {
        fields.sort_by_key(|field| field.order);
        Self { template, fields }
    }

    pub fn field(&self, field_key: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.field_key == field_key)
    }

    /// Field keys that appear more than once.
    pub fn duplicate_keys(&self) -> Vec<String> {
        let mut seen = std::collections::BTreeSet::new();
        let mut duplicates = std::collections::BTreeSet::new();
        for field in &self.fields {
            if !seen.insert(field.field_key.as_str()) {
                duplicates.insert(field.field_key.clone());
            }
        }
        duplicates.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::field::FieldType;

    #[test]
    fn sorts_fields_by_order() {
        let document = TemplateDocument::new(
            FormTemplate::new("t1", "Consent"),
            vec![
                FieldDefinition::new("b", "B", FieldType::Text).with_order(2),
                FieldDefinition::new("a", "A", FieldType::Text).with_order(1),
            ],
        );
        let keys: Vec<_> = document.fields.iter().map(|f| f.field_key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn reports_duplicate_keys() {
        let document = TemplateDocument::new(
            FormTemplate::new("t1", "Consent"),
            vec![
                FieldDefinition::new("a", "A", FieldType::Text),
                FieldDefinition::new("a", "A again", FieldType::Email),
            ],
        );
        assert_eq!(document.duplicate_keys(), vec!["a".to_string()]);
    }
}
