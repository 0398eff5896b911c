use std::collections::BTreeMap;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Drawing surface settings for signature capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    pub stroke_width: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 400,
            height: 200,
            stroke_width: 2.0,
        }
    }
}

/// Settings used when assembling submission records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Signer name written when the participant has none.
    pub default_signer_name: String,
    /// Months a submission stays valid when its category has no entry.
    pub default_validity_months: u32,
    /// Template category (case-insensitive) to validity in months.
    pub validity_months: BTreeMap<String, u32>,
    /// Template category to the document type a submission is linked to.
    pub linked_document_types: BTreeMap<String, String>,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            default_signer_name: "Participant".to_string(),
            default_validity_months: 12,
            validity_months: BTreeMap::from([
                ("consent".to_string(), 12),
                ("assessment".to_string(), 12),
                ("care_plan".to_string(), 12),
                ("risk_assessment".to_string(), 6),
                ("incident".to_string(), 0),
            ]),
            linked_document_types: BTreeMap::new(),
        }
    }
}

impl SubmissionConfig {
    pub fn validity_months_for(&self, category: Option<&str>) -> u32 {
        category
            .and_then(|category| {
                self.validity_months
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(category))
                    .map(|(_, months)| *months)
            })
            .unwrap_or(self.default_validity_months)
    }

    pub fn linked_document_type_for(&self, category: Option<&str>) -> Option<String> {
        let category = category?;
        self.linked_document_types
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(category))
            .map(|(_, document_type)| document_type.clone())
    }
}

/// Top-level engine configuration. Every field has a default, so an empty
/// document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EngineConfig {
    pub canvas: CanvasConfig,
    pub submission: SubmissionConfig,
}

impl EngineConfig {
    pub fn from_json(config_json: &str) -> Result<Self, ConfigError> {
        if config_json.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_str(config_json).map_err(ConfigError::Parse)?;
        config.check()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ConfigError::Invalid(
                "canvas width and height must be positive".into(),
            ));
        }
        if !(self.canvas.stroke_width > 0.0) {
            return Err(ConfigError::Invalid("canvas stroke_width must be positive".into()));
        }
        Ok(())
    }
}
