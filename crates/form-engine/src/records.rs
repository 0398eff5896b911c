//! Wire shapes exchanged with the forms backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::spec::de;
use crate::value::FieldValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Draft,
    Submitted,
}

/// Payload for `createSubmission`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    pub template_id: String,
    pub client_id: String,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_document_type: Option<String>,
}

/// A persisted submission. Produced by the backend, never owned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmission {
    pub id: String,
    pub template_id: String,
    pub client_id: String,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_document_type: Option<String>,
}

impl FormSubmission {
    pub fn from_new(id: impl Into<String>, payload: NewSubmission) -> Self {
        Self {
            id: id.into(),
            template_id: payload.template_id,
            client_id: payload.client_id,
            status: payload.status,
            submitted_at: payload.submitted_at,
            validity_period: payload.validity_period,
            expires_at: payload.expires_at,
            linked_document_type: payload.linked_document_type,
        }
    }
}

/// One persisted field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRecord {
    pub field_id: String,
    pub value: FieldValue,
}

/// One persisted signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRecord {
    #[serde(default)]
    pub signer_name: String,
    pub signer_role: String,
    pub signature_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NdisDetails {
    #[serde(default, deserialize_with = "de::optional_string")]
    pub ndis_number: Option<String>,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub ndis_plan_start_date: Option<String>,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub ndis_plan_end_date: Option<String>,
}

/// Participant attributes the prefill resolver reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantProfile {
    #[serde(default, deserialize_with = "de::optional_string")]
    pub participant_name: Option<String>,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub date_of_birth: Option<String>,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub home_address: Option<String>,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub category: Option<String>,
    #[serde(default)]
    pub ndis_details: Option<NdisDetails>,
}

impl ParticipantProfile {
    /// NDIS participants are identified by category, or by holding an NDIS number.
    pub fn is_ndis_participant(&self) -> bool {
        self.category
            .as_deref()
            .is_some_and(|category| category.to_ascii_lowercase().contains("ndis"))
            || self
                .ndis_details
                .as_ref()
                .is_some_and(|details| details.ndis_number.is_some())
    }
}
