use chrono::{DateTime, Months, Utc};
use tracing::{info, warn};

use crate::backend::FormsBackend;
use crate::config::SubmissionConfig;
use crate::error::{BackendError, SubmitError, SubmitStage};
use crate::records::{FormSubmission, NewSubmission, SignatureRecord, SubmissionStatus, ValueRecord};
use crate::spec::{FieldDefinition, FormTemplate};
use crate::value::{FieldValue, SignatureStore, ValueStore};

/// Who the submission is for, supplied by the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticipantContext {
    pub client_id: String,
    pub participant_name: Option<String>,
    /// Overrides the document type configured for the template category.
    pub linked_document_type: Option<String>,
}

impl ParticipantContext {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.participant_name = Some(name.into());
        self
    }
}

/// Turns the stores of a validated session into backend writes: one
/// submission, then one value record per populated field, then one signature
/// record per capture. Writes run in sequence and stop at the first failure;
/// earlier writes are left in place.
pub struct SubmissionAssembler<'a, B: FormsBackend + ?Sized> {
    backend: &'a B,
    config: &'a SubmissionConfig,
    clock: fn() -> DateTime<Utc>,
}

impl<'a, B: FormsBackend + ?Sized> SubmissionAssembler<'a, B> {
    pub fn new(backend: &'a B, config: &'a SubmissionConfig) -> Self {
        Self {
            backend,
            config,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// The `createSubmission` payload for `template`, stamped at `now`.
    pub fn new_submission(
        &self,
        template: &FormTemplate,
        participant: &ParticipantContext,
        now: DateTime<Utc>,
    ) -> NewSubmission {
        let category = template.category.as_deref();
        let months = self.config.validity_months_for(category);
        let (validity_period, expires_at) = if months == 0 {
            (None, None)
        } else {
            (
                Some(format!("{months} months")),
                now.checked_add_months(Months::new(months)),
            )
        };
        NewSubmission {
            template_id: template.id.clone(),
            client_id: participant.client_id.clone(),
            status: SubmissionStatus::Submitted,
            submitted_at: now,
            validity_period,
            expires_at,
            linked_document_type: participant
                .linked_document_type
                .clone()
                .or_else(|| self.config.linked_document_type_for(category)),
        }
    }

    pub async fn submit(
        &self,
        template: &FormTemplate,
        fields: &[FieldDefinition],
        values: &ValueStore,
        signatures: &SignatureStore,
        participant: &ParticipantContext,
    ) -> Result<FormSubmission, SubmitError> {
        let now = (self.clock)();
        let payload = self.new_submission(template, participant, now);
        let submission = self
            .backend
            .create_submission(payload)
            .await
            .map_err(|source| failure(SubmitStage::CreateSubmission, 0, None, source))?;
        info!(submission_id = %submission.id, template_id = %template.id, "created submission");

        let mut completed = 1;
        for field in fields {
            let Some(value) = values.get(&field.field_key) else {
                continue;
            };
            if matches!(value, FieldValue::Null) {
                continue;
            }
            let record = ValueRecord {
                field_id: field.record_id().to_string(),
                value: value.clone(),
            };
            self.backend
                .add_submission_value(&submission.id, record)
                .await
                .map_err(|source| {
                    failure(SubmitStage::AddValue, completed, Some(&submission.id), source)
                })?;
            completed += 1;
        }

        let signer_name = participant
            .participant_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.config.default_signer_name.clone());
        for (signer_role, signature_data) in signatures.iter() {
            let record = SignatureRecord {
                signer_name: signer_name.clone(),
                signer_role: signer_role.clone(),
                signature_data: signature_data.clone(),
                signed_at: Some((self.clock)()),
            };
            self.backend
                .add_submission_signature(&submission.id, record)
                .await
                .map_err(|source| {
                    failure(SubmitStage::AddSignature, completed, Some(&submission.id), source)
                })?;
            completed += 1;
        }

        info!(submission_id = %submission.id, writes = completed, "submission complete");
        Ok(submission)
    }
}

fn failure(
    stage: SubmitStage,
    completed_writes: usize,
    submission_id: Option<&str>,
    source: BackendError,
) -> SubmitError {
    warn!(%stage, completed_writes, error = %source, "submission write failed; earlier writes are kept");
    SubmitError::Backend {
        stage,
        completed_writes,
        submission_id: submission_id.map(str::to_string),
        source,
    }
}
