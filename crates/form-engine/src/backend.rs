use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::error::BackendError;
use crate::records::{
    FormSubmission, NewSubmission, ParticipantProfile, SignatureRecord, ValueRecord,
};
use crate::spec::{FieldDefinition, FormTemplate, TemplateDocument};

/// The REST collaborator the engine reads templates from and writes
/// submissions to. Transport, timeouts and retries belong to the implementor.
#[async_trait]
pub trait FormsBackend: Send + Sync {
    async fn get_template(&self, template_id: &str) -> Result<FormTemplate, BackendError>;

    async fn get_fields(&self, template_id: &str) -> Result<Vec<FieldDefinition>, BackendError>;

    async fn get_participant_profile(
        &self,
        client_id: &str,
    ) -> Result<ParticipantProfile, BackendError>;

    async fn get_submission(&self, submission_id: &str) -> Result<FormSubmission, BackendError>;

    async fn get_submission_values(
        &self,
        submission_id: &str,
    ) -> Result<Vec<ValueRecord>, BackendError>;

    async fn get_submission_signatures(
        &self,
        submission_id: &str,
    ) -> Result<Vec<SignatureRecord>, BackendError>;

    async fn create_submission(&self, payload: NewSubmission)
    -> Result<FormSubmission, BackendError>;

    async fn add_submission_value(
        &self,
        submission_id: &str,
        record: ValueRecord,
    ) -> Result<(), BackendError>;

    async fn add_submission_signature(
        &self,
        submission_id: &str,
        record: SignatureRecord,
    ) -> Result<(), BackendError>;
}

#[derive(Debug, Default)]
struct State {
    templates: BTreeMap<String, TemplateDocument>,
    profiles: BTreeMap<String, ParticipantProfile>,
    submissions: BTreeMap<String, FormSubmission>,
    values: BTreeMap<String, Vec<ValueRecord>>,
    signatures: BTreeMap<String, Vec<SignatureRecord>>,
    completed_writes: usize,
    fail_writes_after: Option<usize>,
    failing_operations: BTreeSet<&'static str>,
}

/// Backend held entirely in memory. Used by the CLI's dry-run submit and by
/// tests, which can make writes or individual operations fail on demand.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(self, document: TemplateDocument) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state
                .templates
                .insert(document.template.id.clone(), document);
        }
        self
    }

    pub fn with_profile(self, client_id: impl Into<String>, profile: ParticipantProfile) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.profiles.insert(client_id.into(), profile);
        }
        self
    }

    /// Lets `count` more writes succeed, then fails every later write.
    pub fn fail_writes_after(&self, count: usize) {
        if let Ok(mut state) = self.state.lock() {
            let completed = state.completed_writes;
            state.fail_writes_after = Some(completed + count);
        }
    }

    /// Makes every call to `operation` (e.g. `"get_participant_profile"`) fail.
    pub fn fail_operation(&self, operation: &'static str) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_operations.insert(operation);
        }
    }

    pub fn submissions(&self) -> Vec<FormSubmission> {
        self.state
            .lock()
            .map(|state| state.submissions.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn values_for(&self, submission_id: &str) -> Vec<ValueRecord> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.values.get(submission_id).cloned())
            .unwrap_or_default()
    }

    pub fn signatures_for(&self, submission_id: &str) -> Vec<SignatureRecord> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.signatures.get(submission_id).cloned())
            .unwrap_or_default()
    }

    fn state(&self, operation: &'static str) -> Result<MutexGuard<'_, State>, BackendError> {
        let state = self
            .state
            .lock()
            .map_err(|_| BackendError::request(operation, "backend state poisoned"))?;
        if state.failing_operations.contains(operation) {
            return Err(BackendError::request(operation, "simulated failure"));
        }
        Ok(state)
    }

    fn write_state(&self, operation: &'static str) -> Result<MutexGuard<'_, State>, BackendError> {
        let mut state = self.state(operation)?;
        if let Some(limit) = state.fail_writes_after
            && state.completed_writes >= limit
        {
            return Err(BackendError::request(operation, "simulated write failure"));
        }
        state.completed_writes += 1;
        Ok(state)
    }
}

#[async_trait]
impl FormsBackend for InMemoryBackend {
    async fn get_template(&self, template_id: &str) -> Result<FormTemplate, BackendError> {
        self.state("get_template")?
            .templates
            .get(template_id)
            .map(|document| document.template.clone())
            .ok_or_else(|| BackendError::NotFound {
                entity: "template",
                id: template_id.to_string(),
            })
    }

    async fn get_fields(&self, template_id: &str) -> Result<Vec<FieldDefinition>, BackendError> {
        self.state("get_fields")?
            .templates
            .get(template_id)
            .map(|document| document.fields.clone())
            .ok_or_else(|| BackendError::NotFound {
                entity: "template",
                id: template_id.to_string(),
            })
    }

    async fn get_participant_profile(
        &self,
        client_id: &str,
    ) -> Result<ParticipantProfile, BackendError> {
        self.state("get_participant_profile")?
            .profiles
            .get(client_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                entity: "participant",
                id: client_id.to_string(),
            })
    }

    async fn get_submission(&self, submission_id: &str) -> Result<FormSubmission, BackendError> {
        self.state("get_submission")?
            .submissions
            .get(submission_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                entity: "submission",
                id: submission_id.to_string(),
            })
    }

    async fn get_submission_values(
        &self,
        submission_id: &str,
    ) -> Result<Vec<ValueRecord>, BackendError> {
        Ok(self
            .state("get_submission_values")?
            .values
            .get(submission_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_submission_signatures(
        &self,
        submission_id: &str,
    ) -> Result<Vec<SignatureRecord>, BackendError> {
        Ok(self
            .state("get_submission_signatures")?
            .signatures
            .get(submission_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_submission(
        &self,
        payload: NewSubmission,
    ) -> Result<FormSubmission, BackendError> {
        let mut state = self.write_state("create_submission")?;
        let submission = FormSubmission::from_new(uuid::Uuid::new_v4().to_string(), payload);
        debug!(submission_id = %submission.id, "stored submission");
        state
            .submissions
            .insert(submission.id.clone(), submission.clone());
        Ok(submission)
    }

    async fn add_submission_value(
        &self,
        submission_id: &str,
        record: ValueRecord,
    ) -> Result<(), BackendError> {
        let mut state = self.write_state("add_submission_value")?;
        if !state.submissions.contains_key(submission_id) {
            return Err(BackendError::NotFound {
                entity: "submission",
                id: submission_id.to_string(),
            });
        }
        state
            .values
            .entry(submission_id.to_string())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn add_submission_signature(
        &self,
        submission_id: &str,
        record: SignatureRecord,
    ) -> Result<(), BackendError> {
        let mut state = self.write_state("add_submission_signature")?;
        if !state.submissions.contains_key(submission_id) {
            return Err(BackendError::NotFound {
                entity: "submission",
                id: submission_id.to_string(),
            });
        }
        state
            .signatures
            .entry(submission_id.to_string())
            .or_default()
            .push(record);
        Ok(())
    }
}
