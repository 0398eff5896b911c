use std::fmt;

use serde_json::Value;
use tracing::{debug, info};

use crate::backend::FormsBackend;
use crate::config::EngineConfig;
use crate::error::{SessionError, SubmitError};
use crate::loader::LoadedForm;
use crate::prefill::PrefillResolver;
use crate::records::{FormSubmission, ParticipantProfile, SignatureRecord, ValueRecord};
use crate::render::{RenderPayload, build_render_payload};
use crate::signature::SignaturePad;
use crate::spec::{FieldDefinition, FieldType, FormTemplate, TemplateDocument};
use crate::submission::{ParticipantContext, SubmissionAssembler};
use crate::validate::{ErrorMap, validate_all};
use crate::value::{FieldValue, SignatureStore, ValueStore};
use crate::visibility::{VisibilityMap, resolve_visibility, visible_fields};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    Create,
    Edit { submission_id: String },
    View { submission_id: String },
}

pub type SubmitListener = Box<dyn Fn(&FormSubmission) + Send + Sync>;

/// Everything the assembler needs, captured when a submit starts.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub template: FormTemplate,
    pub fields: Vec<FieldDefinition>,
    pub values: ValueStore,
    pub signatures: SignatureStore,
}

impl SubmissionRequest {
    pub async fn send<B: FormsBackend + ?Sized>(
        &self,
        backend: &B,
        config: &EngineConfig,
        participant: &ParticipantContext,
    ) -> Result<FormSubmission, SubmitError> {
        SubmissionAssembler::new(backend, &config.submission)
            .submit(
                &self.template,
                &self.fields,
                &self.values,
                &self.signatures,
                participant,
            )
            .await
    }
}

/// One single-owner editing session over one template. Holds the value and
/// signature stores and the current error map; nothing is persisted until a
/// submit succeeds, and dropping the session discards all input.
pub struct FormSession {
    document: TemplateDocument,
    mode: SessionMode,
    config: EngineConfig,
    values: ValueStore,
    signatures: SignatureStore,
    errors: ErrorMap,
    profile: Option<ParticipantProfile>,
    capture: Option<SignaturePad>,
    submitting: bool,
    listeners: Vec<SubmitListener>,
}

impl fmt::Debug for FormSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormSession")
            .field("template", &self.document.template.id)
            .field("mode", &self.mode)
            .field("values", &self.values)
            .field("signatures", &self.signatures.len())
            .field("errors", &self.errors)
            .field("submitting", &self.submitting)
            .finish_non_exhaustive()
    }
}

impl FormSession {
    pub fn new(
        document: TemplateDocument,
        mode: SessionMode,
        config: EngineConfig,
    ) -> Result<Self, SessionError> {
        let duplicates = document.duplicate_keys();
        if !duplicates.is_empty() {
            return Err(SessionError::DuplicateFieldKeys(duplicates));
        }
        let document = TemplateDocument::new(document.template, document.fields);
        Ok(Self {
            document,
            mode,
            config,
            values: ValueStore::new(),
            signatures: SignatureStore::new(),
            errors: ErrorMap::new(),
            profile: None,
            capture: None,
            submitting: false,
            listeners: Vec::new(),
        })
    }

    /// Builds a session from the initial loads. Existing values and
    /// signatures seed the stores; in create mode the participant profile
    /// is used for prefill instead.
    pub fn from_loaded(
        loaded: LoadedForm,
        mode: SessionMode,
        config: EngineConfig,
        resolver: PrefillResolver,
    ) -> Result<Self, SessionError> {
        let template = loaded.template.ok_or(SessionError::NotFound("template"))?;
        let fields = loaded.fields.ok_or(SessionError::NotFound("template fields"))?;
        if !matches!(mode, SessionMode::Create) && loaded.submission.is_none() {
            return Err(SessionError::NotFound("submission"));
        }
        let mut session = Self::new(TemplateDocument::new(template, fields), mode, config)?;
        session.seed(
            loaded.values.unwrap_or_default(),
            loaded.signatures.unwrap_or_default(),
        );
        if let Some(profile) = loaded.profile {
            if matches!(session.mode, SessionMode::Create) {
                session.apply_prefill(profile, resolver);
            } else {
                session.profile = Some(profile);
            }
        }
        Ok(session)
    }

    /// Loads persisted records into the stores, mapping `fieldId` back to keys.
    pub fn seed(&mut self, values: Vec<ValueRecord>, signatures: Vec<SignatureRecord>) {
        for record in values {
            let field = self.document.fields.iter().find(|field| {
                field.record_id() == record.field_id || field.field_key == record.field_id
            });
            match field {
                Some(field) => {
                    self.values.set(field.field_key.clone(), record.value);
                }
                None => debug!(field_id = %record.field_id, "dropping value for unknown field"),
            }
        }
        for record in signatures {
            self.signatures
                .insert(record.signer_role, record.signature_data);
        }
    }

    pub fn document(&self) -> &TemplateDocument {
        &self.document
    }

    pub fn template(&self) -> &FormTemplate {
        &self.document.template
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.document.fields
    }

    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self.mode, SessionMode::View { .. })
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn values(&self) -> &ValueStore {
        &self.values
    }

    pub fn signatures(&self) -> &SignatureStore {
        &self.signatures
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn error(&self, field_key: &str) -> Option<&str> {
        self.errors.get(field_key).map(String::as_str)
    }

    pub fn profile(&self) -> Option<&ParticipantProfile> {
        self.profile.as_ref()
    }

    pub fn visible_fields(&self) -> Vec<&FieldDefinition> {
        visible_fields(&self.document.fields, &self.values)
    }

    pub fn visibility(&self) -> VisibilityMap {
        resolve_visibility(&self.document.fields, &self.values)
    }

    pub fn field(&self, field_key: &str) -> Result<&FieldDefinition, SessionError> {
        self.document
            .field(field_key)
            .ok_or_else(|| SessionError::UnknownField(field_key.to_string()))
    }

    pub fn set_value(
        &mut self,
        field_key: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), SessionError> {
        self.ensure_editable()?;
        let field = self.field(field_key)?;
        if field.field_type.is_signature() || field.field_type.is_display_only() {
            return Err(SessionError::WrongFieldType {
                field: field_key.to_string(),
                kind: field.field_type.as_str(),
            });
        }
        self.values.set(field_key, value);
        self.errors.remove(field_key);
        Ok(())
    }

    /// Stores raw host input after normalizing it for the field's type.
    pub fn set_raw(&mut self, field_key: &str, raw: &Value) -> Result<(), SessionError> {
        let field = self.field(field_key)?;
        let value = field.field_type.handler().normalize(field, raw);
        self.set_value(field_key, value)
    }

    pub fn clear_value(&mut self, field_key: &str) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.field(field_key)?;
        self.values.remove(field_key);
        self.errors.remove(field_key);
        Ok(())
    }

    /// Adds `option` to a multi-choice field, or removes it if present.
    pub fn toggle_option(&mut self, field_key: &str, option: &str) -> Result<&[String], SessionError> {
        let field = self.field(field_key)?;
        if !matches!(field.field_type, FieldType::Multiselect | FieldType::Checkbox) {
            return Err(SessionError::WrongFieldType {
                field: field_key.to_string(),
                kind: field.field_type.as_str(),
            });
        }
        let mut selected = self
            .values
            .get(field_key)
            .and_then(FieldValue::as_list)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        if selected.iter().any(|item| item == option) {
            selected.retain(|item| item != option);
        } else {
            selected.push(option.to_string());
        }
        self.set_value(field_key, FieldValue::List(selected))?;
        Ok(self
            .values
            .get(field_key)
            .and_then(FieldValue::as_list)
            .unwrap_or_default())
    }

    /// Sets a rating, clamped to `1..=rating_max`.
    pub fn set_rating(&mut self, field_key: &str, rating: u32) -> Result<(), SessionError> {
        let field = self.field(field_key)?;
        if field.field_type != FieldType::Rating {
            return Err(SessionError::WrongFieldType {
                field: field_key.to_string(),
                kind: field.field_type.as_str(),
            });
        }
        let rating = rating.clamp(1, field.rating().max);
        self.set_value(field_key, FieldValue::Number(f64::from(rating)))
    }

    /// Fills empty well-known fields from `profile`. Create mode only; safe to
    /// call again when the profile is refreshed.
    pub fn apply_prefill(&mut self, profile: ParticipantProfile, resolver: PrefillResolver) -> Vec<String> {
        let filled = if matches!(self.mode, SessionMode::Create) {
            resolver.apply(&self.document.fields, &profile, &mut self.values)
        } else {
            Vec::new()
        };
        self.profile = Some(profile);
        filled
    }

    /// Re-runs every rule and replaces the error map. Returns whether the form is valid.
    pub fn validate(&mut self) -> bool {
        self.errors = validate_all(&self.document.fields, &self.values, &self.signatures);
        self.errors.is_empty()
    }

    pub fn open_signature(&mut self, field_key: &str) -> Result<&mut SignaturePad, SessionError> {
        self.ensure_editable()?;
        let field = self.field(field_key)?;
        if !field.field_type.is_signature() {
            return Err(SessionError::WrongFieldType {
                field: field_key.to_string(),
                kind: field.field_type.as_str(),
            });
        }
        let pad = SignaturePad::open(
            field_key,
            &self.config.canvas,
            self.signatures.get(field_key),
        );
        Ok(self.capture.insert(pad))
    }

    pub fn signature_pad(&self) -> Option<&SignaturePad> {
        self.capture.as_ref()
    }

    pub fn signature_pad_mut(&mut self) -> Option<&mut SignaturePad> {
        self.capture.as_mut()
    }

    pub fn clear_signature_pad(&mut self) -> Result<(), SessionError> {
        let pad = self.capture.as_mut().ok_or(SessionError::NoActiveCapture)?;
        pad.clear()?;
        Ok(())
    }

    /// Commits the open capture to the signature store and closes it.
    pub fn save_signature(&mut self) -> Result<String, SessionError> {
        self.ensure_editable()?;
        let pad = self.capture.take().ok_or(SessionError::NoActiveCapture)?;
        let field_key = pad.field_key().to_string();
        let payload = pad.save(&mut self.signatures)?;
        self.errors.remove(&field_key);
        Ok(payload)
    }

    pub fn cancel_signature(&mut self) {
        self.capture = None;
    }

    pub fn remove_signature(&mut self, field_key: &str) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.signatures.remove(field_key);
        self.errors.remove(field_key);
        Ok(())
    }

    /// Registers a callback run after every successful submit, so the host
    /// can refresh its own views.
    pub fn on_submitted(&mut self, listener: impl Fn(&FormSubmission) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Validates and marks the session as submitting. Fails while another
    /// submit is in flight.
    pub fn begin_submit(&mut self) -> Result<SubmissionRequest, SubmitError> {
        if self.is_read_only() {
            return Err(SubmitError::ReadOnly);
        }
        if self.submitting {
            return Err(SubmitError::InFlight);
        }
        if !self.validate() {
            debug!(errors = self.errors.len(), "submit blocked by validation");
            return Err(SubmitError::Invalid(self.errors.clone()));
        }
        self.submitting = true;
        Ok(SubmissionRequest {
            template: self.document.template.clone(),
            fields: self.document.fields.clone(),
            values: self.values.clone(),
            signatures: self.signatures.clone(),
        })
    }

    /// Clears the in-flight flag and notifies listeners on success. The
    /// stores are untouched either way, so a failed submit can be retried.
    pub fn finish_submit(
        &mut self,
        result: Result<FormSubmission, SubmitError>,
    ) -> Result<FormSubmission, SubmitError> {
        self.submitting = false;
        if let Ok(submission) = &result {
            info!(submission_id = %submission.id, "form submitted");
            for listener in &self.listeners {
                listener(submission);
            }
        }
        result
    }

    pub async fn submit<B: FormsBackend + ?Sized>(
        &mut self,
        backend: &B,
        participant: &ParticipantContext,
    ) -> Result<FormSubmission, SubmitError> {
        let request = self.begin_submit()?;
        let mut participant = participant.clone();
        if participant.participant_name.is_none() {
            participant.participant_name = self
                .profile
                .as_ref()
                .and_then(|profile| profile.participant_name.clone());
        }
        let result = request.send(backend, &self.config, &participant).await;
        self.finish_submit(result)
    }

    pub fn render(&self) -> RenderPayload {
        build_render_payload(
            &self.document,
            &self.values,
            &self.signatures,
            &self.errors,
            self.is_read_only(),
        )
    }

    fn ensure_editable(&self) -> Result<(), SessionError> {
        if self.is_read_only() {
            Err(SessionError::ReadOnly)
        } else {
            Ok(())
        }
    }
}
