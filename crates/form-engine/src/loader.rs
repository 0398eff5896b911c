//! Initial loads for an editing session. Each fetch is awaited on its own;
//! a failed fetch is logged and leaves its slot empty for the host to report.

use std::fmt::Display;

use tracing::warn;

use crate::backend::FormsBackend;
use crate::records::{FormSubmission, ParticipantProfile, SignatureRecord, ValueRecord};
use crate::spec::{FieldDefinition, FormTemplate};

#[derive(Debug, Clone, Default)]
pub struct LoadedForm {
    pub template: Option<FormTemplate>,
    pub fields: Option<Vec<FieldDefinition>>,
    pub profile: Option<ParticipantProfile>,
    pub submission: Option<FormSubmission>,
    pub values: Option<Vec<ValueRecord>>,
    pub signatures: Option<Vec<SignatureRecord>>,
}

/// Loads what a new submission needs: template, fields and participant.
pub async fn load_for_create<B: FormsBackend + ?Sized>(
    backend: &B,
    template_id: &str,
    client_id: &str,
) -> LoadedForm {
    let (template, fields, profile) = tokio::join!(
        backend.get_template(template_id),
        backend.get_fields(template_id),
        backend.get_participant_profile(client_id),
    );
    LoadedForm {
        template: settle("get_template", template),
        fields: settle("get_fields", fields),
        profile: settle("get_participant_profile", profile),
        ..LoadedForm::default()
    }
}

/// Loads an existing submission with its template, participant, values and
/// signatures, for editing or viewing.
pub async fn load_submission<B: FormsBackend + ?Sized>(
    backend: &B,
    submission_id: &str,
) -> LoadedForm {
    let Some(submission) = settle("get_submission", backend.get_submission(submission_id).await)
    else {
        return LoadedForm::default();
    };
    let (template, fields, profile, values, signatures) = tokio::join!(
        backend.get_template(&submission.template_id),
        backend.get_fields(&submission.template_id),
        backend.get_participant_profile(&submission.client_id),
        backend.get_submission_values(submission_id),
        backend.get_submission_signatures(submission_id),
    );
    LoadedForm {
        template: settle("get_template", template),
        fields: settle("get_fields", fields),
        profile: settle("get_participant_profile", profile),
        submission: Some(submission),
        values: settle("get_submission_values", values),
        signatures: settle("get_submission_signatures", signatures),
    }
}

fn settle<T, E: Display>(operation: &'static str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(operation, %error, "initial load failed");
            None
        }
    }
}
