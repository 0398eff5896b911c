#![allow(missing_docs)]

pub mod backend;
pub mod config;
pub mod error;
pub mod expr;
pub mod handlers;
pub mod loader;
pub mod prefill;
pub mod records;
pub mod render;
pub mod schema;
pub mod session;
pub mod signature;
pub mod spec;
pub mod submission;
pub mod validate;
pub mod value;
pub mod visibility;

pub use backend::{FormsBackend, InMemoryBackend};
pub use config::{CanvasConfig, EngineConfig, SubmissionConfig};
pub use error::{BackendError, ConfigError, SessionError, SignatureError, SubmitError, SubmitStage};
pub use expr::{Condition, ConditionOperator};
pub use handlers::FieldHandler;
pub use loader::{LoadedForm, load_for_create, load_submission};
pub use prefill::PrefillResolver;
pub use records::{
    FormSubmission, NdisDetails, NewSubmission, ParticipantProfile, SignatureRecord,
    SubmissionStatus, ValueRecord,
};
pub use render::{
    RenderField, RenderPayload, RenderProgress, RenderSection, RenderStatus, build_render_payload,
    render_json_ui, render_text,
};
pub use schema::generate as values_schema;
pub use session::{FormSession, SessionMode, SubmissionRequest};
pub use signature::{DisplayRect, PNG_DATA_URL_PREFIX, Point, SignaturePad};
pub use spec::{FieldDefinition, FieldOption, FieldType, FieldWidth, FormTemplate, TemplateDocument};
pub use submission::{ParticipantContext, SubmissionAssembler};
pub use validate::{ErrorMap, ValidationContext, validate_all, validate_field};
pub use value::{FieldValue, SignatureStore, ValueStore};
pub use visibility::{VisibilityMap, is_visible, resolve_visibility, visible_fields};
