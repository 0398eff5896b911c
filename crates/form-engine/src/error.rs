use thiserror::Error;

use crate::validate::ErrorMap;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failure reported by a [`crate::backend::FormsBackend`] call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{operation} failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },
}

impl BackendError {
    pub fn request(operation: &'static str, message: impl Into<String>) -> Self {
        BackendError::Request {
            operation,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("signature payload is not a PNG data URL")]
    InvalidDataUrl,
    #[error("signature payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to decode signature image: {0}")]
    Decode(#[from] png::DecodingError),
    #[error("failed to encode signature image: {0}")]
    Encode(#[from] png::EncodingError),
    #[error("unsupported signature image layout")]
    UnsupportedLayout,
    #[error("signature capture is read-only")]
    ReadOnly,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0} is not available")]
    NotFound(&'static str),
    #[error("duplicate field keys in template: {}", .0.join(", "))]
    DuplicateFieldKeys(Vec<String>),
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("field '{field}' is a {kind} field and cannot hold that value")]
    WrongFieldType { field: String, kind: &'static str },
    #[error("the form is read-only")]
    ReadOnly,
    #[error("no signature capture is open")]
    NoActiveCapture,
    #[error(transparent)]
    Signature(#[from] SignatureError),
}

/// Which write of the submission chain failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStage {
    CreateSubmission,
    AddValue,
    AddSignature,
}

impl SubmitStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitStage::CreateSubmission => "create_submission",
            SubmitStage::AddValue => "add_submission_value",
            SubmitStage::AddSignature => "add_submission_signature",
        }
    }
}

impl std::fmt::Display for SubmitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("form has {} validation error(s)", .0.len())]
    Invalid(ErrorMap),
    #[error("a submission is already in flight")]
    InFlight,
    #[error("the form is read-only")]
    ReadOnly,
    /// Writes that completed before the failure are not rolled back.
    #[error("{stage} failed after {completed_writes} completed write(s): {source}")]
    Backend {
        stage: SubmitStage,
        completed_writes: usize,
        submission_id: Option<String>,
        #[source]
        source: BackendError,
    },
}
