use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetencionError {
    #[error("Unknown withholding concept: {concept_id}")]
    UnknownConcept { concept_id: String },

    #[error("Concept {concept_id} does not apply to subject type {subject_type}")]
    InapplicableConcept {
        concept_id: String,
        subject_type: String,
    },

    #[error("Participant shares sum to {sum}%, outside the ±{tolerance} tolerance around 100%")]
    InvalidShareSum { sum: Decimal, tolerance: Decimal },

    #[error("Consortium needs at least 2 participants, got {count}")]
    InsufficientParticipants { count: usize },

    #[error("Malformed invoice: {0}")]
    MalformedInvoice(String),

    #[error("Participant {index} ({tax_id}): {source}")]
    Participant {
        index: usize,
        tax_id: String,
        #[source]
        source: Box<RetencionError>,
    },

    #[error("Duplicate concept in catalog: {concept_id}")]
    DuplicateConcept { concept_id: String },

    #[error("Unrecognized subject type: {0}")]
    UnrecognizedSubjectType(String),

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Flat discriminant of [`RetencionError`], for callers that map failures to
/// status codes or compare outcomes without inspecting payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownConcept,
    InapplicableConcept,
    InvalidShareSum,
    InsufficientParticipants,
    MalformedInvoice,
    DuplicateConcept,
    UnrecognizedSubjectType,
    InvalidInput,
    Serialization,
}

impl RetencionError {
    /// Kind of the underlying failure. Participant wrappers report the kind of
    /// the error they carry.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RetencionError::UnknownConcept { .. } => ErrorKind::UnknownConcept,
            RetencionError::InapplicableConcept { .. } => ErrorKind::InapplicableConcept,
            RetencionError::InvalidShareSum { .. } => ErrorKind::InvalidShareSum,
            RetencionError::InsufficientParticipants { .. } => {
                ErrorKind::InsufficientParticipants
            }
            RetencionError::MalformedInvoice(_) => ErrorKind::MalformedInvoice,
            RetencionError::Participant { source, .. } => source.kind(),
            RetencionError::DuplicateConcept { .. } => ErrorKind::DuplicateConcept,
            RetencionError::UnrecognizedSubjectType(_) => ErrorKind::UnrecognizedSubjectType,
            RetencionError::InvalidInput { .. } => ErrorKind::InvalidInput,
            RetencionError::SerializationError(_) => ErrorKind::Serialization,
        }
    }

    pub(crate) fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RetencionError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for RetencionError {
    fn from(e: serde_json::Error) -> Self {
        RetencionError::SerializationError(e.to_string())
    }
}
