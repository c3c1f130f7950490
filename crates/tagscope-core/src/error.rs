//! Error types for tagscope

use crate::value::FieldKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TagscopeError>;

#[derive(Error, Debug)]
pub enum TagscopeError {
    #[error("Invalid record kind: expected a record, found {found}")]
    InvalidRecordKind { found: FieldKind },

    #[error("Pointer required: {reason}")]
    PointerRequired { reason: String },

    #[error("Field resolution failed: {path}")]
    FieldResolutionFailure { path: String },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: FieldKind },

    #[error("Value out of range for {target}: {value}")]
    OutOfRange { target: String, value: String },

    #[error("Value decode failed for {variable}: {reason}")]
    ValueDecodeError { variable: String, reason: String },

    #[error("Input variable not found: {name}")]
    VariableNotFound { name: String },

    #[error("Serialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },
}

impl TagscopeError {
    pub(crate) fn mismatch(expected: &str, found: FieldKind) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            found,
        }
    }

    pub(crate) fn out_of_range(target: &str, value: impl ToString) -> Self {
        Self::OutOfRange {
            target: target.to_string(),
            value: value.to_string(),
        }
    }
}
