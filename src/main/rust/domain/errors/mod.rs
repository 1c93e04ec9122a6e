use thiserror::Error;

use crate::domain::value_objects::{OutputState, ValueType};

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: ValueType, actual: ValueType },

    #[error("Value out of range for {0}")]
    OutOfRange(String),

    #[error("Range bound cannot be converted to {0}")]
    BoundNotConvertible(ValueType),

    #[error("Range validation is not supported for {0}")]
    RangeUnsupported(ValueType),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config store holds no document (load() was never called)")]
    NoDocument,

    #[error("Corrupt config document: {0}")]
    CorruptDocument(String),

    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    #[error("Failed to create {0} output handle")]
    HandleCreationFailed(String),

    #[error("Failed to create {kind} encoder '{id}'")]
    EncoderCreationFailed { kind: String, id: String },

    #[error("Transport refused to start: {0}")]
    StartFailed(String),

    #[error("Unknown output: {0}")]
    UnknownOutput(String),

    #[error("Output {service} is already active ({state})")]
    AlreadyActive { service: String, state: OutputState },
}

pub type Result<T> = std::result::Result<T, DomainError>;
