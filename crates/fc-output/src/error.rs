//! Error types for fc-output.

use thiserror::Error;

use crate::value::ValueKind;

/// Errors raised while recording or flushing output.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("datum for table '{0}' has no columns")]
    EmptyDatum(String),

    #[error("table '{table}': column '{column}' was {expected} but got {got}")]
    TypeMismatch {
        table:    String,
        column:   String,
        expected: ValueKind,
        got:      ValueKind,
    },

    #[error("table '{table}': columns {got:?} do not match schema {expected:?}")]
    SchemaMismatch {
        table:    String,
        expected: Vec<String>,
        got:      Vec<String>,
    },

    #[error("recorder is closed")]
    Closed,

    #[error("backend '{backend}' failed: {msg}")]
    Backend { backend: &'static str, msg: String },
}

/// Alias for `Result<T, OutputError>`.
pub type OutputResult<T> = Result<T, OutputError>;
