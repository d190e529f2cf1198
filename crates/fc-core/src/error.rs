//! Simulator error type.
//!
//! Sub-crates define their own error enums and convert `FcError` into them
//! via `From`, or use it directly.  The variants follow the simulator's error
//! taxonomy:
//!
//! | Variant     | Meaning                                                    |
//! |-------------|------------------------------------------------------------|
//! | `Config`    | malformed agent or run parameters, caught at entry time    |
//! | `Invariant` | solver or bookkeeping bug; always terminates the run       |
//! | `Capacity`  | a `ResourceBuf` push would exceed its capacity             |
//! | `Value`     | an argument out of range (pop more than held, past time)   |
//! | `Key`       | duplicate or unknown key (prototype, resource, requester)  |
//!
//! Policy warnings (skipped zero-capacity constraints, renormalised ratios)
//! are not errors; they are `tracing::warn!` events.

use thiserror::Error;

/// The top-level error type for `fc-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum FcError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invariant violation: {0}")]
    Invariant(String),

    #[error("capacity exceeded: pushing {qty} with only {space} space left")]
    Capacity { qty: f64, space: f64 },

    #[error("value error: {0}")]
    Value(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FcError {
    /// `true` for errors that must terminate the whole run.
    ///
    /// Invariant violations always are; everything else is fatal only if the
    /// caller decides so.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FcError::Invariant(_))
    }

    /// Shorthand for building an [`FcError::Invariant`].
    pub fn invariant(msg: impl Into<String>) -> Self {
        FcError::Invariant(msg.into())
    }
}

/// Shorthand result type for all `fc-*` crates.
pub type FcResult<T> = Result<T, FcError>;
