use fc_core::{AgentId, FcError};
use fc_output::OutputError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Fc(#[from] FcError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),

    #[error("no prototype named '{0}'")]
    UnknownPrototype(String),

    #[error("{0} is not a live agent")]
    AgentNotFound(AgentId),
}

impl SimError {
    /// True for solver or bookkeeping bugs, as opposed to bad input.
    pub fn is_invariant(&self) -> bool {
        matches!(self, SimError::Fc(e) if e.is_fatal())
    }
}

pub type SimResult<T> = Result<T, SimError>;
