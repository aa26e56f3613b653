//! Error taxonomy of the evaluation engine.
//!
//! Both variants are reported synchronously and never retried: the engine
//! performs no I/O, so there is nothing to retry. Callers surface them to the
//! user and keep their previous state.

use thiserror::Error;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    // ---
    /// Malformed or out-of-range input, e.g. a negative elapsed time.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A load name that is not part of the load set.
    #[error("load '{name}' not found")]
    NotFound { name: String },
}

impl EngineError {
    // ---
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }
}
