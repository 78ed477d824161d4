//! Error types for steps and transforms

use folio_model::{ModelError, ReplaceError};
use thiserror::Error;

/// A step that could not be applied to a document.
///
/// Failures are expected during rebasing and undo, where stored steps may
/// no longer fit; callers drop the step and carry on.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct StepFailure {
    pub message: String,
}

impl StepFailure {
    pub fn new(message: impl Into<String>) -> Self {
        StepFailure {
            message: message.into(),
        }
    }
}

impl From<ReplaceError> for StepFailure {
    fn from(e: ReplaceError) -> Self {
        StepFailure::new(e.0)
    }
}

impl From<ModelError> for StepFailure {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Replace(e) => e.into(),
            other => StepFailure::new(other.to_string()),
        }
    }
}

/// Errors raised by the transform helpers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Step failed: {0}")]
    Step(#[from] StepFailure),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),
}

pub type TransformResult<T> = Result<T, TransformError>;
