use folio_model::ModelError;
use folio_transform::StepFailure;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollabError {
    #[error("Version conflict: expected {expected}, got {got}")]
    VersionConflict { expected: u64, got: u64 },

    #[error("Steps since version {requested} were pruned, oldest kept is {oldest}")]
    HistoryPruned { requested: u64, oldest: u64 },

    #[error("Step failed: {0}")]
    Step(#[from] StepFailure),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Authority service stopped")]
    ServiceClosed,
}

pub type CollabResult<T> = Result<T, CollabError>;
