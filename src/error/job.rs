use crate::error::{ChainError, ExtractionError, PersistenceError};
use crate::types::job::JobId;
use thiserror::Error;

pub type JobResult<T> = Result<T, JobError>;

/// Error types for job control-plane operations.
#[derive(Error, Debug)]
pub enum JobError {
    /// Operation referenced a job id the control plane has never assigned.
    #[error("job {0} not found")]
    NotFound(JobId),

    /// Lifecycle operation is not valid for the job's current status,
    /// e.g. starting a job that is already running.
    #[error("job {id} is {status}: {reason}")]
    InvalidState { id: JobId, status: String, reason: &'static str },

    /// Job configuration rejected before a job was created.
    #[error("invalid job configuration: {0}")]
    InvalidArgument(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("gap scan failed: {0}")]
    Scan(String),

    #[error("{0}")]
    Other(String),
}
