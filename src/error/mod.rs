pub mod job;

use thiserror::Error;

pub use job::{JobError, JobResult};

/// Result type for top-level indexer operations
pub type IndexerResult<T> = Result<T, IndexerError>;

/// Top-level error for the indexer binary and its bootstrap paths.
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Chain error: {0}")]
    ChainError(#[from] ChainError),

    #[error("Extraction error: {0}")]
    ExtractionError(#[from] ExtractionError),

    #[error("Persistence error: {0}")]
    PersistenceError(#[from] PersistenceError),

    #[error("Job error: {0}")]
    JobError(#[from] JobError),

    #[error("Client error: {0}")]
    ClientError(#[from] ClientError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Instrumentation error: {0}")]
    InstrumentationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Failure while reading raw chain state from the node.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("node request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("node rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed node response: {0}")]
    Decode(String),
}

/// Failure decoding a single actor's state into a record.
///
/// Aborts only the extraction in progress; the enclosing batch decides
/// whether to skip or fail based on the configured policy.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("no extractor registered for actor code {0}")]
    NotFound(String),

    #[error("decoding {kind} state: {reason}")]
    StateDecode { kind: &'static str, reason: String },

    #[error("reading actor state: {0}")]
    Chain(#[from] ChainError),
}

/// A write inside a transaction failed for a reason other than a
/// primary-key conflict. The whole transaction is rolled back.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("unknown storage sink {0:?}")]
    UnknownSink(String),

    #[error("opening storage sink: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("initializing schema: {0}")]
    Schema(#[source] sqlx::Error),

    #[error("persisting {kind}: {source}")]
    Write {
        kind: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("transaction failed: {0}")]
    Tx(#[from] sqlx::Error),
}

/// Control API unreachable or returned a malformed/failed response.
/// Surfaced immediately to the caller; no retry at this layer.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("control api unreachable: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("control api request failed: {0}")]
    Api(String),
}
