//! Error taxonomy for the track pipeline.

use thiserror::Error;

/// Failures raised by a [`DataStore`](crate::store::DataStore).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("relation `{0}` does not exist")]
    UndefinedTable(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("`{0}` is not a valid SQL identifier")]
    InvalidIdentifier(String),
}

#[derive(Debug, Error)]
pub enum TrackError {
    /// The name does not match any visible subject.
    #[error("no subject named `{name}`")]
    NotFound { name: String },

    /// The subject's partition table is missing.
    #[error("no tracking data is available for subject `{subject_id}`")]
    DataUnavailable { subject_id: String },

    #[error("invalid render settings: {0}")]
    InvalidRenderSpec(String),

    /// A row did not have the expected shape.
    #[error("unexpected row: {0}")]
    Decode(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type TrackResult<T> = Result<T, TrackError>;
