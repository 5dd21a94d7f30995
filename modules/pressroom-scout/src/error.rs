use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScoutError>;

/// Failures of a single collaborator call. The discovery engine turns every
/// one of these into an audit step; none escapes `Scout::discover`.
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: &'static str, millis: u128 },

    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Classifier returned {actual} output for a {expected} request")]
    SchemaMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
