use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the pipeline. None of these are retryable: clustering
/// is a deterministic function of its inputs, so a retry would reproduce the
/// same failure.
#[derive(Debug, Error)]
pub enum Error {
    /// A required column is missing, contains non-finite values, or the
    /// table construction itself is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A configuration value is inconsistent, e.g. the color palette length
    /// does not match the cluster count.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A cell ended label composition with zero or more than one final
    /// label. This indicates a bug in the composition step.
    #[error("merge consistency violated: {0}")]
    MergeConsistency(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
