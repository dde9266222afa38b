use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorizeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid token pattern: {0}")]
    InvalidPattern(String),

    #[error("Input type error: {0}")]
    InputType(String),

    #[error("Model is not fitted: {0}")]
    UnfittedModel(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("Invalid snapshot format: {0}")]
    InvalidSnapshotFormat(String),

    #[error("Invalid CSR matrix: {0}")]
    InvalidMatrix(String),

    #[error("Directory walk error: {0}")]
    Walk(String),
}

impl VectorizeError {
    /// True for errors caused by an invalid constructor option
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            VectorizeError::Configuration(_) | VectorizeError::InvalidPattern(_)
        )
    }
}

impl From<std::io::Error> for VectorizeError {
    fn from(err: std::io::Error) -> Self {
        VectorizeError::Io(err.to_string())
    }
}

impl From<regex::Error> for VectorizeError {
    fn from(err: regex::Error) -> Self {
        VectorizeError::InvalidPattern(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VectorizeError>;
