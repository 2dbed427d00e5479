use muse_vector::VectorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid vector: {0}")]
    InvalidVector(String),

    #[error("catalog cache not ready")]
    NotReady,

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<VectorError> for StoreError {
    fn from(err: VectorError) -> Self {
        match err {
            VectorError::DimensionMismatch { expected, actual } => {
                StoreError::DimensionMismatch { expected, actual }
            }
            VectorError::NonFinite { index } => {
                StoreError::InvalidVector(format!("non-finite value at index {}", index))
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
