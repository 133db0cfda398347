use thiserror::Error;

use crate::decode::DecodeError;

/// Boxed error returned by the step that opens a pipeline's input.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("{0}")]
    Source(BoxError),

    #[error("producer task failed: {0}")]
    Producer(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
