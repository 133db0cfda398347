use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown metric type: {0}")]
    UnknownType(String),

    #[error("entry {index} of family '{family}' does not fit type {expected}")]
    ShapeMismatch {
        family: String,
        index: usize,
        expected: &'static str,
    },

    #[error("invalid model: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
