use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("invalid tag {key:?}={value:?}: only ASCII letters, digits, '-', '.' and '/' are allowed")]
    Invalid { key: String, value: String },

    #[error("label set is empty, no tags to render")]
    Empty,

    #[error("all pairs invalid, no tags to render")]
    AllInvalid,
}

pub type TagResult<T> = Result<T, TagError>;
