use thiserror::Error;

/// Failure while turning an exposition stream into metric-family records.
///
/// Every variant is fatal for the stream it was raised on. Wrapped causes are
/// reachable through `source()` and are not repeated in the message.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("io error")]
    Io(#[from] std::io::Error),

    #[error("reading metric family protocol buffer failed: stream ended inside a record")]
    TruncatedRecord,

    #[error("reading metric family protocol buffer failed: length prefix overflows 64 bits")]
    VarintOverflow,

    #[error("reading metric family protocol buffer failed: record of {len} bytes exceeds limit of {max}")]
    RecordTooLarge { len: u64, max: u64 },

    #[error("reading metric family protocol buffer failed")]
    Protobuf(#[from] prost::DecodeError),

    #[error("reading text format failed")]
    Text(#[from] TextParseError),

    #[error("reading text format failed: input is not valid UTF-8")]
    NotUtf8,
}

/// Text exposition document rejected as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextParseError {
    /// A single line is malformed; `line` is 1-based.
    #[error("text format parsing error in line {line}: {msg}")]
    Line { line: usize, msg: String },

    /// Samples do not fit together into families.
    #[error("text format parsing error: {0}")]
    Document(String),
}

impl TextParseError {
    pub(crate) fn line(line: usize, msg: impl Into<String>) -> Self {
        Self::Line {
            line,
            msg: msg.into(),
        }
    }

    /// Line the error points at, if it concerns a single line.
    pub fn line_number(&self) -> Option<usize> {
        match self {
            Self::Line { line, .. } => Some(*line),
            Self::Document(_) => None,
        }
    }
}
