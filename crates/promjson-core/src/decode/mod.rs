//! Decoding of exposition streams into `MetricFamily` records.
//!
//! Two wire formats are supported: varint length-delimited protobuf and the text format.
//! [`Format::negotiate`] picks one from the `Content-Type` of the source; [`decoder_for`]
//! wraps a byte stream into the matching [`RecordSource`].

mod delimited;
mod error;
mod media;
mod text;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tracing::debug;

pub use delimited::{DelimitedSource, MAX_RECORD_LEN};
pub use error::{DecodeError, TextParseError};
pub use media::MediaType;
pub use text::{TextSource, parse_text};

use crate::proto::MetricFamily;

const PROTOBUF_ESSENCE: &str = "application/vnd.google.protobuf";
const PROTOBUF_PROTO: &str = "io.prometheus.client.MetricFamily";

/// A pull-based stream of decoded metric families.
///
/// `Ok(None)` marks the end of the stream. After an error no further records are produced.
#[async_trait]
pub trait RecordSource: Send {
    async fn next_record(&mut self) -> Result<Option<MetricFamily>, DecodeError>;

    /// Short name of the decoding strategy, for logs.
    fn strategy(&self) -> &'static str;
}

/// Wire format of an exposition stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Delimited,
    Text,
}

impl Format {
    /// Choose the format from a `Content-Type` header value.
    ///
    /// Only the exact protobuf media type with `encoding=delimited` selects [`Format::Delimited`].
    /// A missing or unparseable header, or any other media type, falls back to text.
    pub fn negotiate(content_type: Option<&str>) -> Self {
        let Some(mt) = content_type.and_then(MediaType::parse) else {
            return Format::Text;
        };
        if mt.essence() == PROTOBUF_ESSENCE
            && mt.param("proto") == Some(PROTOBUF_PROTO)
            && mt.param("encoding") == Some("delimited")
        {
            Format::Delimited
        } else {
            Format::Text
        }
    }
}

/// Build a record source for `reader` based on its `Content-Type`.
pub fn decoder_for<R>(content_type: Option<&str>, reader: R) -> Box<dyn RecordSource>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let format = Format::negotiate(content_type);
    debug!(content_type = content_type.unwrap_or(""), ?format, "selected decoder");
    match format {
        Format::Delimited => Box::new(DelimitedSource::new(reader)),
        Format::Text => Box::new(TextSource::new(reader)),
    }
}
