use async_trait::async_trait;
use prost::Message;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tracing::trace;

use crate::decode::{DecodeError, RecordSource};
use crate::proto::MetricFamily;

/// Upper bound for a single delimited record.
///
/// A corrupt length prefix must not turn into a multi-gigabyte allocation.
pub const MAX_RECORD_LEN: u64 = 64 * 1024 * 1024;

/// Longest base-128 varint encoding of a `u64`.
const MAX_VARINT_LEN: usize = 10;

/// Reads varint length-prefixed `MetricFamily` records from a byte stream.
///
/// End of stream is only clean at a record boundary; anything else is an error and no
/// further records are produced, since framing cannot be recovered.
pub struct DelimitedSource<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    records: usize,
}

impl<R> DelimitedSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
            records: 0,
        }
    }

    /// Reads the length prefix; `None` on a clean end of stream.
    async fn read_len(&mut self) -> Result<Option<u64>, DecodeError> {
        let mut value = 0u64;
        for i in 0..MAX_VARINT_LEN {
            let mut byte = [0u8; 1];
            if self.reader.read(&mut byte).await? == 0 {
                return if i == 0 {
                    Ok(None)
                } else {
                    Err(DecodeError::TruncatedRecord)
                };
            }

            let b = byte[0];
            if i == MAX_VARINT_LEN - 1 && b > 1 {
                return Err(DecodeError::VarintOverflow);
            }
            value |= u64::from(b & 0x7f) << (7 * i);
            if b & 0x80 == 0 {
                return Ok(Some(value));
            }
        }
        Err(DecodeError::VarintOverflow)
    }
}

#[async_trait]
impl<R> RecordSource for DelimitedSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn next_record(&mut self) -> Result<Option<MetricFamily>, DecodeError> {
        let Some(len) = self.read_len().await? else {
            trace!(records = self.records, "delimited stream finished");
            return Ok(None);
        };
        if len > MAX_RECORD_LEN {
            return Err(DecodeError::RecordTooLarge {
                len,
                max: MAX_RECORD_LEN,
            });
        }

        self.buf.resize(len as usize, 0);
        self.reader
            .read_exact(&mut self.buf)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::UnexpectedEof => DecodeError::TruncatedRecord,
                _ => DecodeError::Io(e),
            })?;

        let mf = MetricFamily::decode(self.buf.as_slice())?;
        self.records += 1;
        trace!(family = mf.name(), len, "decoded delimited record");
        Ok(Some(mf))
    }

    fn strategy(&self) -> &'static str {
        "delimited"
    }
}
