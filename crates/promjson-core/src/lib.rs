//! Decoding, normalization and the producer/consumer pipeline of promjson.
pub mod decode;
pub mod proto;

mod error;
pub use error::{BoxError, CoreError, CoreResult};

mod normalize;
pub use normalize::{family_type, normalize};

mod pipeline;
pub use pipeline::{DEFAULT_QUEUE_CAPACITY, Pipeline, PipelineConfig};

pub use decode::{DecodeError, Format, RecordSource, decoder_for};
