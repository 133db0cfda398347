//! OpenTSDB line-protocol export for normalized metric families.
mod error;
pub use error::{TagError, TagResult};

mod tags;
pub use tags::{labels_to_tags, sanitize_tag};

mod line;
pub use line::ToLineProtocol;
