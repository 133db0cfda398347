//! Input selection and HTTP retrieval of exposition streams.
mod accept;
pub use accept::{EscapingScheme, accept_header};

mod config;
pub use config::{DEFAULT_HEADER_TIMEOUT_SECS, FetchConfig};

mod error;
pub use error::{FetchError, FetchResult};

mod input;
pub use input::Input;

mod open;
pub use open::{Fetched, fetch, open};
