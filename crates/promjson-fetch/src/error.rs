use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("error opening file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("building HTTP client failed: {0}")]
    Client(#[source] reqwest::Error),

    #[error("executing GET request for URL {url:?} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET request for URL {url:?} returned HTTP status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("GET request for URL {url:?} received no response headers within {after:?}")]
    HeaderTimeout { url: String, after: Duration },

    #[error("loading client certificate failed: {0}")]
    Identity(String),

    #[error("client certificate and key must be given together")]
    CertKeyMismatch,

    #[error("invalid escaping scheme: {0} (expected: allow-utf-8|underscores|dots|values)")]
    InvalidEscaping(String),
}

pub type FetchResult<T> = Result<T, FetchError>;
