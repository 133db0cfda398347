use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{EscapingScheme, FetchError, FetchResult};

/// Default time to wait for response headers.
pub const DEFAULT_HEADER_TIMEOUT_SECS: u64 = 60;

/// HTTP retrieval settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// PEM client certificate; requires `key`.
    pub cert: Option<PathBuf>,
    /// PEM private key of the client certificate; requires `cert`.
    pub key: Option<PathBuf>,
    /// Skip server certificate verification. Insecure.
    pub accept_invalid_cert: bool,
    /// Time allowed until the response headers arrive. The body has no deadline.
    pub header_timeout_secs: u64,
    /// Escaping scheme requested through the `Accept` header.
    pub escaping: Option<EscapingScheme>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            cert: None,
            key: None,
            accept_invalid_cert: false,
            header_timeout_secs: DEFAULT_HEADER_TIMEOUT_SECS,
            escaping: None,
        }
    }
}

impl FetchConfig {
    /// Checks that the client certificate and key are given together.
    pub fn validate(&self) -> FetchResult<()> {
        match (&self.cert, &self.key) {
            (Some(_), None) | (None, Some(_)) => Err(FetchError::CertKeyMismatch),
            _ => Ok(()),
        }
    }

    pub fn header_timeout(&self) -> Duration {
        Duration::from_secs(self.header_timeout_secs)
    }
}
