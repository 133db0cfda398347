use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, Serializer};

use crate::FetchError;

const PROTOBUF_RANGE: &str =
    "application/vnd.google.protobuf;proto=io.prometheus.client.MetricFamily;encoding=delimited";
const TEXT_RANGE: &str = "text/plain;version=0.0.4";

/// How a server should render metric and label names outside the legacy character set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapingScheme {
    AllowUtf8,
    Underscores,
    Dots,
    Values,
}

impl FromStr for EscapingScheme {
    type Err = FetchError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow-utf-8" => Ok(Self::AllowUtf8),
            "underscores" => Ok(Self::Underscores),
            "dots" => Ok(Self::Dots),
            "values" => Ok(Self::Values),
            _ => Err(FetchError::InvalidEscaping(s.to_string())),
        }
    }
}

impl fmt::Display for EscapingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EscapingScheme::AllowUtf8 => "allow-utf-8",
            EscapingScheme::Underscores => "underscores",
            EscapingScheme::Dots => "dots",
            EscapingScheme::Values => "values",
        })
    }
}

impl Serialize for EscapingScheme {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EscapingScheme {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// `Accept` header preferring delimited protobuf over text format 0.0.4.
///
/// With an escaping scheme, `escaping=<scheme>` is added before the quality weight. The text
/// decoder only reads legacy metric and label names, so `allow-utf-8` is offered on the
/// protobuf range alone; the text range then gets the server's default escaping.
///
/// # Examples
/// ```
/// use promjson_fetch::{EscapingScheme, accept_header};
///
/// assert!(accept_header(None).ends_with(";q=0.7,text/plain;version=0.0.4;q=0.3"));
/// assert!(accept_header(Some(EscapingScheme::Dots)).contains("version=0.0.4;escaping=dots;q=0.3"));
/// ```
pub fn accept_header(escaping: Option<EscapingScheme>) -> String {
    match escaping {
        None => format!("{PROTOBUF_RANGE};q=0.7,{TEXT_RANGE};q=0.3"),
        Some(EscapingScheme::AllowUtf8) => format!(
            "{PROTOBUF_RANGE};escaping={};q=0.7,{TEXT_RANGE};q=0.3",
            EscapingScheme::AllowUtf8
        ),
        Some(scheme) => format!(
            "{PROTOBUF_RANGE};escaping={scheme};q=0.7,{TEXT_RANGE};escaping={scheme};q=0.3"
        ),
    }
}
