use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use promjson_core::{DEFAULT_QUEUE_CAPACITY, PipelineConfig};
use promjson_fetch::{DEFAULT_HEADER_TIMEOUT_SECS, EscapingScheme, FetchConfig};
use promjson_observe::{LoggerConfig, LoggerFormat, LoggerLevel};

const ENV_CERT: &str = "PROMJSON_CERT";
const ENV_KEY: &str = "PROMJSON_KEY";
const ENV_ACCEPT_INVALID_CERT: &str = "PROMJSON_ACCEPT_INVALID_CERT";
const ENV_ESCAPING: &str = "PROMJSON_ESCAPING";
const ENV_FORMAT: &str = "PROMJSON_FORMAT";
const ENV_QUEUE_CAPACITY: &str = "PROMJSON_QUEUE_CAPACITY";
const ENV_HEADER_TIMEOUT: &str = "PROMJSON_HEADER_TIMEOUT";
const ENV_LOG_LEVEL: &str = "PROMJSON_LOG_LEVEL";
const ENV_LOG_FORMAT: &str = "PROMJSON_LOG_FORMAT";

/// Output encoding of the converted families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON array of families.
    Json,
    /// OpenTSDB `put` lines for counters, gauges and untyped metrics.
    Opentsdb,
}

#[derive(Debug, Parser)]
#[command(name = "promjson")]
#[command(version, about = "Convert Prometheus metrics exposition to JSON", long_about = None)]
pub struct Cli {
    /// Metrics file or URL; standard input when omitted or empty
    #[arg(value_name = "METRICS_PATH | METRICS_URL")]
    pub input: Option<String>,

    /// Client certificate file (PEM)
    #[arg(long, env = ENV_CERT, requires = "key", value_name = "CERT_PATH")]
    pub cert: Option<PathBuf>,

    /// Client certificate's key file (PEM)
    #[arg(long, env = ENV_KEY, requires = "cert", value_name = "KEY_PATH")]
    pub key: Option<PathBuf>,

    /// Accept any certificate during TLS handshake. Insecure, use only for testing
    #[arg(long, env = ENV_ACCEPT_INVALID_CERT)]
    pub accept_invalid_cert: bool,

    /// Name escaping scheme to request: allow-utf-8, underscores, dots or values
    #[arg(long, env = ENV_ESCAPING)]
    pub escaping: Option<EscapingScheme>,

    /// Output format
    #[arg(long, value_enum, env = ENV_FORMAT, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Label added to every counter, gauge and untyped series (repeatable)
    #[arg(long = "label", value_name = "KEY=VALUE", value_parser = parse_label)]
    pub labels: Vec<(String, String)>,

    /// Raw families buffered between fetching and conversion
    #[arg(long, env = ENV_QUEUE_CAPACITY, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Seconds to wait for response headers
    #[arg(long, env = ENV_HEADER_TIMEOUT, value_name = "SECS", default_value_t = DEFAULT_HEADER_TIMEOUT_SECS)]
    pub header_timeout: u64,

    /// Diagnostics filter, e.g. "warn" or "promjson_fetch=debug,warn"
    #[arg(long, env = ENV_LOG_LEVEL, default_value = "warn")]
    pub log_level: LoggerLevel,

    /// Diagnostics format: text or json
    #[arg(long, env = ENV_LOG_FORMAT, default_value = "text")]
    pub log_format: LoggerFormat,
}

impl Cli {
    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig {
            format: self.log_format,
            level: self.log_level.clone(),
            ..Default::default()
        }
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            cert: self.cert.clone(),
            key: self.key.clone(),
            accept_invalid_cert: self.accept_invalid_cert,
            header_timeout_secs: self.header_timeout,
            escaping: self.escaping,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            queue_capacity: self.queue_capacity,
        }
    }
}

/// Parse `key=value`; the value may be empty, the key may not.
fn parse_label(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid label '{s}', expected KEY=VALUE")),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["promjson"]).unwrap();

        assert!(cli.input.is_none());
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.labels.is_empty());
        assert_eq!(cli.pipeline_config(), PipelineConfig::default());
        assert_eq!(cli.fetch_config(), FetchConfig::default());
        assert_eq!(cli.header_timeout, DEFAULT_HEADER_TIMEOUT_SECS);
        assert_eq!(cli.logger_config().level.as_str(), "warn");
        assert_eq!(cli.logger_config().format, LoggerFormat::Text);
    }

    #[test]
    fn cert_requires_key_and_vice_versa() {
        for args in [
            vec!["promjson", "--cert", "c.pem", "https://h/metrics"],
            vec!["promjson", "--key", "k.pem", "https://h/metrics"],
        ] {
            let err = Cli::try_parse_from(args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
            assert_eq!(err.exit_code(), 2);
        }

        let cli = Cli::try_parse_from([
            "promjson",
            "--cert",
            "c.pem",
            "--key",
            "k.pem",
            "https://h/metrics",
        ])
        .unwrap();
        assert!(cli.fetch_config().validate().is_ok());
    }

    #[test]
    fn parses_every_flag() {
        let cli = Cli::try_parse_from([
            "promjson",
            "--accept-invalid-cert",
            "--escaping",
            "underscores",
            "--format",
            "opentsdb",
            "--label",
            "host=web-1",
            "--label",
            "dc=",
            "--queue-capacity",
            "8",
            "--header-timeout",
            "5",
            "--log-level",
            "promjson_core=debug,warn",
            "--log-format",
            "json",
            "metrics.txt",
        ])
        .unwrap();

        assert_eq!(cli.input.as_deref(), Some("metrics.txt"));
        assert_eq!(cli.format, OutputFormat::Opentsdb);
        assert_eq!(
            cli.labels,
            vec![
                ("host".to_string(), "web-1".to_string()),
                ("dc".to_string(), String::new())
            ]
        );

        let fetch = cli.fetch_config();
        assert!(fetch.accept_invalid_cert);
        assert_eq!(fetch.escaping, Some(EscapingScheme::Underscores));
        assert_eq!(fetch.header_timeout_secs, 5);
        assert_eq!(cli.pipeline_config().queue_capacity, 8);
        assert_eq!(cli.logger_config().format, LoggerFormat::Json);
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            vec!["promjson", "--label", "novalue"],
            vec!["promjson", "--label", "=x"],
            vec!["promjson", "--escaping", "hex"],
            vec!["promjson", "--format", "xml"],
            vec!["promjson", "--log-level", "promjson=loud"],
            vec!["promjson", "a", "b"],
        ];
        for args in bad {
            let err = Cli::try_parse_from(args.clone()).unwrap_err();
            assert_eq!(err.exit_code(), 2, "{args:?}");
        }
    }

    #[test]
    fn label_parser_keeps_equals_in_value() {
        assert_eq!(
            parse_label("query=a=b").unwrap(),
            ("query".to_string(), "a=b".to_string())
        );
    }
}
