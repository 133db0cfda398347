use promjson_model::{Entry, Family};
use time::OffsetDateTime;
use tracing::debug;

use crate::labels_to_tags;

/// Rendering of normalized families as OpenTSDB `put` records.
pub trait ToLineProtocol {
    /// One `put <name> <unix_seconds> <value>[ <tags>]` line per single-value series.
    ///
    /// Series whose value is not a finite number are skipped. Summary and histogram
    /// series are not supported and are skipped as well.
    fn to_line_protocol(&self, unix_seconds: i64) -> Vec<String>;

    /// Same as [`ToLineProtocol::to_line_protocol`], stamped with the current UTC time.
    fn to_line_protocol_now(&self) -> Vec<String> {
        self.to_line_protocol(OffsetDateTime::now_utc().unix_timestamp())
    }
}

impl ToLineProtocol for Family {
    fn to_line_protocol(&self, unix_seconds: i64) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.metrics.len());
        for entry in &self.metrics {
            let metric = match entry {
                Entry::Metric(m) => m,
                Entry::Summary(_) | Entry::Histogram(_) => {
                    debug!(family = %self.name, kind = entry.kind(), "line protocol skips series");
                    continue;
                }
            };

            let value = match metric.value.parse::<f64>() {
                Ok(v) if v.is_finite() => v,
                _ => {
                    debug!(family = %self.name, value = %metric.value, "skipping non-finite value");
                    continue;
                }
            };

            let mut line = format!("put {} {unix_seconds} {value:.6}", self.name);
            if let Ok(tags) = labels_to_tags(&metric.labels) {
                line.push(' ');
                line.push_str(&tags.join(" "));
            }
            lines.push(line);
        }
        lines
    }
}

impl ToLineProtocol for [Family] {
    fn to_line_protocol(&self, unix_seconds: i64) -> Vec<String> {
        self.iter()
            .flat_map(|family| family.to_line_protocol(unix_seconds))
            .collect()
    }
}
