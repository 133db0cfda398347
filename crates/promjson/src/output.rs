use std::io::Write;

use anyhow::Context;
use promjson_model::Family;
use promjson_opentsdb::ToLineProtocol;

use crate::cli::OutputFormat;

/// Apply `--label` pairs to every family, in the order given.
pub fn apply_labels(families: &mut [Family], labels: &[(String, String)]) {
    for family in families.iter_mut() {
        for (key, value) in labels {
            family.add_label(key.as_str(), value.as_str());
        }
    }
}

/// Encode `families` into `out` and flush it.
pub fn write_families<W: Write>(
    out: &mut W,
    families: &[Family],
    format: OutputFormat,
    unix_seconds: i64,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, families).context("error marshaling JSON")?;
            out.write_all(b"\n").context("error writing to stdout")?;
        }
        OutputFormat::Opentsdb => {
            for line in families.to_line_protocol(unix_seconds) {
                writeln!(out, "{line}").context("error writing to stdout")?;
            }
        }
    }
    out.flush().context("error writing to stdout")
}

#[cfg(test)]
mod tests {
    use promjson_model::{Entry, FamilyType, Histogram, Labels, Metric};

    use super::*;

    fn families() -> Vec<Family> {
        let mut up = Family::new("up", "Target health.", FamilyType::Gauge);
        up.metrics.push(Entry::Metric(Metric {
            labels: [("job", "api")].into_iter().collect(),
            value: "1".into(),
        }));

        let mut latency = Family::new("latency_seconds", "", FamilyType::Histogram);
        latency.metrics.push(Entry::Histogram(Histogram {
            labels: Labels::new(),
            buckets: [("0.5".to_string(), "2".to_string())].into_iter().collect(),
            count: "2".into(),
            sum: "0.75".into(),
        }));
        vec![up, latency]
    }

    fn render(families: &[Family], format: OutputFormat) -> String {
        let mut out = Vec::new();
        write_families(&mut out, families, format, 1_700_000_000).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn json_is_one_array_and_a_newline() {
        let text = render(&families(), OutputFormat::Json);
        assert!(text.ends_with("]\n"));
        assert_eq!(text.matches('\n').count(), 1);

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["name"], "up");
        assert_eq!(value[0]["type"], "GAUGE");
        assert_eq!(value[0]["metrics"][0]["labels"]["job"], "api");
        assert_eq!(value[1]["metrics"][0]["buckets"]["0.5"], "2");
        assert!(value[1]["metrics"][0].get("labels").is_none());
    }

    #[test]
    fn no_families_is_an_empty_array() {
        assert_eq!(render(&[], OutputFormat::Json), "[]\n");
        assert_eq!(render(&[], OutputFormat::Opentsdb), "");
    }

    #[test]
    fn opentsdb_writes_scalar_series_only() {
        assert_eq!(
            render(&families(), OutputFormat::Opentsdb),
            "put up 1700000000 1.000000 job=api\n"
        );
    }

    #[test]
    fn labels_are_applied_to_scalar_series() {
        let mut families = families();
        apply_labels(
            &mut families,
            &[
                ("job".to_string(), "override".to_string()),
                ("dc".to_string(), "eu-1".to_string()),
            ],
        );

        let labels = families[0].metrics[0].labels();
        assert_eq!(labels.get("job"), Some("override"));
        assert_eq!(labels.get("dc"), Some("eu-1"));
        assert!(families[1].metrics[0].labels().is_empty());
    }
}
