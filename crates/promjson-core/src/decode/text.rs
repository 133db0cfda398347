use std::collections::HashMap;

use async_trait::async_trait;
use prometheus_parse::{LineInfo, Sample, Scrape, Value};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::decode::{DecodeError, RecordSource, TextParseError};
use crate::proto::{
    self, Bucket, Counter, Gauge, LabelPair, Metric, MetricFamily, MetricType, Quantile, Untyped,
};

const SUFFIXES: [&str; 3] = ["_bucket", "_sum", "_count"];

/// Record source over a text exposition document.
///
/// The whole input is read and parsed on the first call; the document either parses
/// completely or yields nothing.
pub struct TextSource<R> {
    reader: Option<R>,
    parsed: std::vec::IntoIter<MetricFamily>,
}

impl<R> TextSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            parsed: Vec::new().into_iter(),
        }
    }
}

#[async_trait]
impl<R> RecordSource for TextSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn next_record(&mut self) -> Result<Option<MetricFamily>, DecodeError> {
        if let Some(mut reader) = self.reader.take() {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).await?;
            let text = String::from_utf8(buf).map_err(|_| DecodeError::NotUtf8)?;

            let families = parse_text(&text)?;
            debug!(families = families.len(), "parsed text document");
            self.parsed = families.into_iter();
        }
        Ok(self.parsed.next())
    }

    fn strategy(&self) -> &'static str {
        "text"
    }
}

/// Parse a text exposition document (format version 0.0.4) with `prometheus-parse`.
///
/// Lines are checked first, so a line the scrape would skip fails the whole document.
/// The scraped samples are then regrouped into families: `_sum` and `_count` samples join
/// the summary or histogram series with the same label set.
///
/// Families come in order of first appearance. Series of scalar families keep their order;
/// summary and histogram series are ordered by label set. Families without samples are
/// dropped.
pub fn parse_text(input: &str) -> Result<Vec<MetricFamily>, TextParseError> {
    let seen = check_lines(input)?;
    let Scrape { docs, samples, .. } = Scrape::parse(input.lines().map(|line| Ok(line.to_owned())))
        .map_err(|e| TextParseError::Document(e.to_string()))?;

    let mut families = group(samples)?;
    apply_help(&mut families, &docs);

    let mut out = Vec::with_capacity(families.len());
    for name in &seen {
        let Some(key) = resolve(name, &families) else {
            continue;
        };
        if let Some(family) = families.remove(&key) {
            out.push(family.finish());
        }
    }

    let mut rest: Vec<MetricFamily> = families.into_values().map(FamilyState::finish).collect();
    rest.sort_by(|a, b| a.name().cmp(b.name()));
    out.extend(rest);
    Ok(out)
}

/// Metric names in line order. Fails on lines the scrape would drop without a trace.
fn check_lines(input: &str) -> Result<Vec<String>, TextParseError> {
    let mut names = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let lineno = i + 1;
        let name = match LineInfo::parse(line) {
            LineInfo::Doc { metric_name, .. } => metric_name.to_string(),
            LineInfo::Type { metric_name, .. } => metric_name.to_string(),
            LineInfo::Sample {
                metric_name,
                value,
                timestamp,
                ..
            } => {
                if value.parse::<f64>().is_err() {
                    return Err(TextParseError::line(
                        lineno,
                        format!("expected float as value, got {value:?}"),
                    ));
                }
                if let Some(ts) = timestamp {
                    if ts.parse::<i64>().is_err() {
                        return Err(TextParseError::line(
                            lineno,
                            format!("expected integer as timestamp, got {ts:?}"),
                        ));
                    }
                }
                metric_name.to_string()
            }
            _ => {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                return Err(TextParseError::line(
                    lineno,
                    format!("unparsable sample {trimmed:?}"),
                ));
            }
        };
        names.push(name);
    }
    Ok(names)
}

struct FamilyState {
    mf: MetricFamily,
    /// Summary and histogram series by sorted label set.
    series: HashMap<Vec<(String, String)>, usize>,
}

impl FamilyState {
    fn new(name: &str, kind: MetricType) -> Self {
        Self {
            mf: MetricFamily::with_type(name, kind),
            series: HashMap::new(),
        }
    }

    fn kind(&self) -> MetricType {
        self.mf.r#type()
    }

    fn series_mut(&mut self, labels: Vec<(String, String)>) -> &mut Metric {
        let kind = self.kind();
        let metrics = &mut self.mf.metric;
        let idx = *self.series.entry(labels.clone()).or_insert_with(|| {
            let mut metric = Metric {
                label: pairs(labels),
                ..Default::default()
            };
            match kind {
                MetricType::Summary => metric.summary = Some(proto::Summary::default()),
                _ => metric.histogram = Some(proto::Histogram::default()),
            }
            metrics.push(metric);
            metrics.len() - 1
        });
        &mut metrics[idx]
    }

    fn finish(mut self) -> MetricFamily {
        if matches!(self.kind(), MetricType::Summary | MetricType::Histogram) {
            self.mf.metric.sort_by(|a, b| label_key(a).cmp(&label_key(b)));
        }
        self.mf
    }
}

/// Regroup scraped samples into one state per family name.
fn group(samples: Vec<Sample>) -> Result<HashMap<String, FamilyState>, TextParseError> {
    let mut composite: HashMap<String, MetricType> = HashMap::new();
    for sample in &samples {
        match &sample.value {
            Value::Histogram(_) => {
                let base = sample.metric.strip_suffix("_bucket").unwrap_or(&sample.metric);
                composite.insert(base.to_string(), MetricType::Histogram);
            }
            Value::Summary(_) => {
                composite.insert(sample.metric.clone(), MetricType::Summary);
            }
            _ => {}
        }
    }

    let mut families: HashMap<String, FamilyState> = HashMap::new();
    for sample in samples {
        let labels = labels(&sample.labels);
        let (kind, v) = match sample.value {
            Value::Histogram(counts) => {
                let base = sample.metric.strip_suffix("_bucket").unwrap_or(&sample.metric);
                let state = families
                    .entry(base.to_string())
                    .or_insert_with(|| FamilyState::new(base, MetricType::Histogram));
                let h = state.series_mut(labels).histogram.get_or_insert_with(Default::default);
                h.bucket.extend(counts.into_iter().map(|c| Bucket {
                    cumulative_count: Some(c.count as u64),
                    upper_bound: Some(c.less_than),
                }));
                continue;
            }
            Value::Summary(counts) => {
                let state = families
                    .entry(sample.metric.clone())
                    .or_insert_with(|| FamilyState::new(&sample.metric, MetricType::Summary));
                let s = state.series_mut(labels).summary.get_or_insert_with(Default::default);
                s.quantile.extend(counts.into_iter().map(|c| Quantile {
                    quantile: Some(c.quantile),
                    value: Some(c.count),
                }));
                continue;
            }
            Value::Counter(v) => (MetricType::Counter, v),
            Value::Gauge(v) => (MetricType::Gauge, v),
            Value::Untyped(v) => (MetricType::Untyped, v),
        };

        if let Some((base, suffix)) = composite_part(&sample.metric, &composite) {
            let base_kind = composite[base];
            let state = families
                .entry(base.to_string())
                .or_insert_with(|| FamilyState::new(base, base_kind));
            attach(state, labels, suffix, v).map_err(|what| {
                TextParseError::Document(format!(
                    "sample {:?} of {} family {base:?} {what}",
                    sample.metric,
                    kind_name(base_kind),
                ))
            })?;
            continue;
        }

        let state = families
            .entry(sample.metric.clone())
            .or_insert_with(|| FamilyState::new(&sample.metric, kind));
        state.mf.metric.push(scalar(kind, labels, v));
    }
    Ok(families)
}

fn kind_name(kind: MetricType) -> &'static str {
    match kind {
        MetricType::Counter => "counter",
        MetricType::Gauge => "gauge",
        MetricType::Summary => "summary",
        MetricType::Untyped => "untyped",
        MetricType::Histogram => "histogram",
    }
}

/// Split `name` into a summary or histogram base and the suffix it carries, if it has one.
fn composite_part<'a>(
    name: &'a str,
    composite: &HashMap<String, MetricType>,
) -> Option<(&'a str, &'static str)> {
    if composite.contains_key(name) {
        return Some((name, ""));
    }
    SUFFIXES.iter().find_map(|suffix| {
        name.strip_suffix(suffix)
            .filter(|base| composite.contains_key(*base))
            .map(|base| (base, *suffix))
    })
}

/// Fold a `_sum` or `_count` sample into its series.
fn attach(
    state: &mut FamilyState,
    labels: Vec<(String, String)>,
    suffix: &str,
    v: f64,
) -> Result<(), &'static str> {
    let kind = state.kind();
    let metric = match suffix {
        "_sum" | "_count" => state.series_mut(labels),
        "_bucket" => return Err("is missing its 'le' label"),
        _ if kind == MetricType::Summary => return Err("is missing its 'quantile' label"),
        _ => return Err("needs a _bucket, _sum or _count suffix"),
    };

    match kind {
        MetricType::Summary => {
            let s = metric.summary.get_or_insert_with(Default::default);
            if suffix == "_sum" {
                s.sample_sum = Some(v);
            } else {
                s.sample_count = Some(v as u64);
            }
        }
        _ => {
            let h = metric.histogram.get_or_insert_with(Default::default);
            if suffix == "_sum" {
                h.sample_sum = Some(v);
            } else {
                h.sample_count = Some(v as u64);
            }
        }
    }
    Ok(())
}

fn scalar(kind: MetricType, labels: Vec<(String, String)>, v: f64) -> Metric {
    let mut metric = Metric {
        label: pairs(labels),
        ..Default::default()
    };
    match kind {
        MetricType::Counter => metric.counter = Some(Counter { value: Some(v) }),
        MetricType::Gauge => metric.gauge = Some(Gauge { value: Some(v) }),
        _ => metric.untyped = Some(Untyped { value: Some(v) }),
    }
    metric
}

/// Sorted label pairs with escapes resolved. The scrape leaves keys untrimmed.
fn labels(scraped: &prometheus_parse::Labels) -> Vec<(String, String)> {
    let mut labels: Vec<(String, String)> = scraped
        .iter()
        .map(|(k, v)| (k.trim().to_string(), unescape(v)))
        .collect();
    labels.sort();
    labels
}

fn pairs(labels: Vec<(String, String)>) -> Vec<LabelPair> {
    labels.into_iter().map(|(k, v)| LabelPair::new(k, v)).collect()
}

fn label_key(metric: &Metric) -> Vec<(&str, &str)> {
    metric.label.iter().map(|lp| (lp.name(), lp.value())).collect()
}

/// Resolve `\\`, `\"` and `\n`; other backslashes are kept as written.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(escaped @ ('\\' | '"')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Family a metric name from the document belongs to.
fn resolve(name: &str, families: &HashMap<String, FamilyState>) -> Option<String> {
    if families.contains_key(name) {
        return Some(name.to_string());
    }
    SUFFIXES
        .iter()
        .filter_map(|suffix| name.strip_suffix(suffix))
        .find(|base| families.contains_key(*base))
        .map(str::to_string)
}

/// HELP text for every family the scrape documented.
fn apply_help(families: &mut HashMap<String, FamilyState>, docs: &HashMap<String, String>) {
    for (name, state) in families.iter_mut() {
        if let Some(doc) = docs.get(name) {
            state.mf.help = Some(unescape(doc.trim()));
        }
    }
}
