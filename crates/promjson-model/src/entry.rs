use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Labels;

/// Single-value series: counters, gauges and untyped metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
    pub value: String,
}

/// Summary series with pre-computed quantiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
    /// Formatted quantile fraction (e.g. `"0.99"`) to formatted value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub quantiles: BTreeMap<String, String>,
    pub count: String,
    pub sum: String,
}

/// Histogram series with cumulative buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
    /// Formatted upper bound (e.g. `"1e+06"`) to cumulative count.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub buckets: BTreeMap<String, String>,
    pub count: String,
    pub sum: String,
}

/// One series of a [`crate::Family`].
///
/// The variant is determined by the family type; all entries of a family share it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Entry {
    Metric(Metric),
    Summary(Summary),
    Histogram(Histogram),
}

impl Entry {
    /// Labels of the series, whatever its shape.
    pub fn labels(&self) -> &Labels {
        match self {
            Entry::Metric(m) => &m.labels,
            Entry::Summary(s) => &s.labels,
            Entry::Histogram(h) => &h.labels,
        }
    }

    /// Shape name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Entry::Metric(_) => "metric",
            Entry::Summary(_) => "summary",
            Entry::Histogram(_) => "histogram",
        }
    }

    /// Returns the scalar series, if this is one.
    pub fn as_metric(&self) -> Option<&Metric> {
        match self {
            Entry::Metric(m) => Some(m),
            _ => None,
        }
    }
}

impl From<Metric> for Entry {
    fn from(m: Metric) -> Self {
        Entry::Metric(m)
    }
}

impl From<Summary> for Entry {
    fn from(s: Summary) -> Self {
        Entry::Summary(s)
    }
}

impl From<Histogram> for Entry {
    fn from(h: Histogram) -> Self {
        Entry::Histogram(h)
    }
}
