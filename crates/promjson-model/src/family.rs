use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Entry, Histogram, Labels, Metric, ModelError, ModelResult, Summary};

/// Metric type of a family, serialized the way the exposition format names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FamilyType {
    Counter,
    Gauge,
    Untyped,
    Summary,
    Histogram,
}

impl FamilyType {
    /// Returns the upper-case type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FamilyType::Counter => "COUNTER",
            FamilyType::Gauge => "GAUGE",
            FamilyType::Untyped => "UNTYPED",
            FamilyType::Summary => "SUMMARY",
            FamilyType::Histogram => "HISTOGRAM",
        }
    }

    /// Returns `true` for types whose series carry a single value.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            FamilyType::Counter | FamilyType::Gauge | FamilyType::Untyped
        )
    }

    /// Returns `true` if `entry` has the shape this type requires.
    pub fn accepts(&self, entry: &Entry) -> bool {
        match entry {
            Entry::Metric(_) => self.is_scalar(),
            Entry::Summary(_) => *self == FamilyType::Summary,
            Entry::Histogram(_) => *self == FamilyType::Histogram,
        }
    }
}

impl fmt::Display for FamilyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FamilyType {
    type Err = ModelError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "counter" => Ok(Self::Counter),
            "gauge" => Ok(Self::Gauge),
            "untyped" => Ok(Self::Untyped),
            "summary" => Ok(Self::Summary),
            "histogram" => Ok(Self::Histogram),
            _ => Err(ModelError::UnknownType(s.to_string())),
        }
    }
}

/// One metric family in normalized form.
///
/// Every entry in `metrics` has the shape selected by `kind`; deserialization enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFamily")]
pub struct Family {
    pub name: String,
    pub help: String,
    #[serde(rename = "type")]
    pub kind: FamilyType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<Entry>,
}

impl Family {
    /// Create a family without series.
    pub fn new<N, H>(name: N, help: H, kind: FamilyType) -> Self
    where
        N: Into<String>,
        H: Into<String>,
    {
        Self {
            name: name.into(),
            help: help.into(),
            kind,
            metrics: Vec::new(),
        }
    }

    /// Insert or overwrite a label on every single-value series.
    ///
    /// Summary and histogram series are left untouched.
    pub fn add_label<K, V>(&mut self, key: K, val: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = key.into();
        let val = val.into();
        for entry in &mut self.metrics {
            if let Entry::Metric(m) = entry {
                m.labels.insert(key.clone(), val.clone());
            }
        }
    }

    /// Number of series.
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Returns `true` if the family has no series.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Wire shape accepted when reading families back from JSON.
#[derive(Deserialize)]
struct RawFamily {
    name: String,
    #[serde(default)]
    help: String,
    #[serde(rename = "type")]
    kind: FamilyType,
    #[serde(default)]
    metrics: Vec<RawEntry>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    #[serde(default)]
    labels: Labels,
    value: Option<String>,
    quantiles: Option<BTreeMap<String, String>>,
    buckets: Option<BTreeMap<String, String>>,
    count: Option<String>,
    sum: Option<String>,
}

impl RawEntry {
    /// Shape implied by the fields present, independent of the family type.
    fn into_entry(self) -> Option<Entry> {
        match self {
            RawEntry {
                labels,
                value: Some(value),
                quantiles: None,
                buckets: None,
                count: None,
                sum: None,
            } => Some(Entry::Metric(Metric { labels, value })),
            RawEntry {
                labels,
                value: None,
                quantiles,
                buckets: None,
                count: Some(count),
                sum: Some(sum),
            } => Some(Entry::Summary(Summary {
                labels,
                quantiles: quantiles.unwrap_or_default(),
                count,
                sum,
            })),
            RawEntry {
                labels,
                value: None,
                quantiles: None,
                buckets,
                count: Some(count),
                sum: Some(sum),
            } => Some(Entry::Histogram(Histogram {
                labels,
                buckets: buckets.unwrap_or_default(),
                count,
                sum,
            })),
            _ => None,
        }
    }
}

impl TryFrom<RawFamily> for Family {
    type Error = ModelError;
    fn try_from(raw: RawFamily) -> ModelResult<Self> {
        if raw.name.is_empty() {
            return Err(ModelError::Invalid("family name is empty".into()));
        }

        let mut metrics = Vec::with_capacity(raw.metrics.len());
        for (index, entry) in raw.metrics.into_iter().enumerate() {
            // `count` and `sum` alone read as a summary; a histogram family takes them too.
            let entry = match entry.into_entry() {
                Some(Entry::Summary(s))
                    if raw.kind == FamilyType::Histogram && s.quantiles.is_empty() =>
                {
                    Some(Entry::Histogram(Histogram {
                        labels: s.labels,
                        buckets: BTreeMap::new(),
                        count: s.count,
                        sum: s.sum,
                    }))
                }
                other => other,
            };
            match entry {
                Some(entry) if raw.kind.accepts(&entry) => metrics.push(entry),
                _ => {
                    return Err(ModelError::ShapeMismatch {
                        family: raw.name,
                        index,
                        expected: raw.kind.as_str(),
                    });
                }
            }
        }

        Ok(Family {
            name: raw.name,
            help: raw.help,
            kind: raw.kind,
            metrics,
        })
    }
}
