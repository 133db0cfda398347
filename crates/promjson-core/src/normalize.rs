//! Flattening of raw metric families into the JSON-friendly model.

use promjson_model::{
    Entry, Family, FamilyType, Histogram, Labels, Metric, Summary, format_count, format_float,
};
use tracing::debug;

use crate::proto::{self, MetricType};

/// Convert a raw record into its normalized [`Family`].
///
/// Pure and total: absent sub-messages read as zero or empty, and every entry gets the
/// shape selected by the family type.
///
/// # Examples
/// ```
/// use promjson_core::normalize;
/// use promjson_core::proto::{Gauge, Metric, MetricFamily, MetricType};
///
/// let mut mf = MetricFamily::with_type("up", MetricType::Gauge);
/// mf.metric.push(Metric { gauge: Some(Gauge { value: Some(1.0) }), ..Default::default() });
///
/// let family = normalize(&mf);
/// assert_eq!(family.metrics[0].as_metric().unwrap().value, "1");
/// ```
pub fn normalize(mf: &proto::MetricFamily) -> Family {
    let kind = family_type(mf);
    let mut family = Family::new(mf.name(), mf.help(), kind);
    family.metrics = mf.metric.iter().map(|m| entry(kind, m)).collect();
    family
}

/// Family type of a raw record; unknown enum values are treated as untyped.
pub fn family_type(mf: &proto::MetricFamily) -> FamilyType {
    let raw = mf.r#type.unwrap_or_default();
    match MetricType::try_from(raw) {
        Ok(MetricType::Counter) => FamilyType::Counter,
        Ok(MetricType::Gauge) => FamilyType::Gauge,
        Ok(MetricType::Summary) => FamilyType::Summary,
        Ok(MetricType::Histogram) => FamilyType::Histogram,
        Ok(MetricType::Untyped) => FamilyType::Untyped,
        Err(_) => {
            debug!(family = mf.name(), raw, "unknown metric type, treating as untyped");
            FamilyType::Untyped
        }
    }
}

fn entry(kind: FamilyType, m: &proto::Metric) -> Entry {
    let labels = labels(m);
    match kind {
        FamilyType::Summary => {
            let s = m.summary.clone().unwrap_or_default();
            Entry::Summary(Summary {
                labels,
                quantiles: s
                    .quantile
                    .iter()
                    .map(|q| (format_float(q.quantile()), format_float(q.value())))
                    .collect(),
                count: format_count(s.sample_count()),
                sum: format_float(s.sample_sum()),
            })
        }
        FamilyType::Histogram => {
            let h = m.histogram.clone().unwrap_or_default();
            Entry::Histogram(Histogram {
                labels,
                buckets: h
                    .bucket
                    .iter()
                    .map(|b| (format_float(b.upper_bound()), format_count(b.cumulative_count())))
                    .collect(),
                count: format_count(h.sample_count()),
                sum: format_float(h.sample_sum()),
            })
        }
        FamilyType::Counter | FamilyType::Gauge | FamilyType::Untyped => Entry::Metric(Metric {
            labels,
            value: format_float(scalar_value(m)),
        }),
    }
}

/// Value of a single-value series: gauge, else counter, else untyped, else zero.
fn scalar_value(m: &proto::Metric) -> f64 {
    if let Some(g) = &m.gauge {
        return g.value();
    }
    if let Some(c) = &m.counter {
        return c.value();
    }
    if let Some(u) = &m.untyped {
        return u.value();
    }
    0.0
}

/// One key per label name; the last pair wins.
fn labels(m: &proto::Metric) -> Labels {
    m.label
        .iter()
        .map(|lp| (lp.name(), lp.value()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{
        Bucket, Counter, Gauge, LabelPair, MetricFamily, Quantile, Untyped,
    };

    fn counter(labels: Vec<LabelPair>, value: f64) -> proto::Metric {
        proto::Metric {
            label: labels,
            counter: Some(Counter { value: Some(value) }),
            ..Default::default()
        }
    }

    fn counter1() -> MetricFamily {
        let mut mf = MetricFamily::with_type("counter1", MetricType::Counter);
        mf.metric = vec![
            counter(
                vec![LabelPair::new("tag1", "abc"), LabelPair::new("tag2", "def")],
                1.0,
            ),
            counter(vec![], 2.0),
            counter(vec![LabelPair::new("inf", "neg")], f64::NEG_INFINITY),
            counter(vec![LabelPair::new("inf", "pos")], f64::INFINITY),
        ];
        mf
    }

    fn summary1() -> MetricFamily {
        let mut mf = MetricFamily::with_type("summary1", MetricType::Summary);
        mf.metric.push(proto::Metric {
            label: vec![LabelPair::new("tag1", "abc"), LabelPair::new("tag2", "def")],
            summary: Some(proto::Summary {
                sample_count: Some(1),
                sample_sum: Some(2.0),
                quantile: vec![
                    Quantile { quantile: Some(0.5), value: Some(3.0) },
                    Quantile { quantile: Some(0.9), value: Some(4.0) },
                    Quantile { quantile: Some(0.99), value: Some(f64::NAN) },
                ],
            }),
            ..Default::default()
        });
        mf
    }

    fn histogram1() -> MetricFamily {
        let mut mf = MetricFamily::with_type("histogram1", MetricType::Histogram);
        mf.metric.push(proto::Metric {
            histogram: Some(proto::Histogram {
                sample_count: Some(1),
                sample_sum: Some(2.0),
                bucket: vec![
                    Bucket { cumulative_count: Some(3), upper_bound: Some(250000.0) },
                    Bucket { cumulative_count: Some(4), upper_bound: Some(500000.0) },
                    Bucket { cumulative_count: Some(5), upper_bound: Some(1e6) },
                ],
            }),
            ..Default::default()
        });
        mf
    }

    fn values(family: &Family) -> Vec<&str> {
        family
            .metrics
            .iter()
            .map(|e| e.as_metric().unwrap().value.as_str())
            .collect()
    }

    #[test]
    fn counter_values_and_labels() {
        let family = normalize(&counter1());
        assert_eq!(family.name, "counter1");
        assert_eq!(family.kind, FamilyType::Counter);
        assert_eq!(values(&family), vec!["1", "2", "-Inf", "+Inf"]);

        let first = family.metrics[0].labels();
        assert_eq!(first.get("tag1"), Some("abc"));
        assert_eq!(first.get("tag2"), Some("def"));
        assert!(family.metrics[1].labels().is_empty());
        assert_eq!(family.metrics[3].labels().get("inf"), Some("pos"));
    }

    #[test]
    fn summary_quantiles_count_and_sum() {
        let family = normalize(&summary1());
        assert_eq!(family.kind, FamilyType::Summary);

        let Entry::Summary(s) = &family.metrics[0] else {
            panic!("expected summary entry");
        };
        let quantiles: Vec<(&str, &str)> = s
            .quantiles
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            quantiles,
            vec![("0.5", "3"), ("0.9", "4"), ("0.99", "NaN")]
        );
        assert_eq!(s.count, "1");
        assert_eq!(s.sum, "2");
    }

    #[test]
    fn histogram_sum_comes_from_histogram() {
        let family = normalize(&histogram1());

        let Entry::Histogram(h) = &family.metrics[0] else {
            panic!("expected histogram entry");
        };
        assert_eq!(h.buckets.get("250000").map(String::as_str), Some("3"));
        assert_eq!(h.buckets.get("500000").map(String::as_str), Some("4"));
        assert_eq!(h.buckets.get("1e+06").map(String::as_str), Some("5"));
        assert_eq!(h.count, "1");
        assert_eq!(h.sum, "2");
        assert!(h.labels.is_empty());
    }

    #[test]
    fn scalar_value_precedence() {
        let mut mf = MetricFamily::with_type("mixed", MetricType::Gauge);
        mf.metric = vec![
            proto::Metric {
                gauge: Some(Gauge { value: Some(1.0) }),
                counter: Some(Counter { value: Some(2.0) }),
                untyped: Some(Untyped { value: Some(3.0) }),
                ..Default::default()
            },
            proto::Metric {
                counter: Some(Counter { value: Some(2.0) }),
                untyped: Some(Untyped { value: Some(3.0) }),
                ..Default::default()
            },
            proto::Metric {
                untyped: Some(Untyped { value: Some(3.0) }),
                ..Default::default()
            },
            proto::Metric::default(),
        ];

        assert_eq!(values(&normalize(&mf)), vec!["1", "2", "3", "0"]);
    }

    #[test]
    fn missing_payloads_read_as_zero() {
        let mut mf = MetricFamily::with_type("empty_summary", MetricType::Summary);
        mf.metric.push(proto::Metric::default());

        let family = normalize(&mf);
        let Entry::Summary(s) = &family.metrics[0] else {
            panic!("expected summary entry");
        };
        assert!(s.quantiles.is_empty());
        assert_eq!(s.count, "0");
        assert_eq!(s.sum, "0");
    }

    #[test]
    fn duplicate_label_names_keep_last_value() {
        let mut mf = MetricFamily::with_type("dup", MetricType::Untyped);
        mf.metric.push(proto::Metric {
            label: vec![LabelPair::new("a", "1"), LabelPair::new("a", "2")],
            ..Default::default()
        });

        let family = normalize(&mf);
        assert_eq!(family.metrics[0].labels().len(), 1);
        assert_eq!(family.metrics[0].labels().get("a"), Some("2"));
    }

    #[test]
    fn unknown_type_is_untyped() {
        let mf = MetricFamily {
            name: Some("odd".into()),
            r#type: Some(42),
            metric: vec![counter(vec![], 7.0)],
            ..Default::default()
        };

        let family = normalize(&mf);
        assert_eq!(family.kind, FamilyType::Untyped);
        assert_eq!(values(&family), vec!["7"]);
    }

    #[test]
    fn missing_name_and_help_are_empty() {
        let family = normalize(&MetricFamily::default());
        assert_eq!(family.name, "");
        assert_eq!(family.help, "");
        assert_eq!(family.kind, FamilyType::Counter);
        assert!(family.is_empty());
    }

    #[test]
    fn normalization_is_deterministic_and_keeps_cardinality() {
        for mf in [counter1(), summary1(), histogram1()] {
            let a = normalize(&mf);
            let b = normalize(&mf);
            assert_eq!(a, b);
            assert_eq!(a.len(), mf.metric.len());
            assert!(a.metrics.iter().all(|e| a.kind.accepts(e)));
        }
    }
}
