//! Metric data model and Prometheus text exposition.
//!
//! A [`MetricDesc`] describes one measurement kind and is defined once as a
//! process-wide constant. A [`Metric`] is a single observation of a
//! descriptor: a label set plus a value. [`MetricSet`] accumulates
//! observations for one run and renders them in the text exposition format.

use std::collections::BTreeMap;

/// Immutable description of one measurement kind.
#[derive(Debug)]
pub struct MetricDesc {
    pub name: &'static str,
    pub kind: &'static str,
    pub help: &'static str,
}

impl MetricDesc {
    pub const fn gauge(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            kind: "gauge",
            help,
        }
    }

    /// The two-line `# HELP` / `# TYPE` header preceding this metric's
    /// observations in the exposition stream.
    pub fn header(&self) -> String {
        format!(
            "# HELP {n} {h}\n# TYPE {n} {k}",
            n = self.name,
            h = self.help,
            k = self.kind
        )
    }
}

/// Label names to values. A `BTreeMap` keeps keys in lexicographic order,
/// which is the canonical rendering order.
pub type Labels = BTreeMap<String, String>;

/// Builds a label set from string pairs.
pub fn labels(pairs: &[(&str, &str)]) -> Labels {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// One observation of a metric. Immutable once aggregated; many observations
/// share one descriptor. The value is an integer kept in its string form:
/// numeric fields captured from tool output pass through verbatim, however
/// wide, and expanded boolean series carry "0" or "1".
#[derive(Debug, Clone)]
pub struct Metric {
    pub desc: &'static MetricDesc,
    pub labels: Labels,
    pub value: String,
}

impl Metric {
    pub fn new(desc: &'static MetricDesc, labels: Labels, value: impl Into<String>) -> Self {
        Self {
            desc,
            labels,
            value: value.into(),
        }
    }

    /// Renders the observation as one exposition line:
    /// `name{key="value", ...} value`, braces omitted for an empty label set.
    pub fn render(&self) -> String {
        let rendered: Vec<String> = self
            .labels
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, v))
            .collect();
        if rendered.is_empty() {
            format!("{} {}", self.desc.name, self.value)
        } else {
            format!("{}{{{}}} {}", self.desc.name, rendered.join(", "), self.value)
        }
    }
}

/// Accumulates observations keyed by metric name, in discovery order within
/// each name. Final output order does not depend on discovery order: names
/// come out lexicographically and observation lines are sorted by their
/// rendered text.
#[derive(Debug, Default)]
pub struct MetricSet {
    by_name: BTreeMap<&'static str, Vec<Metric>>,
}

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, metric: Metric) {
        self.by_name.entry(metric.desc.name).or_default().push(metric);
    }

    pub fn extend(&mut self, metrics: impl IntoIterator<Item = Metric>) {
        for metric in metrics {
            self.push(metric);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Total number of accumulated observations.
    pub fn len(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }

    /// Renders the whole set in exposition format, trailing newline included.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for metrics in self.by_name.values() {
            out.push_str(&metrics[0].desc.header());
            out.push('\n');
            let mut lines: Vec<String> = metrics.iter().map(Metric::render).collect();
            lines.sort();
            for line in lines {
                out.push_str(&line);
                out.push('\n');
            }
        }
        out
    }
}
