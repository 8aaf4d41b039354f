use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::app::ProcessorId;
use super::wire;

pub const METER_TYPE: &str = "org.apache.gearpump.metrics.Metrics.Meter";
pub const HISTOGRAM_TYPE: &str = "org.apache.gearpump.metrics.Metrics.Histogram";
pub const GAUGE_TYPE: &str = "org.apache.gearpump.metrics.Metrics.Gauge";

/// One entry of a metrics query response.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryMetricsItem {
    #[serde(deserialize_with = "wire::de_i64")]
    pub time: i64,
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsWrapper {
    #[serde(default)]
    pub metrics: Vec<HistoryMetricsItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricPoint {
    pub time: i64,
    pub value: f64,
}

/// Time series keyed by metric name without its owner prefix, so
/// `worker3.memory.heap.used` is stored as `memory.heap.used`.
pub type MetricSeries = BTreeMap<String, Vec<MetricPoint>>;

/// Where a metric comes from, parsed from names like
/// `app1.processor0.task2:receiveThroughput`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricMeta {
    pub name: String,
    pub path: String,
    pub metric: String,
    pub processor_id: Option<ProcessorId>,
    pub task_id: Option<i32>,
}

impl MetricMeta {
    pub fn parse(name: &str) -> Self {
        let (path, metric) = match name.rsplit_once(':') {
            Some((path, metric)) => (path, metric),
            None => (name, ""),
        };
        let mut processor_id = None;
        let mut task_id = None;
        for segment in path.split('.') {
            if let Some(id) = segment.strip_prefix("processor") {
                processor_id = id.parse().ok();
            } else if let Some(id) = segment.strip_prefix("task") {
                task_id = id.parse().ok();
            }
        }
        MetricMeta {
            name: name.to_string(),
            path: path.to_string(),
            metric: metric.to_string(),
            processor_id,
            task_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MetricValue {
    #[serde(rename_all = "camelCase")]
    Meter {
        count: i64,
        mean_rate: f64,
        m1: f64,
        m5: f64,
        m15: f64,
        rate_unit: String,
    },
    #[serde(rename_all = "camelCase")]
    Histogram {
        mean: f64,
        stddev: f64,
        median: f64,
        p95: f64,
        p99: f64,
        p999: f64,
    },
    Gauge { value: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub time: i64,
    pub meta: MetricMeta,
    pub value: MetricValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawMeter {
    pub name: String,
    #[serde(default, deserialize_with = "wire::de_i64")]
    pub count: i64,
    #[serde(default, deserialize_with = "wire::de_f64")]
    pub mean_rate: f64,
    #[serde(default, deserialize_with = "wire::de_f64")]
    pub m1: f64,
    #[serde(default, deserialize_with = "wire::de_f64")]
    pub m5: f64,
    #[serde(default, deserialize_with = "wire::de_f64")]
    pub m15: f64,
    #[serde(default)]
    pub rate_unit: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawHistogram {
    pub name: String,
    #[serde(default, deserialize_with = "wire::de_f64")]
    pub mean: f64,
    #[serde(default, deserialize_with = "wire::de_f64")]
    pub stddev: f64,
    #[serde(default, deserialize_with = "wire::de_f64")]
    pub median: f64,
    #[serde(default, deserialize_with = "wire::de_f64")]
    pub p95: f64,
    #[serde(default, deserialize_with = "wire::de_f64")]
    pub p99: f64,
    #[serde(default, deserialize_with = "wire::de_f64")]
    pub p999: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawGauge {
    pub name: String,
    #[serde(deserialize_with = "wire::de_f64")]
    pub value: f64,
}
