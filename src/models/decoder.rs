//! Turns backend payloads into view models.
//!
//! Every decoder keeps the payload as sent (unknown fields included) and adds
//! derived fields next to it. Derived keys already present in a payload are
//! dropped and recomputed, so decoding a serialized model again gives the same
//! model back.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use super::app::*;
use super::master::*;
use super::metrics::*;
use super::wire::strip_derived;
use super::worker::*;
use crate::error::DecodeError;
use crate::rest::links;
use crate::util::locator;

type Result<T> = std::result::Result<T, DecodeError>;

/// Percentage of `total` that `current` represents; 0 when there is no total.
pub fn usage(current: f64, total: f64) -> f64 {
    if total > 0.0 {
        100.0 * current / total
    } else {
        0.0
    }
}

/// Host and port of an actor path such as
/// `akka.tcp://master@127.0.0.1:3000/user/Worker0`.
pub fn extract_location(actor_path: &str) -> Result<String> {
    let (_, address) = actor_path
        .split_once('@')
        .ok_or_else(|| DecodeError::MalformedActorPath(actor_path.to_string()))?;
    Ok(address.split('/').next().unwrap_or_default().to_string())
}

/// Drops the first dotted segment (the owner, e.g. `worker3`). A name without
/// a dot yields the empty key.
pub fn strip_metric_owner(name: &str) -> &str {
    name.split_once('.').map(|(_, rest)| rest).unwrap_or("")
}

/// Decodes each item and keys it by `key`. The last item wins on duplicate keys.
fn associative<T, K: Ord>(
    objs: Vec<Value>,
    decode: impl Fn(Value) -> Result<T>,
    key: impl Fn(&T) -> K,
) -> Result<BTreeMap<K, T>> {
    let mut result = BTreeMap::new();
    for obj in objs {
        let model = decode(obj)?;
        result.insert(key(&model), model);
    }
    Ok(result)
}

#[derive(Debug, Clone)]
pub struct Decoder {
    api_root: String,
}

impl Decoder {
    pub fn new(api_root: &str) -> Self {
        Decoder {
            api_root: api_root.to_string(),
        }
    }

    pub fn master(&self, wrapper: Value) -> Result<MasterSummary> {
        let wrapper: MasterWrapper = serde_json::from_value(wrapper)?;
        let mut raw: MasterDescription = serde_json::from_value(wrapper.master_description)?;
        strip_derived(&mut raw.extra, MasterSummary::DERIVED_FIELDS);

        Ok(MasterSummary {
            leader_address: raw.leader.to_string(),
            cluster_members: raw.cluster.iter().map(ToString::to_string).collect(),
            is_healthy: raw.master_status == "synced",
            config_link: links::master_config(&self.api_root),
            raw,
        })
    }

    pub fn workers(&self, objs: Value) -> Result<BTreeMap<WorkerId, WorkerSummary>> {
        let objs: Vec<Value> = serde_json::from_value(objs)?;
        associative(objs, |obj| self.worker(obj), WorkerSummary::id)
    }

    pub fn worker(&self, obj: Value) -> Result<WorkerSummary> {
        let mut raw: WorkerDescription = serde_json::from_value(obj)?;
        strip_derived(&mut raw.extra, WorkerSummary::DERIVED_FIELDS);
        let used = raw.total_slots - raw.available_slots;

        Ok(WorkerSummary {
            location: extract_location(&raw.actor_path)?,
            is_healthy: raw.state == "active",
            slots: SlotUsage {
                usage: usage(used as f64, raw.total_slots as f64),
                used,
                total: raw.total_slots,
            },
            page_url: locator::worker(raw.worker_id),
            config_link: links::worker_config(&self.api_root, raw.worker_id),
            raw,
        })
    }

    pub fn worker_metrics(&self, wrapper: Value) -> Result<MetricSeries> {
        let wrapper: MetricsWrapper = serde_json::from_value(wrapper)?;
        let mut result = MetricSeries::new();
        for item in wrapper.metrics {
            let gauge = match serde_json::from_value::<RawGauge>(item.value) {
                Ok(gauge) => gauge,
                Err(err) => {
                    debug!("[DECODER] Skipping worker metric without a value: {}", err);
                    continue;
                }
            };
            result
                .entry(strip_metric_owner(&gauge.name).to_string())
                .or_default()
                .push(MetricPoint {
                    time: item.time,
                    value: gauge.value,
                });
        }
        Ok(result)
    }

    pub fn apps(&self, wrapper: Value) -> Result<BTreeMap<AppId, AppSummary>> {
        let wrapper: AppListWrapper = serde_json::from_value(wrapper)?;
        associative(wrapper.app_masters, |obj| self.app_summary(obj), AppSummary::id)
    }

    pub fn app_summary(&self, obj: Value) -> Result<AppSummary> {
        let mut raw: AppMasterData = serde_json::from_value(obj)?;
        strip_derived(&mut raw.extra, AppSummary::DERIVED_FIELDS);

        Ok(AppSummary {
            app_type: STREAMING_TYPE.to_string(),
            is_running: raw.status == STATUS_ACTIVE,
            location: extract_location(&raw.app_master_path)?,
            page_url: locator::app(raw.app_id, STREAMING_TYPE),
            raw,
        })
    }

    pub fn app_detail(&self, mut obj: Value) -> Result<AppDetail> {
        let executors = obj
            .as_object_mut()
            .and_then(|fields| fields.remove("executors"));
        let mut raw: StreamAppDescription = serde_json::from_value(obj)?;
        strip_derived(&mut raw.extra, AppDetail::DERIVED_FIELDS);

        let app_type = if raw.dag.is_some() { STREAMING_TYPE } else { "" };
        let executors = match executors {
            Some(list) => serde_json::from_value::<Option<Vec<Value>>>(list)?.unwrap_or_default(),
            None => Vec::new(),
        };
        let executors = executors
            .into_iter()
            .map(|e| self.executor(raw.app_id, app_type, e))
            .collect::<Result<Vec<_>>>()?;

        Ok(AppDetail {
            executors,
            status: STATUS_ACTIVE.to_string(),
            app_type: app_type.to_string(),
            is_running: true,
            page_url: locator::app(raw.app_id, app_type),
            config_link: links::app_config(&self.api_root, raw.app_id),
            raw,
        })
    }

    fn executor(&self, app_id: AppId, app_type: &str, obj: Value) -> Result<Executor> {
        let mut raw: ExecutorBrief = serde_json::from_value(obj)?;
        strip_derived(&mut raw.extra, Executor::DERIVED_FIELDS);

        Ok(Executor {
            is_running: raw.status == STATUS_ACTIVE,
            page_url: locator::executor(app_id, app_type, raw.executor_id),
            worker_page_url: locator::worker(raw.worker_id),
            raw,
        })
    }

    /// Samples of unknown metric types are skipped.
    pub fn app_metrics(&self, wrapper: Value) -> Result<Vec<MetricSample>> {
        let wrapper: MetricsWrapper = serde_json::from_value(wrapper)?;
        let mut samples = Vec::with_capacity(wrapper.metrics.len());
        for item in wrapper.metrics {
            let kind = item
                .value
                .get("$type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let (name, value) = match kind.as_str() {
                METER_TYPE => {
                    let m: RawMeter = serde_json::from_value(item.value)?;
                    let value = MetricValue::Meter {
                        count: m.count,
                        mean_rate: m.mean_rate,
                        m1: m.m1,
                        m5: m.m5,
                        m15: m.m15,
                        rate_unit: m.rate_unit,
                    };
                    (m.name, value)
                }
                HISTOGRAM_TYPE => {
                    let h: RawHistogram = serde_json::from_value(item.value)?;
                    let value = MetricValue::Histogram {
                        mean: h.mean,
                        stddev: h.stddev,
                        median: h.median,
                        p95: h.p95,
                        p99: h.p99,
                        p999: h.p999,
                    };
                    (h.name, value)
                }
                GAUGE_TYPE => {
                    let g: RawGauge = serde_json::from_value(item.value)?;
                    (g.name, MetricValue::Gauge { value: g.value })
                }
                other => {
                    debug!("[DECODER] Skipping metric of unknown type {:?}", other);
                    continue;
                }
            };
            samples.push(MetricSample {
                time: item.time,
                meta: MetricMeta::parse(&name),
                value,
            });
        }
        Ok(samples)
    }

    pub fn stalling_tasks(&self, wrapper: Value) -> Result<StallingTasks> {
        let wrapper: StallingTasksWrapper = serde_json::from_value(wrapper)?;
        let mut grouped = StallingTasks::new();
        for task in wrapper.tasks {
            grouped.entry(task.processor_id).or_default().push(task);
        }
        Ok(grouped)
    }
}
