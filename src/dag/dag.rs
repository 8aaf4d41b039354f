use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    ActionOutcome, AppId, Edge, MetricSample, MetricValue, Processor, ProcessorId,
    ProcessorPatch, StallingTasks,
};

/// Submits processor replacements for an application's DAG.
#[async_trait]
pub trait ProcessorReplacer: Send + Sync {
    async fn replace_processor(
        &self,
        app_id: AppId,
        processor_id: ProcessorId,
        patch: &ProcessorPatch,
    ) -> Result<ActionOutcome>;
}

/// View model of an application's processor graph with its live overlays.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingDag {
    app_id: AppId,
    clock: i64,
    processors: BTreeMap<ProcessorId, Processor>,
    levels: BTreeMap<ProcessorId, i32>,
    edges: Vec<Edge>,
    stalling: StallingTasks,
    // latest sample per metric name, per processor
    metrics: BTreeMap<ProcessorId, BTreeMap<String, MetricSample>>,
    app_metrics: BTreeMap<String, MetricSample>,
}

impl StreamingDag {
    pub fn new(
        app_id: AppId,
        clock: i64,
        processors: BTreeMap<ProcessorId, Processor>,
        levels: BTreeMap<ProcessorId, i32>,
        edges: Vec<Edge>,
    ) -> Self {
        StreamingDag {
            app_id,
            clock,
            processors,
            levels,
            edges,
            stalling: StallingTasks::new(),
            metrics: BTreeMap::new(),
            app_metrics: BTreeMap::new(),
        }
    }

    /// Replaces the topology. Metrics of processors that disappeared are dropped.
    pub fn set_data(
        &mut self,
        clock: i64,
        processors: BTreeMap<ProcessorId, Processor>,
        levels: BTreeMap<ProcessorId, i32>,
        edges: Vec<Edge>,
    ) {
        self.clock = clock;
        self.metrics.retain(|id, _| processors.contains_key(id));
        self.processors = processors;
        self.levels = levels;
        self.edges = edges;
    }

    pub fn set_stalling_tasks(&mut self, tasks: StallingTasks) {
        self.stalling = tasks;
    }

    /// Keeps the newest sample of every metric; older samples are ignored.
    pub fn update_metrics_array(&mut self, samples: Vec<MetricSample>) {
        for sample in samples {
            let slot = match sample.meta.processor_id {
                Some(id) => self.metrics.entry(id).or_default(),
                None => &mut self.app_metrics,
            };
            let stale = slot
                .get(&sample.meta.name)
                .is_some_and(|known| known.time > sample.time);
            if !stale {
                slot.insert(sample.meta.name.clone(), sample);
            }
        }
    }

    pub fn app_id(&self) -> AppId {
        self.app_id
    }

    pub fn clock(&self) -> i64 {
        self.clock
    }

    pub fn processor(&self, id: ProcessorId) -> Option<&Processor> {
        self.processors.get(&id)
    }

    pub fn processors(&self) -> &BTreeMap<ProcessorId, Processor> {
        &self.processors
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn level(&self, id: ProcessorId) -> Option<i32> {
        self.levels.get(&id).copied()
    }

    /// Number of levels in the graph, 0 when it is empty.
    pub fn depth(&self) -> i32 {
        self.levels.values().max().map(|l| l + 1).unwrap_or(0)
    }

    pub fn is_processor_stalling(&self, id: ProcessorId) -> bool {
        self.stalling.get(&id).is_some_and(|tasks| !tasks.is_empty())
    }

    pub fn stalling_tasks(&self) -> &StallingTasks {
        &self.stalling
    }

    /// Latest samples of `metric` across the tasks of a processor.
    pub fn processor_metric(&self, id: ProcessorId, metric: &str) -> Vec<&MetricSample> {
        self.metrics
            .get(&id)
            .map(|samples| {
                samples
                    .values()
                    .filter(|s| s.meta.metric == metric)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sum of the one-minute rates of a meter across the tasks of a processor.
    pub fn processor_rate(&self, id: ProcessorId, metric: &str) -> f64 {
        self.processor_metric(id, metric)
            .into_iter()
            .map(|s| match s.value {
                MetricValue::Meter { m1, .. } => m1,
                _ => 0.0,
            })
            .sum()
    }

    pub fn app_metric(&self, name: &str) -> Option<&MetricSample> {
        self.app_metrics.get(name)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::{Decoder, MetricMeta, TaskId};
    use crate::test_support::app_detail_json;

    fn dag() -> StreamingDag {
        let app = Decoder::new("").app_detail(app_detail_json()).unwrap();
        StreamingDag::new(
            app.id(),
            app.raw.clock,
            app.raw.processors.clone(),
            app.raw.processor_levels.clone(),
            app.edges().to_vec(),
        )
    }

    fn meter(name: &str, time: i64, m1: f64) -> MetricSample {
        MetricSample {
            time,
            meta: MetricMeta::parse(name),
            value: MetricValue::Meter {
                count: 0,
                mean_rate: 0.0,
                m1,
                m5: 0.0,
                m15: 0.0,
                rate_unit: "SECONDS".to_string(),
            },
        }
    }

    #[test]
    fn topology_from_app() {
        let dag = dag();
        assert_eq!(dag.app_id(), 1);
        assert_eq!(dag.processors().len(), 2);
        assert_eq!(dag.processor(1).unwrap().task_class, "io.Sum");
        assert_eq!(dag.level(1), Some(1));
        assert_eq!(dag.depth(), 2);
        assert_eq!(dag.edges()[0].1, json!("hash"));
    }

    #[test]
    fn stalling_overlay() {
        let mut dag = dag();
        assert!(!dag.is_processor_stalling(0));

        let mut tasks = StallingTasks::new();
        tasks.insert(
            0,
            vec![TaskId {
                processor_id: 0,
                index: 1,
                extra: Default::default(),
            }],
        );
        dag.set_stalling_tasks(tasks);
        assert!(dag.is_processor_stalling(0));
        assert!(!dag.is_processor_stalling(1));

        dag.set_stalling_tasks(StallingTasks::new());
        assert!(!dag.is_processor_stalling(0));
    }

    #[test]
    fn metrics_keep_the_newest_sample() {
        let mut dag = dag();
        dag.update_metrics_array(vec![
            meter("app1.processor0.task0:sendThroughput", 10, 1.0),
            meter("app1.processor0.task1:sendThroughput", 10, 2.0),
        ]);
        dag.update_metrics_array(vec![
            meter("app1.processor0.task0:sendThroughput", 5, 100.0),
            meter("app1.processor0.task1:sendThroughput", 20, 4.0),
        ]);

        assert_eq!(dag.processor_metric(0, "sendThroughput").len(), 2);
        assert_eq!(dag.processor_rate(0, "sendThroughput"), 5.0);
        assert_eq!(dag.processor_rate(1, "sendThroughput"), 0.0);
    }

    #[test]
    fn app_level_metrics_are_kept_apart() {
        let mut dag = dag();
        dag.update_metrics_array(vec![meter("app1.appmaster:restarts", 1, 0.5)]);
        assert!(dag.app_metric("app1.appmaster:restarts").is_some());
        assert!(dag.processor_metric(0, "restarts").is_empty());
    }

    #[test]
    fn set_data_drops_metrics_of_removed_processors() {
        let mut dag = dag();
        dag.update_metrics_array(vec![meter("app1.processor1.task0:sendThroughput", 1, 3.0)]);
        let mut processors = dag.processors().clone();
        processors.remove(&1);

        dag.set_data(99, processors, BTreeMap::new(), Vec::new());
        assert_eq!(dag.clock(), 99);
        assert!(dag.processor(1).is_none());
        assert!(dag.processor_metric(1, "sendThroughput").is_empty());
        assert_eq!(dag.depth(), 0);
    }
}
