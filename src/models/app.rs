use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::wire::{self, Extra};
use super::worker::WorkerId;

pub type AppId = i32;
pub type ProcessorId = i32;
pub type ExecutorId = i32;

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_TERMINATED: &str = "terminated";
pub const STREAMING_TYPE: &str = "streaming";

/// One row of `GET /master/applist`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMasterData {
    pub app_id: AppId,
    #[serde(default)]
    pub app_name: String,
    pub status: String,
    pub app_master_path: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppListWrapper {
    #[serde(default)]
    pub app_masters: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSummary {
    #[serde(flatten)]
    pub raw: AppMasterData,
    #[serde(rename = "type")]
    pub app_type: String,
    pub is_running: bool,
    pub location: String,
    pub page_url: String,
}

impl AppSummary {
    pub const DERIVED_FIELDS: &'static [&'static str] =
        &["type", "isRunning", "location", "pageUrl"];

    pub fn id(&self) -> AppId {
        self.raw.app_id
    }
}

/// Scheduled birth and death of a processor, in unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeTime {
    #[serde(with = "wire::i64_string")]
    pub birth: i64,
    #[serde(with = "wire::i64_string")]
    pub death: i64,
}

impl LifeTime {
    pub const IMMORTAL: i64 = i64::MAX;

    /// Born at `birth`, never dies.
    pub fn from_birth(birth: i64) -> Self {
        LifeTime {
            birth,
            death: Self::IMMORTAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Processor {
    pub id: ProcessorId,
    pub task_class: String,
    pub parallelism: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub life: Option<LifeTime>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// `[from, partitioner, to]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge(pub ProcessorId, pub Value, pub ProcessorId);

impl Edge {
    pub fn source(&self) -> ProcessorId {
        self.0
    }

    pub fn target(&self) -> ProcessorId {
        self.2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DagDescription {
    #[serde(default)]
    pub edge_list: Vec<Edge>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Body of `GET /appmaster/{id}?detail=true`, minus the executors which are
/// decoded into [`Executor`] separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamAppDescription {
    pub app_id: AppId,
    #[serde(default)]
    pub app_name: String,
    #[serde(default, deserialize_with = "wire::de_i64")]
    pub clock: i64,
    #[serde(default, deserialize_with = "wire::de_i64")]
    pub start_time: i64,
    #[serde(default, deserialize_with = "wire::de_i64")]
    pub uptime: i64,
    #[serde(default, deserialize_with = "wire::de_id_map")]
    pub processors: BTreeMap<ProcessorId, Processor>,
    #[serde(default, deserialize_with = "wire::de_id_map")]
    pub processor_levels: BTreeMap<ProcessorId, i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dag: Option<DagDescription>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorBrief {
    pub executor_id: ExecutorId,
    pub worker_id: WorkerId,
    pub status: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Executor {
    #[serde(flatten)]
    pub raw: ExecutorBrief,
    pub is_running: bool,
    pub page_url: String,
    pub worker_page_url: String,
}

impl Executor {
    pub const DERIVED_FIELDS: &'static [&'static str] = &["isRunning", "pageUrl", "workerPageUrl"];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDetail {
    #[serde(flatten)]
    pub raw: StreamAppDescription,
    pub executors: Vec<Executor>,
    pub status: String,
    #[serde(rename = "type")]
    pub app_type: String,
    pub is_running: bool,
    pub page_url: String,
    pub config_link: String,
}

impl AppDetail {
    pub const DERIVED_FIELDS: &'static [&'static str] = &[
        "executors",
        "status",
        "type",
        "isRunning",
        "pageUrl",
        "configLink",
    ];

    pub fn id(&self) -> AppId {
        self.raw.app_id
    }

    pub fn edges(&self) -> &[Edge] {
        self.raw
            .dag
            .as_ref()
            .map(|dag| dag.edge_list.as_slice())
            .unwrap_or(&[])
    }

    /// Milliseconds since the application started. Not stored on the model
    /// so that equal backend states decode to equal models.
    pub fn alive_for(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp_millis() - self.raw.start_time
    }

    /// The same application as seen once its master stopped answering.
    pub fn as_terminated(&self) -> AppDetail {
        let mut app = self.clone();
        app.status = STATUS_TERMINATED.to_string();
        app.is_running = false;
        for executor in app.executors.iter_mut() {
            executor.raw.status = STATUS_TERMINATED.to_string();
            executor.is_running = false;
        }
        app
    }
}

/// Fields a processor edit changes. Serialized into the replacement request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorPatch {
    pub task_class: String,
    pub description: String,
    pub parallelism: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub life: Option<LifeTime>,
}

/// Answer of the backend to an app or DAG action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskId {
    pub processor_id: ProcessorId,
    pub index: i32,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StallingTasksWrapper {
    #[serde(default)]
    pub tasks: Vec<TaskId>,
}

/// Stalling tasks grouped by the processor they belong to.
pub type StallingTasks = BTreeMap<ProcessorId, Vec<TaskId>>;
