mod actions;
mod app;
pub mod decoder;
mod master;
mod metrics;
mod model;
pub mod wire;
mod worker;

pub use actions::AppActions;
pub use app::{
    ActionOutcome, AppDetail, AppId, AppMasterData, AppSummary, DagDescription, Edge, Executor,
    ExecutorBrief, ExecutorId, LifeTime, Processor, ProcessorId, ProcessorPatch, StallingTasks,
    StreamAppDescription, TaskId, STATUS_ACTIVE, STATUS_TERMINATED, STREAMING_TYPE,
};
pub use decoder::Decoder;
pub use master::{HostPort, MasterDescription, MasterSummary};
pub use metrics::{
    MetricMeta, MetricPoint, MetricSample, MetricSeries, MetricValue, GAUGE_TYPE, HISTOGRAM_TYPE,
    METER_TYPE,
};
pub use model::{DecodeFn, Model, Models};
pub use worker::{SlotUsage, WorkerDescription, WorkerId, WorkerSummary};
