use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;
use tracing::{debug, info};

use super::app::{AppDetail, AppId, AppSummary, StallingTasks};
use super::decoder::Decoder;
use super::master::MasterSummary;
use super::metrics::{MetricSample, MetricSeries};
use super::worker::{WorkerId, WorkerSummary};
use crate::dag::StreamingDag;
use crate::error::{DecodeError, Error, Result};
use crate::rest::{RestClient, Scope, Subscription};

pub type DecodeFn<T> = Arc<dyn Fn(Value) -> std::result::Result<T, DecodeError> + Send + Sync>;

/// A decoded backend resource that can be watched for changes.
pub struct Model<T> {
    current: Arc<ArcSwap<T>>,
    rest: RestClient,
    subscribe_path: String,
    decode: DecodeFn<T>,
}

impl<T> Model<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Snapshot of the data only, the most recent value delivered to a
    /// subscriber or the initial fetch.
    pub fn data(&self) -> T {
        T::clone(&self.current.load())
    }

    pub fn subscribe_path(&self) -> &str {
        &self.subscribe_path
    }

    /// Calls `on_data` with every pushed update that differs from the
    /// previously delivered one, for as long as `scope` lives. Failed ticks
    /// are logged and skipped.
    pub fn subscribe<F>(&self, scope: &Scope, on_data: F) -> Subscription
    where
        F: FnMut(T) + Send + 'static,
    {
        let path = self.subscribe_path.clone();
        self.subscribe_with_error(scope, on_data, move |err| {
            debug!("[MODELS] Update of {} failed: {}", path, err);
        })
    }

    /// Like [`Model::subscribe`], with `on_error` invoked for ticks that could
    /// not be fetched or decoded.
    pub fn subscribe_with_error<F, E>(
        &self,
        scope: &Scope,
        mut on_data: F,
        mut on_error: E,
    ) -> Subscription
    where
        F: FnMut(T) + Send + 'static,
        E: FnMut(Error) + Send + 'static,
    {
        let decode = self.decode.clone();
        let current = self.current.clone();
        let mut delivered: Option<T> = None;

        self.rest.subscribe(&self.subscribe_path, scope, move |tick| {
            let decoded = tick.and_then(|data| decode(data).map_err(Error::from));
            match decoded {
                Ok(model) => {
                    if delivered.as_ref() == Some(&model) {
                        return;
                    }
                    current.store(Arc::new(model.clone()));
                    delivered = Some(model.clone());
                    on_data(model);
                }
                Err(err) => on_error(err),
            }
        })
    }
}

fn metrics_paths(base: String, all: bool) -> (String, String) {
    let latest = format!("{}?readLatest=true", base);
    let first = if all { base } else { latest.clone() };
    (first, latest)
}

/// Per-resource accessors over the REST API.
#[derive(Debug, Clone)]
pub struct Models {
    rest: RestClient,
    decoder: Arc<Decoder>,
}

impl Models {
    pub fn new(rest: RestClient) -> Self {
        let decoder = Arc::new(Decoder::new(rest.api_root()));
        Models { rest, decoder }
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    fn decode_with<T: 'static>(
        &self,
        f: fn(&Decoder, Value) -> std::result::Result<T, DecodeError>,
    ) -> DecodeFn<T> {
        let decoder = self.decoder.clone();
        Arc::new(move |data| f(&decoder, data))
    }

    /// Fetches `path` once and decodes it. Subscriptions on the result poll
    /// `subscribe_path`, or `path` when none is given.
    pub async fn get<T>(
        &self,
        path: &str,
        decode: DecodeFn<T>,
        subscribe_path: Option<&str>,
    ) -> Result<Model<T>>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        info!("[MODELS] Fetching {}", path);
        let data = self.rest.get(path).await?;
        let value = decode(data)?;
        Ok(Model {
            current: Arc::new(ArcSwap::from_pointee(value)),
            rest: self.rest.clone(),
            subscribe_path: subscribe_path.unwrap_or(path).to_string(),
            decode,
        })
    }

    pub async fn master(&self) -> Result<Model<MasterSummary>> {
        self.get("/master", self.decode_with(Decoder::master), None)
            .await
    }

    pub async fn workers(&self) -> Result<Model<BTreeMap<WorkerId, WorkerSummary>>> {
        self.get("/master/workerlist", self.decode_with(Decoder::workers), None)
            .await
    }

    pub async fn worker_detail(&self, worker_id: WorkerId) -> Result<Model<WorkerSummary>> {
        let path = format!("/worker/{}", worker_id);
        self.get(&path, self.decode_with(Decoder::worker), None).await
    }

    /// With `all` the first fetch returns the whole history; updates always
    /// carry the latest values only.
    pub async fn worker_metrics(
        &self,
        worker_id: WorkerId,
        all: bool,
    ) -> Result<Model<MetricSeries>> {
        let base = format!("/worker/{}/metrics/worker{}", worker_id, worker_id);
        let (first, latest) = metrics_paths(base, all);
        self.get(&first, self.decode_with(Decoder::worker_metrics), Some(&latest))
            .await
    }

    pub async fn apps(&self) -> Result<Model<BTreeMap<AppId, AppSummary>>> {
        self.get("/master/applist", self.decode_with(Decoder::apps), None)
            .await
    }

    pub async fn app_detail(&self, app_id: AppId) -> Result<Model<AppDetail>> {
        let path = format!("/appmaster/{}?detail=true", app_id);
        self.get(&path, self.decode_with(Decoder::app_detail), None)
            .await
    }

    pub async fn app_metrics(
        &self,
        app_id: AppId,
        all: bool,
    ) -> Result<Model<Vec<MetricSample>>> {
        let base = format!("/appmaster/{}/metrics/app{}", app_id, app_id);
        let (first, latest) = metrics_paths(base, all);
        self.get(&first, self.decode_with(Decoder::app_metrics), Some(&latest))
            .await
    }

    pub async fn app_stalling_tasks(&self, app_id: AppId) -> Result<Model<StallingTasks>> {
        let path = format!("/appmaster/{}/stallingtasks", app_id);
        self.get(&path, self.decode_with(Decoder::stalling_tasks), None)
            .await
    }

    pub fn create_dag(&self, app: &AppDetail) -> StreamingDag {
        StreamingDag::new(
            app.id(),
            app.raw.clock,
            app.raw.processors.clone(),
            app.raw.processor_levels.clone(),
            app.edges().to_vec(),
        )
    }
}
