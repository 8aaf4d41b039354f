//! In-app page addresses of dashboard views.

use crate::models::{AppId, ExecutorId, WorkerId};

pub fn worker(worker_id: WorkerId) -> String {
    format!("#/cluster/workers/worker/{}", worker_id)
}

pub fn app(app_id: AppId, app_type: &str) -> String {
    format!("#/apps/{}app/{}", app_type, app_id)
}

pub fn executor(app_id: AppId, app_type: &str, executor_id: ExecutorId) -> String {
    format!("{}/executor/{}", app(app_id, app_type), executor_id)
}
