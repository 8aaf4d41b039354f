use crate::models::{AppId, WorkerId};

pub fn api_root(base_url: &str) -> String {
    format!("{}/api/v1", base_url.trim_end_matches('/'))
}

pub fn master_config(api_root: &str) -> String {
    format!("{}/master/config", api_root)
}

pub fn worker_config(api_root: &str, worker_id: WorkerId) -> String {
    format!("{}/worker/{}/config", api_root, worker_id)
}

pub fn app_config(api_root: &str, app_id: AppId) -> String {
    format!("{}/appmaster/{}/config", api_root, app_id)
}
