use serde::{Deserialize, Serialize};

use super::wire::{self, Extra};

pub type WorkerId = i32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerDescription {
    pub worker_id: WorkerId,
    pub state: String,
    pub actor_path: String,
    #[serde(deserialize_with = "wire::de_i64")]
    pub total_slots: i64,
    #[serde(deserialize_with = "wire::de_i64")]
    pub available_slots: i64,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotUsage {
    /// Percentage of slots in use, 0 when the worker has no slots.
    pub usage: f64,
    pub used: i64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSummary {
    #[serde(flatten)]
    pub raw: WorkerDescription,
    pub location: String,
    pub is_healthy: bool,
    pub slots: SlotUsage,
    pub page_url: String,
    pub config_link: String,
}

impl WorkerSummary {
    pub const DERIVED_FIELDS: &'static [&'static str] =
        &["location", "isHealthy", "slots", "pageUrl", "configLink"];

    pub fn id(&self) -> WorkerId {
        self.raw.worker_id
    }
}
