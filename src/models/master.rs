use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::wire::{self, Extra};

/// `(host, port)`, sent by the backend as a two element array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostPort(pub String, #[serde(deserialize_with = "wire::de_i64")] pub i64);

impl Display for HostPort {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.0, self.1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterDescription {
    pub leader: HostPort,
    #[serde(default)]
    pub cluster: Vec<HostPort>,
    pub master_status: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Envelope of `GET /master`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterWrapper {
    pub master_description: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterSummary {
    #[serde(flatten)]
    pub raw: MasterDescription,
    pub leader_address: String,
    pub cluster_members: Vec<String>,
    pub is_healthy: bool,
    pub config_link: String,
}

impl MasterSummary {
    pub const DERIVED_FIELDS: &'static [&'static str] =
        &["leaderAddress", "clusterMembers", "isHealthy", "configLink"];
}
