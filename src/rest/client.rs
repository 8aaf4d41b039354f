use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::links;
use crate::dag::ProcessorReplacer;
use crate::error::{Error, Result};
use crate::models::{ActionOutcome, AppId, ProcessorId, ProcessorPatch};

const REPLACE_PROCESSOR_TYPE: &str =
    "org.apache.gearpump.streaming.appmaster.DagManager.ReplaceProcessor";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Address of the dashboard service, e.g. `http://localhost:8090`.
    pub base_url: String,
    /// How often a live subscription asks the backend again.
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: "http://127.0.0.1:8090".to_string(),
            poll_interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    api_root: String,
    poll_interval: Duration,
}

impl RestClient {
    /// A zero poll interval falls back to the default one.
    pub fn new(config: &ClientConfig) -> Self {
        let mut poll_interval = config.poll_interval;
        if poll_interval.is_zero() {
            poll_interval = ClientConfig::default().poll_interval;
            warn!(
                "[REST] Poll interval must not be zero, using {:?}",
                poll_interval
            );
        }
        RestClient {
            client: reqwest::Client::new(),
            api_root: links::api_root(&config.base_url),
            poll_interval,
        }
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_root, path)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let res = req.send().await.map_err(Error::ErrorReachingBackend)?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(Error::StatusCodeError(status, body));
        }
        Ok(res)
    }

    async fn json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        self.send(req)
            .await?
            .json::<T>()
            .await
            .map_err(|err| Error::ErrorDecodingResponse(err.to_string()))
    }

    /// `GET` a path below the API root and return the raw payload.
    pub async fn get(&self, path: &str) -> Result<Value> {
        self.json(self.client.get(self.url(path))).await
    }

    pub async fn kill_app(&self, app_id: AppId) -> Result<()> {
        info!("[REST] Killing app {}", app_id);
        self.send(self.client.delete(self.url(&format!("/appmaster/{}", app_id))))
            .await?;
        Ok(())
    }

    pub async fn restart_app_async(&self, app_id: AppId) -> Result<ActionOutcome> {
        info!("[REST] Restarting app {}", app_id);
        let url = self.url(&format!("/appmaster/{}/restart", app_id));
        self.json(self.client.post(url)).await
    }

    pub async fn replace_dag_processor(
        &self,
        app_id: AppId,
        old_processor_id: ProcessorId,
        patch: &ProcessorPatch,
    ) -> Result<ActionOutcome> {
        let mut description = serde_json::to_value(patch)
            .map_err(|err| Error::InvalidInput(err.to_string()))?;
        if let Some(obj) = description.as_object_mut() {
            obj.insert("id".to_string(), json!(old_processor_id));
        }
        let body = json!({
            "$type": REPLACE_PROCESSOR_TYPE,
            "oldProcessorId": old_processor_id,
            "newProcessorDescription": description,
        });
        info!(
            "[REST] Replacing processor {} of app {}",
            old_processor_id, app_id
        );
        let url = self.url(&format!("/appmaster/{}/dynamicdag", app_id));
        let outcome: ActionOutcome = self.json(self.client.post(url).json(&body)).await?;
        if !outcome.success {
            warn!(
                "[REST] Processor {} of app {} was not replaced: {:?}",
                old_processor_id, app_id, outcome.reason
            );
        }
        Ok(outcome)
    }
}

#[async_trait]
impl ProcessorReplacer for RestClient {
    async fn replace_processor(
        &self,
        app_id: AppId,
        processor_id: ProcessorId,
        patch: &ProcessorPatch,
    ) -> Result<ActionOutcome> {
        self.replace_dag_processor(app_id, processor_id, patch).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn get_returns_the_payload() {
        let router = Router::new().route("/api/v1/master", get(|| async { Json(json!({"a": 1})) }));
        let client = test_support::client(&test_support::serve(router).await);

        assert_eq!(client.get("/master").await.unwrap(), json!({"a": 1}));
    }

    #[tokio::test]
    async fn error_status_is_reported_with_body() {
        let router = Router::new().route(
            "/api/v1/master",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let client = test_support::client(&test_support::serve(router).await);

        match client.get("/master").await {
            Err(Error::StatusCodeError(status, body)) => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "down");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_backend() {
        let client = test_support::client("http://127.0.0.1:1");
        assert!(matches!(
            client.get("/master").await,
            Err(Error::ErrorReachingBackend(_))
        ));
    }

    #[tokio::test]
    async fn non_json_body_fails_decoding() {
        let router = Router::new().route("/api/v1/master", get(|| async { "not json" }));
        let client = test_support::client(&test_support::serve(router).await);
        assert!(matches!(
            client.get("/master").await,
            Err(Error::ErrorDecodingResponse(_))
        ));
    }

    #[tokio::test]
    async fn replace_processor_request_shape() {
        let seen = Arc::new(Mutex::new(None::<Value>));
        let recorder = seen.clone();
        let router = Router::new().route(
            "/api/v1/appmaster/{app_id}/dynamicdag",
            post(move |Path(app_id): Path<i32>, Json(body): Json<Value>| {
                let recorder = recorder.clone();
                async move {
                    assert_eq!(app_id, 4);
                    *recorder.lock().unwrap() = Some(body);
                    Json(json!({"success": false, "reason": "busy"}))
                }
            }),
        );
        let client = test_support::client(&test_support::serve(router).await);
        let patch = ProcessorPatch {
            task_class: "io.Sink".to_string(),
            description: "sink".to_string(),
            parallelism: 3,
            life: None,
        };

        let outcome = client.replace_dag_processor(4, 1, &patch).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.reason.as_deref(), Some("busy"));

        let body = seen.lock().unwrap().clone().unwrap();
        assert_eq!(body["$type"], REPLACE_PROCESSOR_TYPE);
        assert_eq!(body["oldProcessorId"], 1);
        assert_eq!(
            body["newProcessorDescription"],
            json!({"id": 1, "taskClass": "io.Sink", "description": "sink", "parallelism": 3})
        );
    }

    #[tokio::test]
    async fn kill_and_restart_app() {
        let router = Router::new()
            .route(
                "/api/v1/appmaster/{app_id}",
                delete(|Path(_): Path<i32>| async { StatusCode::OK }),
            )
            .route(
                "/api/v1/appmaster/{app_id}/restart",
                post(|Path(_): Path<i32>| async { Json(json!({"success": true})) }),
            );
        let client = test_support::client(&test_support::serve(router).await);

        client.kill_app(2).await.unwrap();
        let outcome = client.restart_app_async(2).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.reason, None);
    }

    #[test]
    fn api_root_hangs_off_the_base_url() {
        let client = RestClient::new(&ClientConfig {
            base_url: "http://dash:8090/".to_string(),
            ..Default::default()
        });
        assert_eq!(client.api_root(), "http://dash:8090/api/v1");
    }

    #[test]
    fn zero_poll_interval_uses_the_default() {
        let client = RestClient::new(&ClientConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        });
        assert_eq!(client.poll_interval(), ClientConfig::default().poll_interval);
    }
}
