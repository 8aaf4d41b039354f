//! Fake backend and helpers shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, MethodRouter};
use axum::Json;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::rest::{ClientConfig, RestClient};

pub(crate) const POLL: Duration = Duration::from_millis(20);

/// Serves `router` on an ephemeral local port and returns its base url.
pub(crate) async fn serve(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

pub(crate) fn client(base_url: &str) -> RestClient {
    RestClient::new(&ClientConfig {
        base_url: base_url.to_string(),
        poll_interval: POLL,
    })
}

/// Responses handed out in order; the last one repeats forever.
#[derive(Clone)]
pub(crate) struct Script {
    responses: Arc<Mutex<VecDeque<(StatusCode, Value)>>>,
}

impl Script {
    pub(crate) fn new(responses: Vec<(StatusCode, Value)>) -> Self {
        Script {
            responses: Arc::new(Mutex::new(responses.into())),
        }
    }

    pub(crate) fn ok(bodies: Vec<Value>) -> Self {
        Self::new(bodies.into_iter().map(|b| (StatusCode::OK, b)).collect())
    }

    fn next(&self) -> (StatusCode, Value) {
        let mut responses = self.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses.front().cloned().unwrap()
        }
    }

    pub(crate) fn handler(&self) -> MethodRouter {
        let script = self.clone();
        get(move || {
            let (status, body) = script.next();
            async move { (status, Json(body)) }
        })
    }
}

/// Waits for the next message, failing the test after two seconds.
pub(crate) async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a delivery")
        .expect("channel closed")
}

/// Polls `check` until it holds, failing the test after two seconds.
pub(crate) async fn eventually<F: FnMut() -> bool>(mut check: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// A streaming app with two processors, one edge and two executors.
pub(crate) fn app_detail_json() -> Value {
    json!({
        "appId": 1,
        "appName": "wordcount",
        "clock": "1468000000000",
        "startTime": "1467990000000",
        "uptime": "10000000",
        "user": "alice",
        "processors": [
            [0, {"id": 0, "taskClass": "io.Split", "parallelism": 2, "description": "split"}],
            [1, {"id": 1, "taskClass": "io.Sum", "parallelism": 1, "description": "sum",
                 "life": {"birth": "0", "death": "9223372036854775807"}}]
        ],
        "processorLevels": [[0, 0], [1, 1]],
        "dag": {"vertexList": [0, 1], "edgeList": [[0, "hash", 1]]},
        "executors": [
            {"executorId": -1, "workerId": 1, "status": "active", "executor": "akka://a"},
            {"executorId": 0, "workerId": 2, "status": "launching"}
        ]
    })
}
