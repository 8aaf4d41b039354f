//! Live updates by polling, bound to the lifetime of a view.

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use super::client::RestClient;
use crate::error::Result;

/// Lifetime of a view. Every subscription registered with a scope stops once
/// the scope is destroyed or dropped.
#[derive(Debug)]
pub struct Scope {
    destroyed: watch::Sender<bool>,
}

impl Scope {
    pub fn new() -> Self {
        let (destroyed, _) = watch::channel(false);
        Scope { destroyed }
    }

    pub fn destroy(&self) {
        self.destroyed.send_replace(true);
    }

    pub fn is_destroyed(&self) -> bool {
        *self.destroyed.borrow()
    }

    fn watch(&self) -> watch::Receiver<bool> {
        self.destroyed.subscribe()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Handle of a registered subscription. Dropping it leaves the subscription
/// running until its scope ends.
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cancel(&self) {
        debug!("[SUBSCRIBE] {} cancelled", self.id);
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl RestClient {
    /// Polls `path` every poll interval and hands each result to `on_tick`,
    /// until `scope` is destroyed. The first poll happens one interval after
    /// registration.
    pub fn subscribe<F>(&self, path: &str, scope: &Scope, mut on_tick: F) -> Subscription
    where
        F: FnMut(Result<Value>) + Send + 'static,
    {
        let id = Uuid::new_v4();
        let client = self.clone();
        let path = path.to_string();
        let mut destroyed = scope.watch();
        info!("[SUBSCRIBE] {} registered for {}", id, path);

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(client.poll_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick fires at once; the caller already holds a fresh value
            ticker.tick().await;

            loop {
                if *destroyed.borrow() {
                    break;
                }
                tokio::select! {
                    biased;
                    changed = destroyed.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let result = client.get(&path).await;
                        if *destroyed.borrow() {
                            break;
                        }
                        on_tick(result);
                    }
                }
            }
            debug!("[SUBSCRIBE] {} for {} stopped", id, path);
        });

        Subscription { id, task }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;
    use crate::rest::ClientConfig;
    use crate::test_support;

    fn counting_router() -> Router {
        let hits = Arc::new(AtomicUsize::new(0));
        Router::new().route(
            "/api/v1/master",
            get(move || {
                let n = hits.fetch_add(1, Ordering::SeqCst);
                async move { Json(json!({ "n": n })) }
            }),
        )
    }

    #[tokio::test]
    async fn delivers_ticks_until_scope_destroyed() {
        let client = test_support::client(&test_support::serve(counting_router()).await);
        let scope = Scope::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let sub = client.subscribe("/master", &scope, move |tick| {
            let _ = tx.send(tick.map(|v| v["n"].clone()));
        });

        let first = test_support::recv(&mut rx).await.unwrap();
        let second = test_support::recv(&mut rx).await.unwrap();
        assert_ne!(first, second);

        scope.destroy();
        assert!(scope.is_destroyed());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(sub.is_finished());
    }

    #[tokio::test]
    async fn dropping_the_scope_stops_polling() {
        let client = test_support::client(&test_support::serve(counting_router()).await);
        let scope = Scope::new();
        let sub = client.subscribe("/master", &scope, |_| {});
        drop(scope);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(sub.is_finished());
    }

    #[tokio::test]
    async fn destroyed_scope_never_delivers() {
        let client = test_support::client(&test_support::serve(counting_router()).await);
        let scope = Scope::new();
        scope.destroy();
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = delivered.clone();

        let sub = client.subscribe("/master", &scope, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(delivered.load(Ordering::SeqCst), 0);
        assert!(sub.is_finished());
    }

    #[tokio::test]
    async fn cancelled_subscription_stops_while_scope_lives() {
        let client = test_support::client(&test_support::serve(counting_router()).await);
        let scope = Scope::new();
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = delivered.clone();
        let cancelled = client.subscribe("/master", &scope, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let other = client.subscribe("/master", &scope, move |tick| {
            let _ = tx.send(tick.is_ok());
        });

        test_support::eventually(|| delivered.load(Ordering::SeqCst) > 0).await;
        cancelled.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cancelled.is_finished());
        let seen = delivered.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(delivered.load(Ordering::SeqCst), seen);
        assert!(!scope.is_destroyed());
        assert!(test_support::recv(&mut rx).await);
        assert!(!other.is_finished());
    }

    #[tokio::test]
    async fn zero_poll_interval_keeps_the_task_alive() {
        let base = test_support::serve(counting_router()).await;
        let client = RestClient::new(&ClientConfig {
            base_url: base,
            poll_interval: Duration::ZERO,
        });
        let scope = Scope::new();
        let sub = client.subscribe("/master", &scope, |_| {});
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!sub.is_finished());
        scope.destroy();
    }

    #[tokio::test]
    async fn transport_errors_reach_the_callback() {
        let client = test_support::client("http://127.0.0.1:1");
        let scope = Scope::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = client.subscribe("/master", &scope, move |tick| {
            let _ = tx.send(tick.is_err());
        });
        assert!(test_support::recv(&mut rx).await);
        sub.cancel();
    }
}
