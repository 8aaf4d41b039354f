use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::dag::StreamingDag;
use crate::error::Result;
use crate::models::{AppDetail, AppId, Model, Models, StallingTasks};
use crate::rest::{Scope, Subscription};
use crate::util::readable_duration;

pub const CLOCK_CONCERN: &str =
    "Application clock does not go forward. Click here to check red processor(s).";

/// Everything the application page shows.
#[derive(Debug, Clone)]
pub struct AppView {
    pub app: AppDetail,
    pub uptime_compact: String,
    pub dag: StreamingDag,
    pub app_clock_concern: Option<String>,
    pub destroyed: bool,
}

impl AppView {
    fn update_app_details(&mut self, app: AppDetail) {
        self.uptime_compact = readable_duration(app.raw.uptime);
        self.dag.set_data(
            app.raw.clock,
            app.raw.processors.clone(),
            app.raw.processor_levels.clone(),
            app.edges().to_vec(),
        );
        self.app = app;
    }

    fn update_stalling_tasks(&mut self, tasks: StallingTasks) {
        self.app_clock_concern = if self.app.is_running && !tasks.is_empty() {
            Some(CLOCK_CONCERN.to_string())
        } else {
            None
        };
        self.dag.set_stalling_tasks(tasks);
    }

    pub fn stalling_processor_count(&self) -> usize {
        self.dag.stalling_tasks().len()
    }
}

type SharedView = Arc<Mutex<AppView>>;

/// Applies `f` unless the view was torn down.
fn write(view: &SharedView, f: impl FnOnce(&mut AppView)) {
    let mut view = view.lock().unwrap_or_else(PoisonError::into_inner);
    if view.destroyed {
        return;
    }
    f(&mut view);
}

/// Keeps an [`AppView`] in sync with the app, its stalling tasks and its metrics.
#[derive(Debug)]
pub struct AppDetailController {
    view: SharedView,
    scope: Scope,
    subscriptions: Vec<Subscription>,
}

impl AppDetailController {
    pub async fn load(models: &Models, app_id: AppId) -> Result<Self> {
        let app0 = models.app_detail(app_id).await?;
        Ok(Self::init(models, app0).await)
    }

    pub async fn init(models: &Models, app0: Model<AppDetail>) -> Self {
        let app = app0.data();
        let app_id = app.id();
        let view = Arc::new(Mutex::new(AppView {
            uptime_compact: readable_duration(app.raw.uptime),
            dag: models.create_dag(&app),
            app,
            app_clock_concern: None,
            destroyed: false,
        }));
        let scope = Scope::new();
        let mut subscriptions = Vec::new();

        let on_update = view.clone();
        let on_failure = view.clone();
        subscriptions.push(app0.subscribe_with_error(
            &scope,
            move |app| write(&on_update, |v| v.update_app_details(app)),
            move |err| {
                warn!("[APP {}] Lost contact with app master: {}", app_id, err);
                write(&on_failure, |v| {
                    let terminated = v.app.as_terminated();
                    v.update_app_details(terminated);
                });
            },
        ));

        let (tasks0, metrics0) = futures::join!(
            models.app_stalling_tasks(app_id),
            models.app_metrics(app_id, false)
        );

        match tasks0 {
            Ok(tasks0) => {
                write(&view, |v| v.update_stalling_tasks(tasks0.data()));
                let view = view.clone();
                subscriptions.push(tasks0.subscribe(&scope, move |tasks| {
                    write(&view, |v| v.update_stalling_tasks(tasks))
                }));
            }
            Err(err) => warn!("[APP {}] Could not fetch stalling tasks: {}", app_id, err),
        }

        match metrics0 {
            Ok(metrics0) => {
                write(&view, |v| v.dag.update_metrics_array(metrics0.data()));
                let view = view.clone();
                subscriptions.push(metrics0.subscribe(&scope, move |metrics| {
                    write(&view, |v| v.dag.update_metrics_array(metrics))
                }));
            }
            Err(err) => warn!("[APP {}] Could not fetch metrics: {}", app_id, err),
        }

        info!(
            "[APP {}] View ready with {} subscriptions",
            app_id,
            subscriptions.len()
        );
        AppDetailController {
            view,
            scope,
            subscriptions,
        }
    }

    pub fn view(&self) -> AppView {
        self.with_view(AppView::clone)
    }

    pub fn with_view<R>(&self, f: impl FnOnce(&AppView) -> R) -> R {
        let view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        f(&view)
    }

    pub fn is_destroyed(&self) -> bool {
        self.with_view(|v| v.destroyed)
    }

    /// Tears the view down. No update reaches it afterwards.
    pub fn destroy(&self) {
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .destroyed = true;
        self.scope.destroy();
        for subscription in &self.subscriptions {
            subscription.cancel();
        }
    }
}

impl Drop for AppDetailController {
    fn drop(&mut self) {
        self.destroy();
    }
}
