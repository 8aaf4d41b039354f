use tracing::warn;

use super::app::{ActionOutcome, AppDetail, AppId, AppSummary};
use crate::error::{Error, Result};
use crate::rest::RestClient;

/// Operations offered on an application row or page.
#[derive(Debug, Clone, Copy)]
pub struct AppActions<'a> {
    rest: &'a RestClient,
    app_id: AppId,
    restartable: bool,
}

impl AppActions<'_> {
    pub fn app_id(&self) -> AppId {
        self.app_id
    }

    pub async fn terminate(&self) -> Result<()> {
        self.rest.kill_app(self.app_id).await
    }

    pub async fn restart(&self) -> Result<ActionOutcome> {
        if !self.restartable {
            warn!(
                "[APP {}] Restart is not offered here: the app id changes after a restart",
                self.app_id
            );
            return Err(Error::Unsupported("restart from the application page"));
        }
        self.rest.restart_app_async(self.app_id).await
    }
}

impl AppSummary {
    pub fn actions<'a>(&self, rest: &'a RestClient) -> AppActions<'a> {
        AppActions {
            rest,
            app_id: self.id(),
            restartable: true,
        }
    }
}

impl AppDetail {
    pub fn actions<'a>(&self, rest: &'a RestClient) -> AppActions<'a> {
        AppActions {
            rest,
            app_id: self.id(),
            restartable: false,
        }
    }
}
