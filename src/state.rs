//! Application state shared across the web handlers and background tasks.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::catalog::Catalog;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            started_at: Instant::now(),
        }
    }

    /// Spawn one refresh loop per dataset. Each exits when `cancel` fires.
    pub fn spawn_refresh_tasks(
        &self,
        cancel: &CancellationToken,
        interval: Duration,
        init_retry: Duration,
    ) -> Vec<JoinHandle<()>> {
        let strings = self.catalog.strings().clone();
        let strings_cancel = cancel.clone();
        let api = self.catalog.api().clone();
        let api_cancel = cancel.clone();

        vec![
            tokio::spawn(async move { strings.run(strings_cancel, interval, init_retry).await }),
            tokio::spawn(async move { api.run(api_cancel, interval, init_retry).await }),
        ]
    }
}
