use anyhow::Context;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::data::{ApiIndexSource, GlobalStringsSource};
use crate::fetch::{FetchText, HttpFetcher};
use crate::state::AppState;
use crate::utils::fmt_duration;
use crate::web::create_router;
use crate::wiki::WikiClient;

/// Per-request deadline for HTTP handlers.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    app_state: AppState,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl App {
    /// Build the catalog and perform the initial population.
    ///
    /// A failed initial population is not fatal: the refresh tasks keep
    /// retrying and reads answer "not ready" until they succeed.
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let fetcher: Arc<dyn FetchText> = Arc::new(
            HttpFetcher::new(config.fetch_timeout, config.fetch_retry_delay)
                .context("Failed to create HTTP client")?,
        );
        Self::with_fetcher(config, fetcher).await
    }

    pub async fn with_fetcher(
        config: Config,
        fetcher: Arc<dyn FetchText>,
    ) -> Result<Self, anyhow::Error> {
        let catalog = Arc::new(Catalog::new(
            GlobalStringsSource::new(fetcher.clone(), config.strings_url_template.clone()),
            ApiIndexSource::new(fetcher.clone(), config.api_url_template.clone()),
            WikiClient::new(
                fetcher,
                &config.wiki_base_url,
                config.page_cache_capacity,
                config.page_cache_ttl,
            ),
        ));

        let (strings, api) = tokio::join!(catalog.strings().load(), catalog.api().load());
        if let Err(e) = strings {
            warn!(error = %e, "Initial global strings load failed (non-fatal)");
        }
        if let Err(e) = api {
            warn!(error = %e, "Initial API index load failed (non-fatal)");
        }

        Ok(App {
            config,
            app_state: AppState::new(catalog),
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        })
    }

    pub fn state(&self) -> &AppState {
        &self.app_state
    }

    /// Spawn the background refresh tasks.
    pub fn start_refresh_tasks(&mut self) {
        let handles = self.app_state.spawn_refresh_tasks(
            &self.cancel,
            self.config.refresh_interval,
            self.config.init_retry_interval,
        );
        self.tasks.extend(handles);
    }

    /// Serve HTTP until a shutdown signal arrives, then stop the background
    /// tasks within the configured shutdown timeout.
    pub async fn run(mut self) -> ExitCode {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(error = %e, %addr, "Failed to bind web server");
                return ExitCode::FAILURE;
            }
        };
        info!(%addr, "web server listening");

        let router = create_router(self.app_state.clone(), REQUEST_TIMEOUT);
        let cancel = self.cancel.clone();
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await
        });
        self.tasks.push(tokio::spawn(supervise_server(server, self.cancel.clone())));

        let exit_code = tokio::select! {
            _ = shutdown_signal() => ExitCode::SUCCESS,
            _ = self.cancel.cancelled() => ExitCode::FAILURE,
        };
        self.shutdown().await;
        exit_code
    }

    async fn shutdown(self) {
        let timeout = self.config.shutdown_timeout;
        info!(timeout = fmt_duration(timeout), "shutting down");
        self.cancel.cancel();

        let join_all = futures::future::join_all(self.tasks);
        match tokio::time::timeout(timeout, join_all).await {
            Ok(_) => info!("all tasks stopped"),
            Err(_) => warn!(
                timeout = fmt_duration(timeout),
                "tasks did not stop within shutdown timeout"
            ),
        }
    }
}

/// Wait for the server task; a failed or panicked server cancels the app so
/// `run` exits instead of idling without a listener.
async fn supervise_server(server: JoinHandle<std::io::Result<()>>, cancel: CancellationToken) {
    match server.await {
        Ok(Ok(())) => info!("web server stopped"),
        Ok(Err(e)) => {
            error!(error = %e, "web server failed");
            cancel.cancel();
        }
        Err(e) => {
            error!(error = %e, "web server task panicked");
            cancel.cancel();
        }
    }
}

/// Resolves on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }
}
