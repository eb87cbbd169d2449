use clap::Parser;
use std::process::ExitCode;
use tracing::info;
use wowdex::app::App;
use wowdex::cli::Args;
use wowdex::config::Config;
use wowdex::logging::setup_logging;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config and setup logging before App::new() so startup logs are never silently dropped
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        "starting wowdex"
    );

    let mut app = match App::new(config).await {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = ?e, "Failed to initialize application");
            return ExitCode::FAILURE;
        }
    };

    app.start_refresh_tasks();
    app.run().await
}
