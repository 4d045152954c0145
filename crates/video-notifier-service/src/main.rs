//! # Video Notifier Service
//!
//! Binary entry point for the video notifier HTTP service.
//!
//! This executable:
//! - Loads configuration from a file, the environment and the command line
//! - Initializes structured logging
//! - Wires the credential manager, fetcher and forwarder into the
//!   notification pipeline
//! - Starts the HTTP server from video-notifier-api

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::Args;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use video_notifier_api::{
    start_server, AppState, DefaultHealthChecker, LoggingConfig, MeteredRenewer, NotifierMetrics,
    ServiceConfig, ServiceError,
};
use video_notifier_core::{
    auth::{CredentialManager, CredentialRenewer, Credentials},
    fetcher::VideoFetcher,
    forwarder::VideoForwarder,
    notification::NotificationHandler,
};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Logging settings may come from the configuration itself, so load it
    // first and report a load failure once logging is up.
    let loaded = cli::load_service_config(&args);
    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging);

    info!("Starting video notifier");

    let service_config = match loaded {
        Ok(service_config) => service_config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration; aborting");
            std::process::exit(3);
        }
    };

    if let Err(e) = service_config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(3);
    }

    info!("{}", service_config);

    let state = match build_state(&service_config) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %format_args!("{e:#}"), "Failed to initialize service; aborting");
            std::process::exit(4);
        }
    };

    if let Err(e) = start_server(&service_config, state).await {
        error!(error = %e, "Server stopped with an error");

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
            ServiceError::Initialization { .. } => 4,
        };

        std::process::exit(exit_code);
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.as_str().into());

    let registry = tracing_subscriber::registry().with(filter);

    if logging.json_format {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Build the notification pipeline and everything the HTTP layer shares
fn build_state(config: &ServiceConfig) -> anyhow::Result<AppState> {
    let http_client = config
        .http_client_config()
        .build_client()
        .context("building the outbound HTTP client")?;

    let metrics = NotifierMetrics::new().context("registering metrics")?;

    let credential_manager = CredentialManager::new(
        http_client.clone(),
        config.oauth_config(),
        Arc::new(Credentials::new()),
    );
    let renewer: Arc<dyn CredentialRenewer> = Arc::new(MeteredRenewer::new(
        Arc::new(credential_manager),
        metrics.clone(),
    ));

    let fetcher = VideoFetcher::new(http_client.clone(), config.fetcher_config(), renewer.clone());
    let forwarder = VideoForwarder::new(http_client, config.forwarder_config());

    let account_id = config.upstream.account_id.as_str();
    let notification_handler = Arc::new(NotificationHandler::new(
        account_id,
        Arc::new(fetcher),
        Arc::new(forwarder),
    ));

    let health_checker = Arc::new(DefaultHealthChecker::new(account_id).with_credentials(renewer));

    info!(account_id = %account_id, "Notification pipeline ready");

    Ok(AppState::new(notification_handler, health_checker, metrics))
}
