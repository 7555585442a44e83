//! Webhook relay server entrypoint.

#![forbid(unsafe_code)]

use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use relay_core::Secret;
use relay_server::{AppState, RelayConfig, build_router};
use tracing::{info, warn};

/// Verifies inbound payment and board webhooks and syncs them into the job ledger.
#[derive(Parser, Debug)]
#[command(name = "relay-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file. Every setting has a default.
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overriding `server.bind`.
    #[arg(long, env = "RELAY_BIND")]
    bind: Option<SocketAddr>,

    /// Log filter, overriding `logging.log_level`.
    #[arg(long, env = "RELAY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Human-readable logs instead of JSON.
    #[arg(long)]
    pretty_logs: bool,

    #[arg(long, env = "PAYMENTS_WEBHOOK_SECRET", hide_env_values = true)]
    payments_webhook_secret: Option<String>,

    #[arg(long, env = "BOARD_WEBHOOK_SECRET", hide_env_values = true)]
    board_webhook_secret: Option<String>,

    #[arg(long, env = "TOKEN_SECRET", hide_env_values = true)]
    token_secret: Option<String>,

    #[arg(long, env = "PAYMENTS_API_KEY", hide_env_values = true)]
    payments_api_key: Option<String>,

    #[arg(long, env = "BOARD_API_TOKEN", hide_env_values = true)]
    board_api_token: Option<String>,

    #[arg(long, env = "LEDGER_API_TOKEN", hide_env_values = true)]
    ledger_api_token: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut RelayConfig) {
        fn set(target: &mut Secret, value: Option<String>) {
            if let Some(value) = value {
                *target = Secret::new(value);
            }
        }

        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(level) = self.log_level {
            config.logging.log_level = level;
        }
        if self.pretty_logs {
            config.logging.json_logs = false;
        }
        set(&mut config.secrets.payments_webhook_secret, self.payments_webhook_secret);
        set(&mut config.secrets.board_webhook_secret, self.board_webhook_secret);
        set(&mut config.secrets.token_secret, self.token_secret);
        set(&mut config.credentials.payments_api_key, self.payments_api_key);
        set(&mut config.credentials.board_api_token, self.board_api_token);
        set(&mut config.credentials.ledger_api_token, self.ledger_api_token);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RelayConfig::load(path)?,
        None => RelayConfig::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    relay_telemetry::init_telemetry(&config.logging)?;

    for secret in config.missing_secrets() {
        warn!(secret, "Secret not configured; affected requests will fail closed");
    }
    if config.webhook.allow_unsigned_board_events && config.secrets.board_webhook_secret.is_empty() {
        warn!("Unsigned board events are accepted; the board channel is unauthenticated");
    }

    let state = AppState::from_config(&config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    info!(addr = %config.server.bind, "Relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Ctrl-C received, shutting down"),
        () = terminate => info!("SIGTERM received, shutting down"),
    }
}
