mod cli;
mod config;
mod http;
mod inflight;
mod state;
mod wiring;

use clap::Parser;
use spiral_infra::db::{run_migrations, DbPoolError};
use spiral_infra::Backend;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::ConfigError;
use crate::http::HttpError;
use crate::wiring::WiringError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("wiring error: {0}")]
    Wiring(#[from] WiringError),
    #[error("db error: {0}")]
    Db(#[from] DbPoolError),
    #[error("http error: {0}")]
    Http(#[from] HttpError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    config::load_dotenv()?;
    let config = config::AppConfig::from_env()?;
    let state = wiring::build_state(config)?;

    if cli.mode.run_migrations() {
        match state.db.as_ref() {
            Some(pool) => run_migrations(pool).await?,
            None => info!(backend = %state.store.kind(), "backend has no local schema to migrate"),
        }
    }
    if !cli.mode.run_api() {
        return Ok(());
    }

    if let Backend::Memory(store) = &state.store {
        if let Err(err) = wiring::seed_demo(store).await {
            warn!(error = %err, "demo spiral not seeded");
        }
    }

    let addr = state.config.http_addr;
    let api = tokio::spawn(async move {
        info!(%addr, "http server starting");
        http::serve(addr, state).await
    });

    tokio::select! {
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
        res = api => {
            res??;
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install ctrl-c handler");
    }
}
