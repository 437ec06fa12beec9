//! HTTP front end for the slicing service.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use std::path::PathBuf;

use clap::Parser;
use slicebox_core::config::{load_service_config, ServiceConfig};
use slicebox_core::{ConfigError, DownloadError, RemoteError};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("remote client error: {0}")]
    Remote(#[from] RemoteError),
    #[error("downloader error: {0}")]
    Download(#[from] DownloadError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Splits recordings stored in Dropbox and spreads the pieces across
/// numbered folders.
#[derive(Parser, Debug)]
#[command(name = "sliceboxd", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file; built-in defaults apply when absent
    #[arg(
        short,
        long,
        env = "SLICEBOX_CONFIG",
        default_value = "configs/slicebox.toml"
    )]
    pub config: PathBuf,
    /// Address to bind, overriding `server.host`
    #[arg(long)]
    pub host: Option<String>,
    /// Port to bind, overriding `server.port` and `PORT`
    #[arg(long)]
    pub port: Option<u16>,
}

/// File values, then the environment, then command-line flags.
pub fn load_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut config = if cli.config.exists() {
        load_service_config(&cli.config)?
    } else {
        warn!(path = %cli.config.display(), "config file not found, using defaults");
        ServiceConfig::default()
    };
    config.apply_env()?;
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::from_config(config)?;
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "sliceboxd listening");
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}
