//! sliceboxd binary.

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = sliceboxd::Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = sliceboxd::run(cli).await {
        tracing::error!(error = %err, "sliceboxd stopped");
        std::process::exit(1);
    }
}
