//! Donation Server
//!
//! Stripe payment intents, webhook intake and Kafka donation notifications.

use donation_server::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();

    // RUST_LOG wins over --verbose
    let default_filter = if config.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        version = donation_server::VERSION,
        "Donation server starting on {}:{}",
        config.host,
        config.port
    );
    tracing::debug!(?config, "Loaded configuration");

    donation_server::server::run(config).await
}
