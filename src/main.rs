use anyhow::Result;
use tracing_subscriber::EnvFilter;

use ripple::config::Config;
use ripple::server;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    server::serve(&config).await
}
