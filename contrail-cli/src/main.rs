//! contrail - confidence tubes over stored signal populations

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use contrail_cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contrail=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    contrail_cli::run(Cli::parse()).await
}
