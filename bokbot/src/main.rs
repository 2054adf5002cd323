//! Bokbot - book, unbook and watch time slots on a legacy booking site.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bokbot::cli::{execute, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bokbot=info")),
        )
        .with_writer(std::io::stderr)
        .init();
    execute(Cli::parse()).await
}
