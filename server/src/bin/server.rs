//! Rental reservation and checkout HTTP server.

use rental_server::{Config, init_tracing, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting rental server");

    run(Config::from_env()).await
}
