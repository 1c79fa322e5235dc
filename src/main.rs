//
// main.rs
// Atlas-Overlap
//
// Tokio entry point: installs the log subscriber, then hands off execution to the CLI layer.
//

use atlas_overlap::cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default `info` level.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    cli::run().await
}
