//! promdump
//!
//! Run with: cargo run -- dump -u http://localhost:9090 'up'
//!
//! Every flag can also be set from the environment:
//! - PROMDUMP_URL: Prometheus base URL(s), comma-separated
//! - PROMDUMP_BACKEND: http1 or http2 (default: http1)
//! - PROMDUMP_CLIENT_CERT: PEM client certificate
//! - PROMDUMP_FORMAT / PROMDUMP_LAYOUT / PROMDUMP_COMPRESS: output encoding
//! - RUST_LOG: Log level (default: promdump=info)
//!
//! Data goes to stdout, logs go to stderr.

use clap::Parser;
use promdump::cli::{self, Cli};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "promdump=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling in-flight queries");
            interrupt.cancel();
        }
    });

    if let Err(e) = cli::run(cli, cancel).await {
        tracing::debug!(error = ?e, "promdump failed");
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
