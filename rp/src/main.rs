//! rp - CLI entry point for the request pacer

use std::io::Write;

use bytes::Bytes;
use clap::Parser;
use eyre::{Context, Result};
use futures::future::join_all;
use tracing::error;

use requestpacer::RequestPacer;
use requestpacer::cli::{Cli, Command};
use requestpacer::config::Config;

fn setup_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Command::Get { urls, raw } => cmd_get(config, urls, raw).await,
    }
}

/// Response body in the shape the user asked for
enum Fetched {
    Text(String),
    Bytes(Bytes),
}

/// Fetch all URLs concurrently through the shared pacer
async fn cmd_get(config: Config, urls: Vec<String>, raw: bool) -> Result<()> {
    let pacer = RequestPacer::instance();
    pacer
        .configure_with(config)
        .await
        .context("Failed to configure request pacer")?;

    let results = join_all(urls.iter().map(|url| {
        let pacer = &pacer;
        async move {
            if raw {
                pacer.get_raw(url).await.map(Fetched::Bytes)
            } else {
                pacer.get(url).await.map(Fetched::Text)
            }
        }
    }))
    .await;

    let mut stdout = std::io::stdout();
    let mut failures = 0usize;
    for (url, result) in urls.iter().zip(results) {
        match result {
            Ok(Fetched::Text(body)) => println!("{body}"),
            Ok(Fetched::Bytes(bytes)) => stdout.write_all(&bytes).context("Failed to write response bytes")?,
            Err(err) => {
                error!(url = %url, error = %err, "fetch failed");
                failures += 1;
            }
        }
    }

    pacer.shutdown().await;

    if failures > 0 {
        return Err(eyre::eyre!("{failures} of {} fetches failed", urls.len()));
    }
    Ok(())
}
