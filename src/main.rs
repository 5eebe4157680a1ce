mod config;
mod error;
mod fetcher;
mod pipeline;
mod reporter;
mod scanner;
mod sink;
mod types;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::Result;
use crate::fetcher::ScreenerClient;
use crate::scanner::{ScanOutcome, Scanner};
use crate::sink::build_sink;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Scan failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // Sink first: configuration errors must surface before any network work.
    let sink = build_sink(&cfg)?;
    let source = ScreenerClient::from_config(&cfg)?;

    info!(
        output = cfg.output.kind(),
        direction = %cfg.direction,
        row_limit = cfg.row_limit,
        "Bounce 2.0 scanner configured"
    );

    let outcome = Scanner::new(&source, sink.as_ref(), cfg.direction).run().await?;
    match outcome {
        ScanOutcome::EmptySnapshot => info!("Scan finished: screener returned no rows"),
        ScanOutcome::NoCandidates => info!("Scan finished: no candidates survived filtering"),
        ScanOutcome::Delivered(n) => info!("Scan finished: {n} candidates delivered"),
    }
    Ok(())
}
