use std::fs::File;
use std::io::BufReader;

use tracing_subscriber::EnvFilter;

use mulewatch::config::Config;

const DEFAULT_CONFIG: &str = "config.toml";

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=debug for more)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("analyze") => {
            let csv_path = args
                .get(1)
                .ok_or_else(|| eyre::eyre!("usage: mulewatch analyze <file.csv> [config.toml]"))?;
            let config_path = args.get(2).map(String::as_str).unwrap_or(DEFAULT_CONFIG);
            run_analyze(csv_path, config_path).await
        }
        other => {
            let config_path = other.unwrap_or(DEFAULT_CONFIG);
            run_server(config_path).await
        }
    }
}

/// One-shot analysis of a CSV file; the report JSON goes to stdout.
async fn run_analyze(csv_path: &str, config_path: &str) -> eyre::Result<()> {
    let config = Config::load_or_default(config_path)?;
    let file = File::open(csv_path)
        .map_err(|e| eyre::eyre!("Failed to open ledger '{}': {}", csv_path, e))?;

    let analysis = config.analysis.clone();
    let report = tokio::task::spawn_blocking(move || {
        mulewatch::analyze_csv(BufReader::new(file), None, &analysis)
    })
    .await??;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_server(config_path: &str) -> eyre::Result<()> {
    tracing::info!("MuleWatch starting");

    let config = Config::load_or_default(config_path)?;
    tracing::info!(
        max_transactions = config.analysis.max_transactions,
        row_limit = config.ingest.row_limit,
        "Configuration loaded from {}",
        config_path
    );

    if !config.api.enabled {
        tracing::warn!("API disabled in config, nothing to serve");
        return Ok(());
    }

    mulewatch::api::serve(&config).await?;

    tracing::info!("MuleWatch stopped gracefully");
    Ok(())
}
