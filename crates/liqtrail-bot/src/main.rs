//! liqtrail - trailing stop service entry point.
//!
//! Replays a recorded entry/tick/close feed through the sharded stop
//! dispatcher and acts on the exit signals it emits.

use anyhow::Result;
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;

use liqtrail_bot::{AppConfig, ReplayRunner};
use liqtrail_telemetry::Metrics;

/// Liquidity-aware adaptive trailing stop service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via LIQTRAIL_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Replay feed in JSON lines ("-" reads stdin)
    #[arg(short, long, default_value = "demos/replay.jsonl")]
    feed: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Determine config path: CLI arg > LIQTRAIL_CONFIG env var > default
    let config_path = AppConfig::resolve_path(args.config);
    let config_found = std::path::Path::new(&config_path).exists();
    let config = AppConfig::load_from(&config_path)?;

    // Logging level comes from the config, so it starts after loading
    liqtrail_telemetry::init_logging(&config.telemetry.log_level)?;

    info!("Starting liqtrail v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_path = %config_path,
        found = config_found,
        shards = config.dispatcher.shards,
        users = config.users.len(),
        "Configuration loaded"
    );

    let print_metrics = config.telemetry.print_metrics;
    let runner = ReplayRunner::new(config);

    info!(feed = %args.feed, "Replaying feed");
    let summary = if args.feed == "-" {
        runner.run(BufReader::new(tokio::io::stdin())).await?
    } else {
        let file = tokio::fs::File::open(&args.feed).await?;
        runner.run(BufReader::new(file)).await?
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);

    if print_metrics {
        print!("{}", Metrics::render()?);
    }

    Ok(())
}
