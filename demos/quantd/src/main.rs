use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

mod config;

use config::Config;
use qk_engine::{AnalysisResult, BinanceFeed, QuantEngine};
use qk_signals::{ScoreWeights, SignalScorer};

#[derive(Parser, Debug)]
#[clap(name = "quantd", about = "Real-time multi-symbol signal daemon")]
struct Args {
    #[clap(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration, falling back to defaults when no file exists
    let config = if args.config.exists() {
        info!("Loading configuration from {:?}", args.config);
        Config::load(&args.config)?
    } else {
        warn!("No config at {:?}, using defaults", args.config);
        Config::default()
    };

    // Load scoring weights
    let scorer = match &config.scoring.weights_file {
        Some(path) => {
            info!("Loading scoring weights from {}", path);
            let yaml = std::fs::read_to_string(path)?;
            let weights = ScoreWeights::from_yaml(&yaml)
                .map_err(|e| anyhow::anyhow!("Failed to load scoring weights: {}", e))?;
            SignalScorer::new(weights)
        }
        None => SignalScorer::default(),
    };

    // Start the engine
    let feed = Arc::new(BinanceFeed::new()?);
    let engine = QuantEngine::with_scorer(config.engine_config(), feed, scorer);
    engine.start().await?;

    let mut sub = engine.subscribe();
    info!("quantd running, press Ctrl-C to stop");

    loop {
        tokio::select! {
            result = sub.receiver.recv() => {
                match result {
                    Some(result) => log_result(&result),
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    engine.stop().await?;
    info!("quantd shut down");
    Ok(())
}

fn log_result(result: &AnalysisResult) {
    info!(
        "{} ${:.2} ({:+.2}% 24h) | {} score={} conf={}% | regime={} session={} | size {:.0}% stop {:.2}",
        result.symbol,
        result.market.price,
        result.market.change_percent_24h,
        result.signal.label,
        result.signal.score,
        result.signal.confidence,
        result.regime,
        result.active_session,
        result.risk.recommended_position_size * 100.0,
        result.risk.stop_loss_distance,
    );

    if let Some(best) = result.entries.first() {
        info!(
            "  best entry: {} {} @ ${:.2} (win {}%, TP ${:.2} / SL ${:.2}) - {}",
            best.side, best.tier, best.price, best.win_rate, best.tp_price, best.sl_price,
            best.reason,
        );
    }

    info!("  {}", result.recommendation);
}
