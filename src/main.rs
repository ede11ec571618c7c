//! Options Recommender - Main Entry Point
//!
//! Builds the best strategy of each shape for a ticker, expiration and
//! market view, from live market data or a saved chain snapshot.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use options_recommender::config::Config;
use options_recommender::market::{ChainSnapshot, HttpMarketData, MarketDataProvider, SnapshotProvider};
use options_recommender::strategy::{
    evaluate_saved, ImpliedMoveReport, RecommendRequest, Recommendation, Recommender, Sentiment,
    StrategyEngine,
};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Options Recommender CLI
#[derive(Parser)]
#[command(name = "options-recommender")]
#[command(version, about = "Rank option strategies for a market view")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend the best strategy of each shape
    Recommend {
        #[command(flatten)]
        source: SourceArgs,

        /// very_bearish, bearish, neutral, bullish, very_bullish or directional
        #[arg(short, long)]
        sentiment: Sentiment,

        /// Risk/reward slider: 0 favours probability, 100 favours return
        #[arg(long, default_value = "50")]
        slider: f64,

        /// Target price (derived from sentiment and implied move when omitted)
        #[arg(long, default_value = "")]
        target: String,

        /// Budget, e.g. "$2,500"
        #[arg(short, long, default_value = "")]
        budget: String,
    },

    /// Show the ATM implied volatility, implied move and sentiment target
    ImpliedMove {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(short, long, default_value = "neutral")]
        sentiment: Sentiment,
    },
}

/// Where the chain comes from.
#[derive(Args)]
struct SourceArgs {
    /// Underlying ticker
    #[arg(short, long)]
    ticker: String,

    /// Expiration date (YYYY-MM-DD)
    #[arg(short, long)]
    expiration: NaiveDate,

    /// Read quote and chain from this snapshot file
    #[arg(long, conflicts_with = "offline")]
    snapshot: Option<PathBuf>,

    /// Read from the configured snapshot directory instead of the live APIs
    #[arg(long)]
    offline: bool,

    /// Valuation date (defaults to today, UTC)
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

impl SourceArgs {
    fn as_of(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    let config = Config::load()?;
    config.validate()?;
    log_config(&config);

    let engine = StrategyEngine::from_config(&config);

    match cli.command {
        Commands::Recommend {
            source,
            sentiment,
            slider,
            target,
            budget,
        } => {
            let request = RecommendRequest {
                ticker: source.ticker.to_uppercase(),
                expiration: source.expiration,
                sentiment,
                slider: slider.clamp(0.0, 100.0),
                target_price: target,
                budget,
                as_of: source.as_of(),
            };

            let recommendation = if let Some(path) = &source.snapshot {
                let snapshot = ChainSnapshot::load(path)?;
                evaluate_saved(&engine, &request, snapshot.quote.clone(), &snapshot.chain())
                    .with_context(|| format!("Snapshot {} is unusable", path.display()))?
            } else if source.offline {
                let provider = SnapshotProvider::new(&config.market_data.snapshot_dir);
                Recommender::new(provider, engine).recommend(&request).await?
            } else {
                let provider = HttpMarketData::new(&config.market_data)?;
                Recommender::new(provider, engine).recommend(&request).await?
            };

            if source.json {
                println!("{}", serde_json::to_string_pretty(&recommendation)?);
            } else {
                print_recommendation(&recommendation);
            }
        }
        Commands::ImpliedMove { source, sentiment } => {
            let ticker = source.ticker.to_uppercase();
            let as_of = source.as_of();

            let report = if let Some(path) = &source.snapshot {
                let snapshot = ChainSnapshot::load(path)?;
                let quote = snapshot
                    .quote
                    .with_context(|| format!("Snapshot {} has no quote", path.display()))?;
                ImpliedMoveReport::from_chain(
                    &ticker,
                    source.expiration,
                    quote.price,
                    &snapshot.results,
                    sentiment,
                    as_of,
                )
            } else if source.offline {
                let provider = SnapshotProvider::new(&config.market_data.snapshot_dir);
                implied_move(provider, engine, &ticker, source.expiration, sentiment, as_of).await?
            } else {
                let provider = HttpMarketData::new(&config.market_data)?;
                implied_move(provider, engine, &ticker, source.expiration, sentiment, as_of).await?
            };

            if source.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_implied_move(&report);
            }
        }
    }

    Ok(())
}

async fn implied_move<P: MarketDataProvider>(
    provider: P,
    engine: StrategyEngine,
    ticker: &str,
    expiration: NaiveDate,
    sentiment: Sentiment,
    as_of: NaiveDate,
) -> Result<ImpliedMoveReport> {
    Recommender::new(provider, engine)
        .implied_move(ticker, expiration, sentiment, as_of)
        .await
        .context("Failed to compute implied move")
}

/// Initialize logging with both console and file output.
fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::daily("logs", "options-recommender.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the guard alive for the program duration
    Box::leak(Box::new(guard));

    // Console logs go to stderr so --json output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("options_recommender=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stderr.with_max_level(Level::INFO).and(file_writer))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    Ok(())
}

/// Log configuration on startup.
fn log_config(config: &Config) {
    info!("📋 Configuration:");
    info!("   Probability Model: {:?}", config.engine.pop_model);
    info!("   Risk-Free Rate: {:.2}%", config.engine.risk_free_rate * 100.0);
    info!(
        "   Fallback Volatility: {:.0}%",
        config.engine.default_volatility * 100.0
    );
    info!(
        "   Spread Width: ${:.2} .. {:.0}% of spot",
        config.engine.min_spread_width,
        config.engine.max_spread_width_pct * 100.0
    );
    info!("   Extended Shapes: {}", config.engine.include_extended_shapes);
    info!(
        "   Profit At Target Required: {}",
        config.engine.require_profit_at_target
    );
    info!("   Min Mid Price: ${:.2}", config.liquidity.min_mid_price);
}

fn print_recommendation(rec: &Recommendation) {
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║              STRATEGY RECOMMENDATIONS                      ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    println!("\n📊 Market");
    println!("   ├─ Ticker:      {}", rec.ticker);
    println!("   ├─ Price:       ${:.2}", rec.quote.price);
    println!("   ├─ Expiration:  {}", rec.expiration);
    match rec.volatility {
        Some(v) => {
            println!("   ├─ ATM IV:      {:.1}%", v.atm_iv * 100.0);
            println!("   ├─ DTE:         {}", v.days_to_expiry);
            println!("   ├─ 1σ Move:     ${:.2}", v.sigma);
        }
        None => println!("   ├─ ATM IV:      unavailable"),
    }
    match rec.target_price {
        Some(t) => println!("   └─ Target:      ${t:.2}"),
        None => println!("   └─ Target:      none"),
    }

    if rec.strategies.is_empty() {
        println!("\n❌ No strategy fits these inputs.");
        return;
    }

    println!("\n📈 Best Of Each Shape");
    for scored in &rec.strategies {
        let s = &scored.strategy;
        let break_evens: Vec<String> = s.break_evens.iter().map(|b| format!("${b:.2}")).collect();
        println!("   ┌─ {}", s.name);
        println!("   ├─ Chance:       {:.1}%", s.chance);
        println!("   ├─ Return/Risk:  {}%", s.return_on_risk);
        println!("   ├─ Max Profit:   ${}", s.profit);
        println!("   ├─ Max Loss:     ${}", s.risk);
        println!("   ├─ Capital:      ${:.2}", s.required_capital);
        println!("   ├─ Breakeven:    {}", break_evens.join(" / "));
        println!("   └─ Score:        {:.3}", scored.score);
    }
}

fn print_implied_move(report: &ImpliedMoveReport) {
    println!("\n📊 {} expiring {}", report.ticker, report.expiration);
    println!("   ├─ Price:       ${:.2}", report.spot);
    match report.volatility {
        Some(v) => {
            println!("   ├─ ATM IV:      {:.1}%", v.atm_iv * 100.0);
            println!("   ├─ DTE:         {}", v.days_to_expiry);
            println!("   ├─ 1σ Move:     ${:.2}", v.sigma);
        }
        None => println!("   ├─ ATM IV:      unavailable"),
    }
    match report.target_price {
        Some(t) => println!("   └─ Target ({}): ${t:.2}", report.sentiment),
        None => println!("   └─ Target ({}): unavailable", report.sentiment),
    }
}
