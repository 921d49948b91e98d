//! RangeBreak CLI — replay and demo commands for the signal engine.
//!
//! Commands:
//! - `scan` — replay a CSV bar series through the engine and print signals
//! - `demo` — run the full lifecycle on a deterministic synthetic series,
//!   including the approval step

use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rangebreak_core::domain::Bar;
use rangebreak_core::feed::synthetic_bars;
use rangebreak_core::{
    submit_for_approval, EngineConfig, FixedOracle, InMemoryFeed, Signal, SignalEngine, Timeframe,
};

#[derive(Parser)]
#[command(
    name = "rangebreak",
    about = "RangeBreak CLI — breakout & retest signal engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a CSV bar series through the engine and print emitted signals.
    Scan {
        /// CSV file with columns: timestamp,open,high,low,close.
        /// Timestamps are RFC 3339 or epoch seconds.
        #[arg(long)]
        csv: PathBuf,

        /// Symbol the series belongs to (e.g. R_50).
        #[arg(long)]
        symbol: String,

        /// Timeframe of the series (e.g. 15m, 1h).
        #[arg(long, default_value = "15m")]
        timeframe: Timeframe,

        /// Optional TOML config overriding engine defaults.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print flat key=value lines instead of JSON.
        #[arg(long, default_value_t = false)]
        flat: bool,
    },
    /// Run the engine plus approval gating on a synthetic series.
    Demo {
        /// Symbol controlling the synthetic volatility (R_10..R_100).
        #[arg(long, default_value = "R_50")]
        symbol: String,

        /// Timeframe of the generated series.
        #[arg(long, default_value = "15m")]
        timeframe: Timeframe,

        /// Number of bars to generate.
        #[arg(long, default_value_t = 500)]
        bars: usize,

        /// RNG seed; the same seed always yields the same series.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Optional TOML config overriding engine defaults.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Scan {
            csv,
            symbol,
            timeframe,
            config,
            flat,
        } => run_scan(&csv, &symbol, timeframe, config.as_deref(), flat),
        Commands::Demo {
            symbol,
            timeframe,
            bars,
            seed,
            config,
        } => run_demo(&symbol, timeframe, bars, seed, config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn run_scan(
    csv: &Path,
    symbol: &str,
    timeframe: Timeframe,
    config: Option<&Path>,
    flat: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let bars = read_csv_bars(csv)?;
    if bars.len() < config.min_bars() {
        bail!(
            "series too short: {} bars, engine needs at least {}",
            bars.len(),
            config.min_bars()
        );
    }

    let mut engine = SignalEngine::new(config)?;
    let signals = replay(&mut engine, symbol, timeframe, bars)?;

    info!(count = signals.len(), "scan complete");
    for signal in &signals {
        print_signal(signal, flat)?;
    }
    Ok(())
}

fn run_demo(
    symbol: &str,
    timeframe: Timeframe,
    bars: usize,
    seed: u64,
    config: Option<&Path>,
) -> Result<()> {
    let config = load_config(config)?;
    let min_score = config.ai_approval_min_score;
    let series = synthetic_bars(symbol, timeframe, bars, seed);
    info!(symbol, %timeframe, bars, seed, "generated synthetic series");

    let mut engine = SignalEngine::new(config)?;
    let signals = replay(&mut engine, symbol, timeframe, series)?;
    info!(count = signals.len(), "replay complete");

    // Stand-in oracle: a live deployment wires a real reviewer here.
    let oracle = FixedOracle::approving(min_score);
    for signal in &signals {
        print_signal(signal, false)?;
        let verdict = submit_for_approval(&oracle, signal, min_score);
        println!(
            "  -> {} (oracle score {}/10): {}",
            if verdict.approved { "APPROVED" } else { "REJECTED" },
            verdict.score,
            verdict.reasoning
        );
    }
    Ok(())
}

/// Feed the series bar by bar, evaluating one tick per appended bar.
fn replay(
    engine: &mut SignalEngine,
    symbol: &str,
    timeframe: Timeframe,
    bars: Vec<Bar>,
) -> Result<Vec<Signal>> {
    let warmup = engine.config().min_bars().saturating_sub(1);
    let mut feed = InMemoryFeed::new();
    let mut signals = Vec::new();
    for (i, bar) in bars.into_iter().enumerate() {
        feed.push(symbol, timeframe, bar)
            .with_context(|| format!("bar {i} rejected"))?;
        if i < warmup {
            continue;
        }
        if let Some(signal) = engine.evaluate(&feed, symbol, timeframe) {
            signals.push(signal);
        }
    }
    Ok(signals)
}

#[derive(Debug, Deserialize)]
struct CsvBar {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    let epoch: i64 = raw
        .parse()
        .with_context(|| format!("timestamp '{raw}' is neither RFC 3339 nor epoch seconds"))?;
    Utc.timestamp_opt(epoch, 0)
        .single()
        .with_context(|| format!("epoch timestamp '{raw}' out of range"))
}

fn read_csv_bars(path: &Path) -> Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut bars = Vec::new();
    for (i, record) in reader.deserialize::<CsvBar>().enumerate() {
        let record = record.with_context(|| format!("reading CSV row {}", i + 1))?;
        bars.push(Bar {
            timestamp: parse_timestamp(&record.timestamp)?,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
        });
    }
    Ok(bars)
}

fn print_signal(signal: &Signal, flat: bool) -> Result<()> {
    if flat {
        let fields: Vec<String> = signal
            .to_flat_record()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        println!("{}", fields.join(" "));
    } else {
        println!("{}", serde_json::to_string_pretty(signal)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_and_epoch_timestamps() {
        let rfc = parse_timestamp("2024-01-02T00:15:00+00:00").unwrap();
        let epoch = parse_timestamp(&rfc.timestamp().to_string()).unwrap();
        assert_eq!(rfc, epoch);
        assert!(parse_timestamp("not-a-time").is_err());
    }

    #[test]
    fn cli_parses_scan_command() {
        let cli = Cli::try_parse_from([
            "rangebreak",
            "scan",
            "--csv",
            "bars.csv",
            "--symbol",
            "R_50",
            "--timeframe",
            "1h",
            "--flat",
        ])
        .unwrap();
        match cli.command {
            Commands::Scan {
                symbol,
                timeframe,
                flat,
                ..
            } => {
                assert_eq!(symbol, "R_50");
                assert_eq!(timeframe, Timeframe::H1);
                assert!(flat);
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn cli_demo_defaults() {
        let cli = Cli::try_parse_from(["rangebreak", "demo"]).unwrap();
        match cli.command {
            Commands::Demo {
                symbol,
                bars,
                seed,
                ..
            } => {
                assert_eq!(symbol, "R_50");
                assert_eq!(bars, 500);
                assert_eq!(seed, 42);
            }
            _ => panic!("expected demo"),
        }
    }
}
