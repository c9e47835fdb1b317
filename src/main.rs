//! Income-Aware Personalization Engine
//!
//! Turns AI buy candidates and a cross-sectional stock screen into a
//! policy-constrained, factor-tilted ranked list, and hands that list to an
//! external portfolio optimizer.

mod api;
mod factors;
mod models;
mod personalization;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::OptimizerClient;
use crate::models::{Factor, IncomeBracket, Profile, ScreenerRow};
use crate::personalization::{EngineConfig, GenerationGuard, PersonalizationRequest, Personalizer};

/// Personalized investment ranking CLI.
#[derive(Parser)]
#[command(name = "personalize")]
#[command(about = "Rank AI buy candidates against an investor's income profile", long_about = None)]
struct Cli {
    /// Engine configuration file (JSON); defaults apply when omitted
    #[arg(short, long, env = "PERSONALIZER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the risk policy for a profile
    Policy {
        /// Profile JSON file
        profile: PathBuf,
    },

    /// Derive factor tilts for a profile
    Tilts {
        /// Profile JSON file
        profile: PathBuf,
    },

    /// Compute sector-relative factor exposures for a screen
    Exposures {
        /// Screen JSON file (array of rows)
        screen: PathBuf,
    },

    /// Filter, score and rank candidates
    Rank {
        /// Request JSON files (profile, candidates, screen, risk); repeated run tokens are skipped
        #[arg(required = true)]
        requests: Vec<PathBuf>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rank candidates and request target weights from the optimizer
    Optimize {
        /// Request JSON file (profile, candidates, screen, risk)
        request: PathBuf,

        /// Previous weights JSON file ({"SYMBOL": weight})
        #[arg(short, long)]
        prev_weights: Option<PathBuf>,

        /// Optimizer base URL
        #[arg(long, env = "OPTIMIZER_URL")]
        optimizer_url: String,

        /// Optimizer request timeout in seconds
        #[arg(long, env = "OPTIMIZER_TIMEOUT_SECS", default_value = "30")]
        timeout: u64,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = EngineConfig::load(cli.config.as_deref())?;
    let engine = Personalizer::new(config);

    match cli.command {
        Commands::Policy { profile } => {
            let profile: Profile = read_json(&profile)?;
            print_json(&engine.policy(&profile))?;
        }

        Commands::Tilts { profile } => {
            let profile: Profile = read_json(&profile)?;
            let tilts = engine.tilts(&profile);

            println!("\n{:<10} {:>8}", "FACTOR", "WEIGHT");
            println!("{}", "-".repeat(19));
            for f in Factor::ALL {
                println!("{:<10} {:>7.1}%", f.as_str(), tilts.weight(f) * 100.0);
            }
        }

        Commands::Exposures { screen } => {
            let rows: Vec<ScreenerRow> = read_json(&screen)?;
            let exposures = engine.exposures(&rows);

            let mut sorted: Vec<_> = exposures.values().collect();
            sorted.sort_by(|a, b| (&a.sector, &a.symbol).cmp(&(&b.sector, &b.symbol)));
            print_json(&sorted)?;
        }

        Commands::Rank { requests, json } => {
            let requests = requests
                .iter()
                .map(|path| read_json::<PersonalizationRequest>(path))
                .collect::<Result<Vec<_>>>()?;

            let mut guard = GenerationGuard::new();
            let results = engine.personalize_batch(&requests, &mut guard);

            if json {
                print_json(&results)?;
                return Ok(());
            }

            for result in &results {
                println!("\nRun {}", result.run_token.0);

                if result.paused {
                    println!(
                        "Equity buys paused ({:?}); {} candidates withheld.",
                        result.pause_reason, result.suppressed
                    );
                    continue;
                }

                println!("{:<4} {:<8} {:<20} {:>10}", "#", "SYMBOL", "SECTOR", "SCORE");
                println!("{}", "-".repeat(45));
                for (i, c) in result.ranked.iter().enumerate() {
                    println!(
                        "{:<4} {:<8} {:<20} {:>10.4}",
                        i + 1,
                        c.candidate.symbol,
                        truncate(c.sector(), 20),
                        c.personalized_score
                    );
                }
            }
        }

        Commands::Optimize {
            request,
            prev_weights,
            optimizer_url,
            timeout,
        } => {
            let request: PersonalizationRequest = read_json(&request)?;
            let prev: BTreeMap<String, f64> = match prev_weights {
                Some(path) => read_json(&path)?,
                None => BTreeMap::new(),
            };

            let result = engine.personalize(&request);
            info!(
                optimizer = %optimizer_url,
                ranked = result.ranked.len(),
                "Requesting target weights"
            );

            let client = OptimizerClient::with_timeout(optimizer_url, Duration::from_secs(timeout))?;
            match engine.optimize(&client, &result, &prev).await? {
                Some(plan) => print_json(&plan)?,
                None => println!("Nothing to allocate (paused: {}).", result.paused),
            }
        }

        Commands::Config => {
            let config = engine.config();
            let rules = &config.policy;

            println!("\n=== Income Bands ===\n");
            println!(
                "{:<22} {:>6} {:>6} {:>6} {:>7} {:>9} {:>5}",
                "BRACKET", "VOL", "CASH", "NAME", "SECTOR", "TURNOVER", "ETFS"
            );
            println!("{}", "-".repeat(68));
            for bracket in IncomeBracket::ALL {
                let band = rules.bands.get(&bracket).unwrap_or(&rules.default_band);
                println!(
                    "{:<22} {:>5.1}% {:>5.1}% {:>5.1}% {:>6.1}% {:>8.1}% {:>5}",
                    bracket.label(),
                    band.vol_target * 100.0,
                    band.cash_floor * 100.0,
                    band.name_cap * 100.0,
                    band.sector_cap * 100.0,
                    band.turnover_budget * 100.0,
                    if band.prefer_etfs { "yes" } else { "no" }
                );
            }

            println!("\n=== Adjustments ===\n");
            println!(
                "Risk multipliers:     conservative x{}, moderate x{}, aggressive x{}",
                rules.conservative_vol_mult, rules.moderate_vol_mult, rules.aggressive_vol_mult
            );
            println!(
                "Short horizon:        vol x{}, cash {:+}",
                rules.short_horizon_vol_mult, rules.short_horizon_cash_add
            );
            println!(
                "Long horizon:         vol x{}, cash {:+}",
                rules.long_horizon_vol_mult, rules.long_horizon_cash_add
            );
            println!("Small account below:  ${}", rules.small_account_threshold);
            println!("Max cash floor:       {}%", rules.max_cash_floor * 100.0);

            println!("\n=== Scoring ===\n");
            println!("Alpha (short):        {}", config.blend.alpha_short);
            println!("Alpha (otherwise):    {}", config.blend.alpha_long);
            println!("Z-score epsilon:      {:e}", config.zscore_epsilon);
            println!("Cash gate phrase:     \"{}\"", config.cash_gate_phrase);
        }
    }

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Truncate a string with ellipsis if too long.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
