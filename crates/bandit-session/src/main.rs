//! Bandit session CLI.
//!
//! Commands:
//! - generate: Emit one condition's schedule tables as JSON
//! - simulate: Run a full simulated session and save the trial records
//! - check: Validate a configuration and report its stimulus demands

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use bandit_core::{
    ExposureTracker, HoldoutIndexing, PayoutCondition, PoolLayout, ScheduleConfig,
    ScheduleGenerator, StimulusId,
};
use bandit_session::{BlockOrder, ChoicePolicy, SessionConfig, SessionRunner};

/// Generate a timestamped output path from the given path.
/// e.g., "session.json" -> "session-20260825-010530.json"
fn timestamped_path(path: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("session");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}-{}.{}", stem, timestamp, ext))
}

fn parse_condition(name: &str) -> Result<PayoutCondition> {
    match name {
        "low" => Ok(PayoutCondition::Low),
        "high" => Ok(PayoutCondition::High),
        other => anyhow::bail!("unknown condition '{other}' (expected 'low' or 'high')"),
    }
}

fn parse_indexing(name: &str) -> Result<HoldoutIndexing> {
    match name {
        "zero-based" => Ok(HoldoutIndexing::ZeroBased),
        "one-based" => Ok(HoldoutIndexing::OneBased),
        other => anyhow::bail!(
            "unknown holdout indexing '{other}' (expected 'zero-based' or 'one-based')"
        ),
    }
}

#[derive(Parser)]
#[command(name = "bandit-session")]
#[command(version)]
#[command(about = "Schedule generation and simulated sessions for the bandit learning task")]
struct Cli {
    /// Random seed (random when omitted)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one condition's schedule tables and print or save them
    Generate {
        /// Payout condition ('low' or 'high')
        #[arg(long, default_value = "low")]
        condition: String,

        /// Blocks per condition
        #[arg(long, default_value = "15")]
        blocks: usize,

        /// Trials per block
        #[arg(long, default_value = "20")]
        trials: usize,

        /// Holdout offset convention ('one-based' or 'zero-based')
        #[arg(long, default_value = "one-based")]
        indexing: String,

        /// Output file; prints to stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run a full simulated session
    Simulate {
        /// Blocks per condition
        #[arg(long, default_value = "15")]
        blocks: usize,

        /// Trials per block
        #[arg(long, default_value = "20")]
        trials: usize,

        /// Payout profile ('classic' or 'extended')
        #[arg(long, default_value = "extended")]
        profile: String,

        /// Block order ('low-first', 'high-first', 'interleaved')
        #[arg(long, default_value = "interleaved")]
        order: String,

        /// Choice policy ('random' or 'greedy')
        #[arg(long, default_value = "greedy")]
        policy: String,

        /// Exploration rate for the greedy policy
        #[arg(long, default_value = "0.1")]
        epsilon: f64,

        /// Probability of a response timeout per trial
        #[arg(long, default_value = "0.02")]
        timeout_rate: f64,

        /// Holdout offset convention ('one-based' or 'zero-based')
        #[arg(long, default_value = "one-based")]
        indexing: String,

        /// Familiar stimuli per condition in the memory test
        #[arg(long, default_value = "15")]
        memory_items: usize,

        /// Output file for the session records
        #[arg(long, default_value = "session.json")]
        output: PathBuf,
    },

    /// Validate a configuration and report stimulus demands
    Check {
        /// Blocks per condition
        #[arg(long, default_value = "15")]
        blocks: usize,

        /// Trials per block
        #[arg(long, default_value = "20")]
        trials: usize,

        /// Holdout offset convention ('one-based' or 'zero-based')
        #[arg(long, default_value = "one-based")]
        indexing: String,
    },
}

fn schedule_config(blocks: usize, trials: usize, indexing: &str) -> Result<ScheduleConfig> {
    Ok(ScheduleConfig {
        blocks,
        trials_per_block: trials,
        holdout_indexing: parse_indexing(indexing)?,
        ..ScheduleConfig::default()
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    let seed = cli.seed.unwrap_or_else(|| rand::rng().random::<u64>());
    info!(seed, "using seed");

    match cli.command {
        Commands::Generate {
            condition,
            blocks,
            trials,
            indexing,
            output,
        } => {
            let config = schedule_config(blocks, trials, &indexing)?;
            let condition = parse_condition(&condition)?;
            let generator = ScheduleGenerator::new(config.clone(), condition)?;

            let ids: Vec<StimulusId> =
                (0..config.novel_demand() as u32).map(StimulusId).collect();
            let mut tracker = ExposureTracker::new(&ids, config.familiar_threshold);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let schedule = generator.generate(&mut tracker, &mut rng)?;

            let json = serde_json::to_string_pretty(&schedule)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    println!("Schedule saved to: {}", path.display());
                }
                None => println!("{json}"),
            }
        }

        Commands::Simulate {
            blocks,
            trials,
            profile,
            order,
            policy,
            epsilon,
            timeout_rate,
            indexing,
            memory_items,
            output,
        } => {
            let schedule = schedule_config(blocks, trials, &indexing)?;
            let demand = schedule.novel_demand();
            let layout = PoolLayout {
                low_main: demand,
                high_main: demand,
                memory_probe: memory_items * 2,
                practice: 5,
            };
            let config = SessionConfig {
                inventory: layout.total(),
                schedule,
                layout,
                payout_profile: profile,
                block_order: BlockOrder::parse(&order)?,
                policy: ChoicePolicy::parse(&policy, epsilon)?,
                timeout_rate,
                memory_items_per_condition: memory_items,
            };

            let runner = SessionRunner::new(config)?;
            let result = runner.run(seed)?;

            println!("\n=== Session Result ===");
            println!("Seed: {}", result.seed);
            println!("Payout profile: {}", result.payout_profile);
            println!("Trials: {}", result.trials.len());
            println!("Timeouts: {}", result.timeout_count());
            println!("Total points: {}", result.total_points());

            let output_path = timestamped_path(&output);
            result.save(&output_path)?;
            println!("Records saved to: {}", output_path.display());
        }

        Commands::Check {
            blocks,
            trials,
            indexing,
        } => {
            let config = schedule_config(blocks, trials, &indexing)?;
            config.validate()?;

            println!("Configuration is valid.");
            println!("Blocks per condition: {}", config.blocks);
            println!("Trials per block: {}", config.trials_per_block);
            println!("Active set per block: {}", config.active_per_block());
            println!(
                "Novel stimuli consumed per condition: {}",
                config.novel_demand()
            );
            println!(
                "Holdout window: {:?} ({:?})",
                config.holdout_window, config.holdout_indexing
            );
        }
    }

    Ok(())
}
