//! Configuration for the collatz-sim application.
//!
//! Handles parsing command-line arguments and resolving defaults (including
//! randomized defaults that are reproducible with a seed).
//!
//! # Philosophy
//!
//! The tool should work with ZERO arguments, using sensible defaults.
//! The seed is always printed so runs are reproducible.

use anyhow::{Context, Result};
use clap::Parser;
use collatz_sim_core::pipeline::{DEFAULT_COMMAND_DEPTH, DEFAULT_LINK_DEPTH};
use collatz_sim_core::transport::TransportConfig;
use collatz_sim_core::widths::{DEFAULT_STEP_BITS, DEFAULT_VALUE_BITS};
use collatz_sim_core::{PipelineConfig, Widths};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "collatz-sim",
    version,
    about = "Search for record Collatz trajectories on a simulated serial link",
    after_help = "EXAMPLES:\n    \
        collatz-sim                              # 10000 trials, random host noise\n    \
        collatz-sim --seed 42                    # Deterministic run\n    \
        collatz-sim --value-bits 13 --trials 100 # Watch overflow reports\n    \
        collatz-sim --baud-divisor 16 --tx-depth 4 --raw"
)]
pub struct Cli {
    /// Width of the value register in bits
    #[arg(long, default_value_t = DEFAULT_VALUE_BITS)]
    pub value_bits: u32,

    /// Width of the step counter in bits
    #[arg(long, default_value_t = DEFAULT_STEP_BITS)]
    pub step_bits: u32,

    /// Stop after this many completed trials
    #[arg(short, long, default_value_t = 10_000)]
    pub trials: u64,

    /// Hard bound on simulated ticks
    #[arg(long, default_value_t = 50_000_000)]
    pub max_ticks: u64,

    /// Depth of the encoder's command queue
    #[arg(long, default_value_t = DEFAULT_COMMAND_DEPTH)]
    pub command_depth: usize,

    /// Depth of the inbound byte queue
    #[arg(long, default_value_t = DEFAULT_LINK_DEPTH)]
    pub rx_depth: usize,

    /// Depth of the outbound byte queue
    #[arg(long, default_value_t = DEFAULT_LINK_DEPTH)]
    pub tx_depth: usize,

    /// Ticks the transmitter is busy per byte
    #[arg(long, default_value_t = 4)]
    pub baud_divisor: u32,

    /// Maximum random extra busy ticks per byte
    #[arg(long, default_value_t = 0)]
    pub tx_jitter: u32,

    /// Random seed for determinism (default: time-based)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Random bytes the host sends before the start byte (default: random 0-16)
    #[arg(long)]
    pub noise_bytes: Option<usize>,

    /// Print the raw transmitted bytes instead of decoded reports
    #[arg(long)]
    pub raw: bool,

    /// Print resolved configuration
    #[arg(long)]
    pub print_config: bool,

    /// Don't print metrics summary
    #[arg(long)]
    pub no_metrics: bool,

    /// Log filter, e.g. `debug` or `collatz_sim_core=trace` (default: RUST_LOG, then info)
    #[arg(long, env = "COLLATZ_SIM_LOG")]
    pub log_level: Option<String>,
}

/// Complete configuration for a search run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pipeline widths, depths and transport timing
    pub pipeline: PipelineConfig,

    // === Run bounds ===
    pub trials: u64,
    pub max_ticks: u64,

    // === Host traffic ===
    /// Seed for host noise and transmitter jitter
    pub seed: u64,

    /// Noise bytes sent ahead of the start byte
    pub noise_bytes: usize,

    // === Behavior ===
    pub raw: bool,
    pub print_config: bool,
    pub print_metrics: bool,
}

impl Config {
    /// Resolve parsed arguments into a validated configuration.
    ///
    /// If no seed is given, a time-based one is used. Every randomized
    /// default is drawn from that seed, so `--seed` makes the run fully
    /// deterministic.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let seed = match cli.seed {
            Some(seed) => seed,
            None => time_seed()?,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let widths =
            Widths::new(cli.value_bits, cli.step_bits).context("invalid register widths")?;
        let pipeline = PipelineConfig {
            widths,
            command_depth: cli.command_depth,
            rx_depth: cli.rx_depth,
            tx_depth: cli.tx_depth,
            transport: TransportConfig {
                baud_divisor: cli.baud_divisor,
                jitter: cli.tx_jitter,
                seed,
            },
        };
        pipeline.validate().context("invalid queue configuration")?;

        Ok(Config {
            pipeline,
            trials: cli.trials,
            max_ticks: cli.max_ticks,
            seed,
            noise_bytes: cli.noise_bytes.unwrap_or_else(|| rng.gen_range(0..=16)),
            raw: cli.raw,
            print_config: cli.print_config,
            print_metrics: !cli.no_metrics,
        })
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        let widths = self.pipeline.widths;
        println!("=== Configuration ===");
        println!(
            "Value register: {} bits (trials up to {})",
            widths.value_bits(),
            widths.trial_limit()
        );
        println!(
            "Step counter: {} bits (budget {} steps)",
            widths.step_bits(),
            widths.step_budget()
        );
        println!("Trials: {}", self.trials);
        println!("Max ticks: {}", self.max_ticks);
        println!();
        println!("=== Queues ===");
        println!("Command depth: {}", self.pipeline.command_depth);
        println!("Rx depth: {}", self.pipeline.rx_depth);
        println!("Tx depth: {}", self.pipeline.tx_depth);
        println!();
        println!("=== Link Simulation ===");
        println!("Seed: {}", self.seed);
        println!("Baud divisor: {} ticks/byte", self.pipeline.transport.baud_divisor);
        println!("Jitter: +0..={} ticks", self.pipeline.transport.jitter);
        println!("Noise before start: {} bytes", self.noise_bytes);
        println!();
    }
}

fn time_seed() -> Result<u64> {
    use std::time::{SystemTime, UNIX_EPOCH};
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the Unix epoch")?;
    Ok(elapsed.as_millis() as u64)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Parse and resolve arguments, program name first.
    pub(crate) fn parse<const N: usize>(args: [&str; N]) -> Result<Config> {
        Config::from_cli(Cli::try_parse_from(args)?)
    }

    #[test]
    fn test_zero_argument_defaults() {
        let config = parse(["collatz-sim"]).unwrap();
        assert_eq!(config.pipeline.widths, Widths::default());
        assert_eq!(config.pipeline.command_depth, 128);
        assert_eq!(config.pipeline.tx_depth, 1024);
        assert_eq!(config.pipeline.transport.baud_divisor, 4);
        assert_eq!(config.trials, 10_000);
        assert!(config.noise_bytes <= 16);
        assert!(config.print_metrics);
        assert!(!config.raw);
    }

    #[test]
    fn test_seed_makes_defaults_deterministic() {
        let a = parse(["collatz-sim", "--seed", "7"]).unwrap();
        let b = parse(["collatz-sim", "--seed", "7"]).unwrap();
        assert_eq!(a.seed, 7);
        assert_eq!(a.noise_bytes, b.noise_bytes);
        assert_eq!(a.pipeline, b.pipeline);
    }

    #[test]
    fn test_explicit_flags() {
        let config = parse([
            "collatz-sim",
            "--value-bits",
            "13",
            "--step-bits",
            "6",
            "--trials",
            "27",
            "--tx-depth",
            "2",
            "--tx-jitter",
            "3",
            "--noise-bytes",
            "0",
            "--raw",
            "--no-metrics",
        ])
        .unwrap();
        assert_eq!(config.pipeline.widths.value_bits(), 13);
        assert_eq!(config.pipeline.widths.step_bits(), 6);
        assert_eq!(config.trials, 27);
        assert_eq!(config.pipeline.tx_depth, 2);
        assert_eq!(config.pipeline.transport.jitter, 3);
        assert_eq!(config.noise_bytes, 0);
        assert!(config.raw);
        assert!(!config.print_metrics);
    }

    #[test]
    fn test_trial_limit_capped_at_ten_digits() {
        let wide = parse(["collatz-sim", "--value-bits", "40"]).unwrap();
        assert_eq!(wide.pipeline.widths.trial_limit(), 9_999_999_999);
        let narrow = parse(["collatz-sim", "--value-bits", "13"]).unwrap();
        assert_eq!(narrow.pipeline.widths.trial_limit(), 8191);
    }

    #[test]
    fn test_invalid_widths_rejected() {
        assert!(parse(["collatz-sim", "--value-bits", "2"]).is_err());
        assert!(parse(["collatz-sim", "--step-bits", "21"]).is_err());
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = parse(["collatz-sim", "--command-depth", "0"]).unwrap_err();
        assert!(format!("{err:#}").contains("command"));
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(parse(["collatz-sim", "--mtu", "1200"]).is_err());
    }
}
