//! collatz-sim entry point.

mod config;
mod input_gen;

use anyhow::{Context, Result};
use clap::Parser;
use collatz_sim_core::report::{parse_reports, REPORT_END};
use collatz_sim_core::Pipeline;
use std::io::Write;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Cli, Config};
use input_gen::generate_host_traffic;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;

    let config = Config::from_cli(cli)?;
    if config.print_config {
        config.print();
    }
    info!(seed = config.seed, trials = config.trials, "starting search");

    let mut pipeline = Pipeline::new(config.pipeline)?;
    pipeline.feed(&generate_host_traffic(config.seed, config.noise_bytes));
    let result = pipeline.run_trials(config.trials, config.max_ticks);

    // Whatever made it onto the wire is printed even when the run was cut short
    if config.raw {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(pipeline.output())?;
        stdout.flush()?;
    } else {
        let complete = complete_reports(pipeline.output());
        if complete.len() < pipeline.output().len() {
            warn!(
                bytes = pipeline.output().len() - complete.len(),
                "output ends inside a report"
            );
        }
        for report in parse_reports(complete).context("transmitted text did not decode")? {
            println!("{report}");
        }
    }

    if config.print_metrics {
        pipeline.metrics().print_summary();
    }

    result.context("search did not finish")?;
    Ok(())
}

fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log filter {level:?}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

/// Longest prefix of `output` ending on a report boundary.
fn complete_reports(output: &[u8]) -> &[u8] {
    let end = output
        .windows(REPORT_END.len())
        .rposition(|window| window == REPORT_END)
        .map_or(0, |start| start + REPORT_END.len());
    &output[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::parse;

    #[test]
    fn test_complete_reports() {
        assert_eq!(complete_reports(b""), b"");
        assert_eq!(complete_reports(b"1 1 "), b"");
        assert_eq!(complete_reports(b"1 1 2 \r\n\x072 7"), b"1 1 2 \r\n\x07");
        assert_eq!(complete_reports(b"1 1 2 \r\n\x07"), b"1 1 2 \r\n\x07");
    }

    #[test]
    fn test_generated_traffic_drives_search() {
        let config = parse([
            "collatz-sim",
            "--seed",
            "5",
            "--noise-bytes",
            "20",
            "--baud-divisor",
            "1",
        ])
        .unwrap();
        let mut pipeline = Pipeline::new(config.pipeline).unwrap();
        pipeline.feed(&generate_host_traffic(config.seed, config.noise_bytes));
        pipeline.run_trials(27, 1_000_000).unwrap();

        let reports = parse_reports(pipeline.output()).unwrap();
        assert_eq!(reports.len(), 8);
        assert_eq!(pipeline.metrics().bytes_discarded, 20);
    }
}
